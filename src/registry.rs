//! Type registry: the `supported_resources.json` catalogue.
//!
//! Maps each resource type name to the metadata the engine and the artifact
//! builder need: how to build its self-link, which of its fields reference
//! other resources, which inline lists hold nested resources, which
//! connectivity modes it supports, and where its generated files go.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Inline lists under a VPC that always hold subnetworks.
pub const VPC_NESTED_ALIASES: &[(&str, &str)] = &[("subnets", "subnetwork"), ("subnetworks", "subnetwork")];

/// Connectivity modes a producer type can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityType {
    /// Private Service Connect endpoint in the consumer network
    Psc,
    /// Service connection policy on the producer's VPC
    Scp,
}

impl ConnectivityType {
    /// Parse the `connectivityType` value of a resource.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "psc" => Some(Self::Psc),
            "scp" => Some(Self::Scp),
            _ => None,
        }
    }
}

/// Where and how a type's per-resource artifact is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Top-level output category (e.g. `producer`, `consumer`)
    pub category: String,
    /// Folder under the category (e.g. `CloudSQL`)
    pub folder_name: String,
    /// Template file inside `{templates}/{category}/{folderName}`
    pub template_filename: String,
}

/// Metadata for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeRegistryEntry {
    /// Self-link template with `{param}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_template: Option<String>,
    /// Fields whose bare-name values must become self-links
    pub reference_fields: Vec<String>,
    /// Inline list field name to element type name
    pub nested_resources: IndexMap<String, String>,
    /// Supported connectivity modes; unknown values are ignored
    #[serde(deserialize_with = "deserialize_connectivity")]
    pub connectivity_options: Vec<ConnectivityType>,
    /// Per-resource artifact generation metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// Template for the per-type security variables file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_config_template: Option<String>,
    /// API discovery document, used to derive the API host to enable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_url: Option<String>,
}

fn deserialize_connectivity<'de, D>(deserializer: D) -> std::result::Result<Vec<ConnectivityType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|s| ConnectivityType::parse(s)).collect())
}

impl TypeRegistryEntry {
    /// Whether the type supports the given connectivity mode.
    pub fn supports(&self, connectivity: ConnectivityType) -> bool {
        self.connectivity_options.contains(&connectivity)
    }

    /// API host (e.g. `compute.googleapis.com`) taken from the discovery URL.
    pub fn api_host(&self) -> Option<&str> {
        let url = self.discovery_url.as_deref()?;
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        rest.split('/').next().filter(|host| !host.is_empty())
    }
}

/// The loaded registry, keyed by type name in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    entries: IndexMap<String, TypeRegistryEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the registry file. The registry is required; failures are errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::registry_load(path, "file not found")
            } else {
                Error::registry_load(path, e.to_string())
            }
        })?;
        let registry = Self::from_json_str(&content)
            .map_err(|e| Error::registry_load(path, e.to_string()))?;
        debug!(
            "Loaded {} resource types from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse the registry from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Entry for a type, if supported.
    pub fn get(&self, type_name: &str) -> Option<&TypeRegistryEntry> {
        self.entries.get(type_name)
    }

    /// Whether the type is supported.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Self-link template for a type.
    pub fn uri_template(&self, type_name: &str) -> Option<&str> {
        self.get(type_name).and_then(|e| e.uri_template.as_deref())
    }

    /// Nested list mapping for a type.
    ///
    /// VPCs always nest subnetworks under `subnets` and `subnetworks`, on top
    /// of whatever the registry entry maps.
    pub fn nested_resources(&self, type_name: &str) -> IndexMap<String, String> {
        let mut nested = self
            .get(type_name)
            .map(|entry| entry.nested_resources.clone())
            .unwrap_or_default();
        if type_name == "vpc" {
            for (field, element) in VPC_NESTED_ALIASES {
                nested
                    .entry(field.to_string())
                    .or_insert_with(|| element.to_string());
            }
        }
        nested
    }

    /// Iterate over all entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeRegistryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of supported types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
