//! Reference and self-link resolution.
//!
//! Runs last, over the hoisted document. Every reference field of a typed
//! resource is rewritten from a bare name to the referenced resource's
//! self-link, and every typed resource whose type has a `uriTemplate` gets a
//! `selfLink` of its own. Anything that cannot be resolved is logged and left
//! as it was.

use super::index::{ResourceIndex, SUBNETWORK_KIND, VPC_KIND};
use crate::model::{bare_name, CompleteConfig, Project, Resource, SELF_LINK_FIELD};
use crate::registry::TypeRegistry;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("Invalid placeholder regex"));

/// A URI template placeholder with no value for the resource at hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value for placeholder '{{{0}}}'")]
pub struct MissingParam(pub String);

/// Counters reported after a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Reference values rewritten to self-links
    pub resolved: usize,
    /// Reference values left as they were
    pub unresolved: usize,
    /// `selfLink` fields computed
    pub self_links: usize,
}

/// Kind a reference field points at.
///
/// Network fields point at VPCs and subnet fields at subnetworks; any other
/// field named after a registry type points at that type.
pub fn reference_kind<'a>(field: &'a str, registry: &TypeRegistry) -> Option<&'a str> {
    match field {
        "network" | "networkForPsc" | "networkForFirewall" => Some(VPC_KIND),
        "subnetwork" | "subnet" | "subnetForPsc" => Some(SUBNETWORK_KIND),
        other if registry.contains(other) => Some(other),
        _ => None,
    }
}

/// Region of a resource: `region`, else derived from `zone`, else the
/// project or document default.
fn region_of(fields: &Map<String, Value>, project: &Project, config: &CompleteConfig) -> Option<String> {
    if let Some(region) = str_field(fields, "region") {
        return Some(bare_name(region).to_string());
    }
    if let Some((region, _)) = str_field(fields, "zone").and_then(|z| bare_name(z).rsplit_once('-')) {
        return Some(region.to_string());
    }
    config.default_region_for(project).map(str::to_string)
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn param_value(param: &str, fields: &Map<String, Value>, project: &Project, config: &CompleteConfig) -> Option<String> {
    match param {
        "projectId" => Some(project.project_id.clone()).filter(|id| !id.is_empty()),
        "name" | "zone" => str_field(fields, param).map(|v| bare_name(v).to_string()),
        "region" => region_of(fields, project, config),
        "location" => str_field(fields, "location")
            .map(str::to_string)
            .or_else(|| region_of(fields, project, config)),
        other => str_field(fields, other).map(str::to_string),
    }
}

/// Substitute every `{param}` of a URI template from a resource's location.
pub fn expand_uri_template(
    template: &str,
    fields: &Map<String, Value>,
    project: &Project,
    config: &CompleteConfig,
) -> Result<String, MissingParam> {
    let mut missing = None;
    let link = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let param = &caps[1];
        param_value(param, fields, project, config).unwrap_or_else(|| {
            missing.get_or_insert_with(|| param.to_string());
            String::new()
        })
    });
    match missing {
        Some(param) => Err(MissingParam(param)),
        None => Ok(link.into_owned()),
    }
}

struct Resolver<'a> {
    config: &'a CompleteConfig,
    registry: &'a TypeRegistry,
    index: &'a ResourceIndex,
    stats: ResolutionStats,
}

impl<'a> Resolver<'a> {
    /// Self-link of the resource a reference points at.
    fn target_link(
        &self,
        kind: &str,
        name: &str,
        network: Option<&str>,
        project: usize,
    ) -> Result<String, String> {
        let lookup = match kind {
            SUBNETWORK_KIND => self.index.find_subnet(self.config, name, network, Some(project)),
            _ => self.index.find(self.config, kind, name, Some(project)),
        };
        let found = lookup.map_err(|miss| miss.to_string())?;

        let template = self
            .registry
            .uri_template(kind)
            .ok_or_else(|| format!("type '{}' has no uriTemplate", kind))?;
        expand_uri_template(template, found.fields, found.project, self.config)
            .map_err(|e| format!("{} (at {})", e, found.locator()))
    }

    fn rewrite_value(&mut self, field: &str, value: &mut String, network: Option<&str>, project: usize, owner: &str) {
        if value.is_empty() || value.contains('/') {
            return;
        }
        let Some(kind) = reference_kind(field, self.registry) else {
            debug!("Reference field '{}' of '{}' has no target kind", field, owner);
            return;
        };
        match self.target_link(kind, value, network, project) {
            Ok(link) => {
                debug!("Resolved {}.{} '{}' -> {}", owner, field, value, link);
                *value = link;
                self.stats.resolved += 1;
            }
            Err(reason) => {
                warn!("Could not resolve {}.{} = '{}': {}", owner, field, value, reason);
                self.stats.unresolved += 1;
            }
        }
    }

    /// Rewrite reference fields wherever they occur in a field tree.
    fn rewrite_tree(&mut self, map: &mut Map<String, Value>, fields: &[String], project: usize, owner: &str) {
        let network = str_field(map, "network").map(|n| bare_name(n).to_string());

        for (key, value) in map.iter_mut() {
            let is_reference = fields.iter().any(|f| f == key);
            match value {
                Value::String(s) if is_reference => {
                    self.rewrite_value(key, s, network.as_deref(), project, owner)
                }
                Value::Array(items) => {
                    for item in items {
                        match item {
                            Value::String(s) if is_reference => {
                                self.rewrite_value(key, s, network.as_deref(), project, owner)
                            }
                            Value::Object(inner) => self.rewrite_tree(inner, fields, project, owner),
                            _ => {}
                        }
                    }
                }
                Value::Object(inner) => self.rewrite_tree(inner, fields, project, owner),
                _ => {}
            }
        }
    }

    fn resolve(&mut self, resource: &Resource, project: usize) -> Option<Resource> {
        let (config, registry) = (self.config, self.registry);
        let type_name = resource.type_name()?;
        let entry = registry.get(type_name)?;
        let owner = resource.name().unwrap_or(type_name).to_string();
        let mut updated = resource.clone();

        if !entry.reference_fields.is_empty() {
            self.rewrite_tree(updated.fields_mut(), &entry.reference_fields, project, &owner);
        }

        if let Some(template) = entry.uri_template.as_deref() {
            let project_ref = &config.projects[project];
            match expand_uri_template(template, updated.fields(), project_ref, config) {
                Ok(link) => {
                    updated.insert(SELF_LINK_FIELD, link);
                    self.stats.self_links += 1;
                }
                Err(missing) => warn!("No selfLink for {} '{}': {}", type_name, owner, missing),
            }
        }

        (updated != *resource).then_some(updated)
    }
}

/// Resolve every reference field and self-link in the document.
pub fn resolve_references(config: &mut CompleteConfig, registry: &TypeRegistry) -> ResolutionStats {
    let index = ResourceIndex::build(config, registry);
    let mut resolver = Resolver {
        config: &*config,
        registry,
        index: &index,
        stats: ResolutionStats::default(),
    };

    let mut updates = Vec::new();
    for (p, project) in config.projects.iter().enumerate() {
        for (collection, items) in project.collections() {
            for (i, item) in items.iter().enumerate() {
                let Some(resource) = item else { continue };
                if let Some(updated) = resolver.resolve(resource, p) {
                    updates.push((p, collection.to_string(), i, updated));
                }
            }
        }
    }
    let stats = resolver.stats;

    for (p, collection, i, updated) in updates {
        if let Some(slot) = config.projects[p]
            .collection_mut(&collection)
            .and_then(|items| items.get_mut(i))
        {
            *slot = Some(updated);
        }
    }

    stats
}
