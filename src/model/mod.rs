//! Document model for architecture specs and resolved configurations.
//!
//! The same types describe both the human-authored input and the fully
//! resolved output: resolution only adds resources, moves nested subnets,
//! and rewrites reference fields.
//!
//! ```text
//! CompleteConfig
//!   └── projects: [Project]
//!         ├── projectId, pscSettings, defaultRegion, ...   (typed)
//!         └── <collection>: [Resource | null]             (vpc, subnets, producers, ...)
//! ```

mod resource;
mod validate;

pub use resource::{
    bare_name, default_kind_for_collection, Resource, COUNT_FIELD, NAME_FIELD, SELF_LINK_FIELD,
    TYPE_FIELD,
};
pub(crate) use resource::object_entry;
pub use validate::ValidationIssue;

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::warn;

/// Collection holding a project's VPC networks.
pub const VPC_COLLECTION: &str = "vpc";
/// Collection holding a project's subnetworks.
pub const SUBNETS_COLLECTION: &str = "subnets";
/// Collection holding managed services offered to other projects.
pub const PRODUCERS_COLLECTION: &str = "producers";
/// Collection holding workloads that connect to producers.
pub const CONSUMERS_COLLECTION: &str = "consumers";
/// Collection receiving derived NAT routers.
pub const ROUTERS_COLLECTION: &str = "routers";
/// Collection receiving derived firewall rules.
pub const FIREWALLS_COLLECTION: &str = "firewalls";
/// Collection receiving derived PSC addresses.
pub const ADDRESSES_COLLECTION: &str = "addresses";
/// Collection receiving derived PSC forwarding rules.
pub const FORWARDING_RULES_COLLECTION: &str = "forwardingRules";

/// Root document: the architecture spec before resolution and the
/// complete configuration after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteConfig {
    /// Free-form description of the architecture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Region used when neither a resource nor its project names one
    #[serde(rename = "defaultRegion", default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,

    /// Prefix applied to count-expanded resource names
    #[serde(rename = "namePrefix", default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    /// Suffix reserved for naming conventions of downstream templates
    #[serde(rename = "nameSuffix", default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,

    /// Projects in document order
    #[serde(default)]
    pub projects: Vec<Project>,

    /// Unknown root keys, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompleteConfig {
    /// Parse a document from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a document from disk. Any failure here is fatal for a run.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::spec_parse(path, "unable to read file", Some(Box::new(e)))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| Error::spec_parse(path, "invalid JSON document", Some(Box::new(e))))
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Effective name prefix for a project: project-level, else document-level.
    pub fn name_prefix_for<'a>(&'a self, project: &'a Project) -> Option<&'a str> {
        non_empty(project.name_prefix.as_deref()).or(non_empty(self.name_prefix.as_deref()))
    }

    /// Effective default region for a project: project-level, else document-level.
    pub fn default_region_for<'a>(&'a self, project: &'a Project) -> Option<&'a str> {
        non_empty(project.default_region.as_deref()).or(non_empty(self.default_region.as_deref()))
    }

    /// Index of the project with the given ID.
    pub fn project_index(&self, project_id: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.project_id == project_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Project-level Private Service Connect defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PscSettings {
    /// Network hosting PSC endpoints
    #[serde(rename = "networkForPsc", default, skip_serializing_if = "Option::is_none")]
    pub network_for_psc: Option<String>,

    /// Subnetwork hosting PSC endpoint addresses
    #[serde(rename = "subnetForPsc", default, skip_serializing_if = "Option::is_none")]
    pub subnet_for_psc: Option<String>,

    /// Any other settings, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One non-typed key of a project: a resource collection or an opaque value.
///
/// A list is a collection when it is empty, holds only objects and nulls, or
/// holds at least one object. In the last case stray scalars are dropped with
/// a warning so the remaining resources still take part in resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProjectEntry {
    /// A list of resource objects; `null` items are tolerated and skipped.
    Resources(Vec<Option<Resource>>),
    /// Anything else (flags, string lists, nested objects).
    Value(Value),
}

impl ProjectEntry {
    fn is_collection(items: &[Value]) -> bool {
        items.iter().all(|item| item.is_object() || item.is_null())
            || items.iter().any(Value::is_object)
    }
}

impl From<Value> for ProjectEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) if Self::is_collection(&items) => {
                let mut resources = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    match item {
                        Value::Object(fields) => resources.push(Some(Resource::from(fields))),
                        Value::Null => resources.push(None),
                        other => warn!(
                            "Skipping non-object item {} at index {} of a resource list",
                            other, index
                        ),
                    }
                }
                ProjectEntry::Resources(resources)
            }
            other => ProjectEntry::Value(other),
        }
    }
}

impl<'de> Deserialize<'de> for ProjectEntry {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(ProjectEntry::from)
    }
}

/// A project and every resource declared under it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project identifier
    #[serde(rename = "projectId", default)]
    pub project_id: String,

    /// Explicit shared VPC host marker
    #[serde(rename = "hostProject", default, skip_serializing_if = "Option::is_none")]
    pub host_project: Option<bool>,

    /// PSC defaults for producers without explicit network/subnet
    #[serde(rename = "pscSettings", default, skip_serializing_if = "Option::is_none")]
    pub psc_settings: Option<PscSettings>,

    /// Project default region
    #[serde(rename = "defaultRegion", default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,

    /// Project name prefix
    #[serde(rename = "namePrefix", default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,

    /// Project name suffix
    #[serde(rename = "nameSuffix", default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,

    /// Resource collections and other keys, in input order
    #[serde(flatten)]
    pub entries: IndexMap<String, ProjectEntry>,
}

impl Project {
    /// Create an empty project.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    /// Whether the project is explicitly marked as a shared VPC host.
    pub fn is_host_project(&self) -> bool {
        self.host_project.unwrap_or(false)
    }

    /// A resource collection, if the key holds one.
    pub fn collection(&self, key: &str) -> Option<&Vec<Option<Resource>>> {
        match self.entries.get(key) {
            Some(ProjectEntry::Resources(items)) => Some(items),
            _ => None,
        }
    }

    /// A resource collection, mutably.
    pub fn collection_mut(&mut self, key: &str) -> Option<&mut Vec<Option<Resource>>> {
        match self.entries.get_mut(key) {
            Some(ProjectEntry::Resources(items)) => Some(items),
            _ => None,
        }
    }

    /// A resource collection, created (or replacing a non-list value) if needed.
    pub fn collection_or_insert(&mut self, key: &str) -> &mut Vec<Option<Resource>> {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| ProjectEntry::Resources(Vec::new()));
        if !matches!(entry, ProjectEntry::Resources(_)) {
            *entry = ProjectEntry::Resources(Vec::new());
        }
        match entry {
            ProjectEntry::Resources(items) => items,
            ProjectEntry::Value(_) => unreachable!("entry was just replaced with a collection"),
        }
    }

    /// Non-null resources of one collection.
    pub fn resources<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.collection(key)
            .into_iter()
            .flat_map(|items| items.iter().flatten())
    }

    /// Every collection with its key, in input order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &Vec<Option<Resource>>)> {
        self.entries.iter().filter_map(|(key, entry)| match entry {
            ProjectEntry::Resources(items) => Some((key.as_str(), items)),
            ProjectEntry::Value(_) => None,
        })
    }

    /// Every collection with its key, mutably.
    pub fn collections_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Option<Resource>>)> {
        self.entries.iter_mut().filter_map(|(key, entry)| match entry {
            ProjectEntry::Resources(items) => Some((key.as_str(), items)),
            ProjectEntry::Value(_) => None,
        })
    }

    /// Every non-null resource with the key of its collection.
    pub fn all_resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.collections()
            .flat_map(|(key, items)| items.iter().flatten().map(move |r| (key, r)))
    }

    /// Whether a collection already holds a resource with this name.
    pub fn has_named(&self, key: &str, name: &str) -> bool {
        self.resources(key).any(|r| r.name() == Some(name))
    }

    /// Append a resource to a collection, creating the collection if absent.
    pub fn push_resource(&mut self, key: &str, resource: Resource) {
        self.collection_or_insert(key).push(Some(resource));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_entries_preserve_order_and_kinds() {
        let project: Project = serde_json::from_value(json!({
            "projectId": "p1",
            "vms": [{"type": "vm", "name": "a"}, null],
            "apis": ["compute.googleapis.com"],
            "vpc": [],
            "labels": {"env": "dev"}
        }))
        .unwrap();

        let keys: Vec<_> = project.entries.keys().cloned().collect();
        assert_eq!(keys, vec!["vms", "apis", "vpc", "labels"]);
        assert!(matches!(project.entries["vms"], ProjectEntry::Resources(ref v) if v.len() == 2));
        assert!(matches!(project.entries["apis"], ProjectEntry::Value(_)));
        assert!(matches!(project.entries["vpc"], ProjectEntry::Resources(ref v) if v.is_empty()));
        assert_eq!(project.resources("vms").count(), 1);
    }

    #[test]
    fn test_stray_scalar_in_resource_list_is_skipped() {
        let project: Project = serde_json::from_value(json!({
            "projectId": "p1",
            "vpc": [{"type": "vpc", "name": "net", "createNat": true}, "oops", null],
            "tags": ["a", null]
        }))
        .unwrap();

        let vpcs = project.collection(VPC_COLLECTION).unwrap();
        assert_eq!(vpcs.len(), 2);
        assert_eq!(vpcs[0].as_ref().and_then(|r| r.name()), Some("net"));
        assert!(vpcs[1].is_none());
        assert!(matches!(project.entries["tags"], ProjectEntry::Value(_)));
    }

    #[test]
    fn test_round_trip_keeps_unknown_keys() {
        let input = json!({
            "description": "demo",
            "projects": [{"projectId": "p1", "pscSettings": {"networkForPsc": "n", "mode": "x"}}],
            "owner": "netops"
        });
        let config: CompleteConfig = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&config).unwrap(), input);
    }

    #[test]
    fn test_effective_prefix_and_region() {
        let config: CompleteConfig = serde_json::from_value(json!({
            "namePrefix": "doc",
            "defaultRegion": "us-east1",
            "projects": [
                {"projectId": "a", "namePrefix": "proj", "defaultRegion": "europe-west1"},
                {"projectId": "b"}
            ]
        }))
        .unwrap();
        assert_eq!(config.name_prefix_for(&config.projects[0]), Some("proj"));
        assert_eq!(config.name_prefix_for(&config.projects[1]), Some("doc"));
        assert_eq!(config.default_region_for(&config.projects[0]), Some("europe-west1"));
        assert_eq!(config.default_region_for(&config.projects[1]), Some("us-east1"));
    }

    #[test]
    fn test_collection_or_insert_replaces_null() {
        let mut project: Project =
            serde_json::from_value(json!({"projectId": "p", "routers": null})).unwrap();
        project.push_resource(ROUTERS_COLLECTION, Resource::typed("router", "r1"));
        assert!(project.has_named(ROUTERS_COLLECTION, "r1"));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let err = CompleteConfig::from_json_str("{\"projects\": [").unwrap_err();
        assert!(matches!(err, Error::JsonParse(_)));
    }
}
