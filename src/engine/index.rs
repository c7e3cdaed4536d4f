//! Resource index for cross-project lookups.
//!
//! Built once per pass from the current document. Entries are positions, not
//! borrows, so the document can be mutated between lookups as long as no
//! resource is removed or reordered (derivation only appends).

use crate::model::{bare_name, CompleteConfig, Project, NAME_FIELD};
use crate::registry::TypeRegistry;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Kind under which VPC networks are indexed.
pub const VPC_KIND: &str = "vpc";
/// Kind under which subnetworks are indexed.
pub const SUBNETWORK_KIND: &str = "subnetwork";

/// Where a resource lives in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Index of the owning project
    pub project: usize,
    /// Collection key inside the project
    pub collection: String,
    /// Item index inside the collection
    pub item: usize,
    /// Nested list field and item index, for resources still inline in a parent
    pub nested: Option<(String, usize)>,
    /// Network the resource attaches to: the parent VPC for nested items,
    /// else its own `network` field
    pub network: Option<String>,
    /// Human-readable path, e.g. `host/vpc/my-net/subnets/my-subnet`
    pub locator: String,
}

/// A successful lookup.
#[derive(Debug, Clone)]
pub struct Found<'a> {
    /// Field bag of the resource
    pub fields: &'a Map<String, Value>,
    /// Owning project
    pub project: &'a Project,
    /// Position of the resource
    pub location: &'a Location,
}

impl<'a> Found<'a> {
    /// Non-empty string field of the found resource.
    pub fn str_field(&self, key: &str) -> Option<&'a str> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Human-readable locator path.
    pub fn locator(&self) -> &'a str {
        &self.location.locator
    }
}

/// Why a lookup found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupMiss {
    /// The reference was empty.
    #[error("empty resource name")]
    EmptyName,

    /// No resource of this kind and name exists anywhere in the document.
    #[error("no {kind} named '{name}' in any project")]
    NoSuchResource {
        /// Resource kind searched for
        kind: String,
        /// Bare name searched for
        name: String,
    },
}

/// `(kind, bare name)` to every location holding it, in document order.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    entries: HashMap<(String, String), Vec<Location>>,
}

impl ResourceIndex {
    /// Index every named resource of the document, including items still
    /// nested inside a parent's inline list.
    pub fn build(config: &CompleteConfig, registry: &TypeRegistry) -> Self {
        let mut index = Self::default();

        for (p, project) in config.projects.iter().enumerate() {
            for (collection, items) in project.collections() {
                for (i, resource) in items.iter().enumerate() {
                    let Some(resource) = resource else { continue };
                    let Some(kind) = resource.kind(collection) else { continue };
                    let name = resource.name().map(bare_name);

                    if let Some(name) = name {
                        index.insert(
                            kind,
                            name,
                            Location {
                                project: p,
                                collection: collection.to_string(),
                                item: i,
                                nested: None,
                                network: resource.str_field("network").map(|n| bare_name(n).to_string()),
                                locator: format!("{}/{}/{}", project.project_id, collection, name),
                            },
                        );
                    }

                    for (field, element_kind) in registry.nested_resources(kind) {
                        let Some(Value::Array(children)) = resource.get(&field) else {
                            continue;
                        };
                        for (j, child) in children.iter().enumerate() {
                            let Some(child) = child.as_object() else { continue };
                            let Some(child_name) = child.get(NAME_FIELD).and_then(Value::as_str) else {
                                continue;
                            };
                            let child_kind = child
                                .get("type")
                                .and_then(Value::as_str)
                                .unwrap_or(element_kind.as_str());
                            let child_name = bare_name(child_name);
                            let parent = name.unwrap_or("?");
                            index.insert(
                                child_kind,
                                child_name,
                                Location {
                                    project: p,
                                    collection: collection.to_string(),
                                    item: i,
                                    nested: Some((field.clone(), j)),
                                    network: (kind == VPC_KIND).then(|| parent.to_string()),
                                    locator: format!(
                                        "{}/{}/{}/{}/{}",
                                        project.project_id, collection, parent, field, child_name
                                    ),
                                },
                            );
                        }
                    }
                }
            }
        }

        index
    }

    fn insert(&mut self, kind: &str, name: &str, location: Location) {
        self.entries
            .entry((kind.to_string(), name.to_string()))
            .or_default()
            .push(location);
    }

    /// Every location of a `(kind, name)`, in document order.
    pub fn locations(&self, kind: &str, name: &str) -> &[Location] {
        self.entries
            .get(&(kind.to_string(), bare_name(name).to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find a resource by kind and name: the given project first, then all
    /// projects in document order.
    pub fn find<'a>(
        &'a self,
        config: &'a CompleteConfig,
        kind: &str,
        name: &str,
        from_project: Option<usize>,
    ) -> Result<Found<'a>, LookupMiss> {
        self.find_filtered(config, kind, name, from_project, |_| true)
    }

    /// Find a subnetwork, preferring one attached to `network` when given.
    ///
    /// Subnets still nested inside a VPC are found too.
    pub fn find_subnet<'a>(
        &'a self,
        config: &'a CompleteConfig,
        name: &str,
        network: Option<&str>,
        from_project: Option<usize>,
    ) -> Result<Found<'a>, LookupMiss> {
        if let Some(network) = network.map(bare_name).filter(|n| !n.is_empty()) {
            let on_network = self.find_filtered(config, SUBNETWORK_KIND, name, from_project, |loc| {
                loc.network.as_deref().map_or(true, |n| n == network)
            });
            if on_network.is_ok() {
                return on_network;
            }
        }
        self.find(config, SUBNETWORK_KIND, name, from_project)
    }

    fn find_filtered<'a>(
        &'a self,
        config: &'a CompleteConfig,
        kind: &str,
        name: &str,
        from_project: Option<usize>,
        accept: impl Fn(&Location) -> bool,
    ) -> Result<Found<'a>, LookupMiss> {
        let linked = link_project(name);
        let name = bare_name(name);
        if name.is_empty() {
            return Err(LookupMiss::EmptyName);
        }
        let miss = || LookupMiss::NoSuchResource {
            kind: kind.to_string(),
            name: name.to_string(),
        };

        let candidates = self.locations(kind, name);
        let found = match linked {
            Some(project_id) => {
                let p = config.project_index(project_id).ok_or_else(miss)?;
                candidates.iter().find(|loc| loc.project == p && accept(loc))
            }
            None => from_project
                .and_then(|p| candidates.iter().find(|loc| loc.project == p && accept(loc)))
                .or_else(|| candidates.iter().find(|loc| accept(loc))),
        };
        found.and_then(|loc| resolve_location(config, loc)).ok_or_else(miss)
    }
}

/// Project ID named by a self-link (`.../projects/{id}/...`). Bare names
/// have none.
pub fn link_project(value: &str) -> Option<&str> {
    let mut segments = value.split('/');
    while let Some(segment) = segments.next() {
        if segment == "projects" {
            return segments.next().filter(|id| !id.is_empty());
        }
    }
    None
}

fn resolve_location<'a>(config: &'a CompleteConfig, location: &'a Location) -> Option<Found<'a>> {
    let project = config.projects.get(location.project)?;
    let resource = project
        .collection(&location.collection)?
        .get(location.item)?
        .as_ref()?;
    let fields = match &location.nested {
        None => resource.fields(),
        Some((field, j)) => resource.get(field)?.as_array()?.get(*j)?.as_object()?,
    };
    Some(Found {
        fields,
        project,
        location,
    })
}
