//! Resolution engine.
//!
//! Turns an architecture spec into a complete configuration in one
//! deterministic pass:
//!
//! 1. type discovery
//! 2. one batched schema load and one batched defaults load
//! 3. count expansion and instantiation of every declared resource
//! 4. implicit resource derivation (NAT, firewall, SCP, PSC, allow-lists)
//! 5. nested resource hoisting
//! 6. reference and self-link resolution
//!
//! All file access happens in step 2. Every later step works on the
//! in-memory document only.

pub mod derive;
pub mod hoist;
pub mod index;
pub mod instantiate;
pub mod resolve;

pub use index::{Found, Location, LookupMiss, ResourceIndex};
pub use instantiate::ResourceCatalog;
pub use resolve::ResolutionStats;

use crate::error::Result;
use crate::loader::{DefaultsLoader, SchemasLoader};
use crate::model::{CompleteConfig, PRODUCERS_COLLECTION};
use crate::registry::TypeRegistry;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// The resolution engine with its registry and per-instance loader caches.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    registry: TypeRegistry,
    schemas: SchemasLoader,
    defaults: DefaultsLoader,
}

impl ResolutionEngine {
    /// Create an engine over a loaded registry.
    pub fn new(
        registry: TypeRegistry,
        schemas_dir: impl Into<PathBuf>,
        defaults_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            schemas: SchemasLoader::new(schemas_dir),
            defaults: DefaultsLoader::new(defaults_dir),
        }
    }

    /// Create an engine, loading the registry from disk.
    pub fn from_paths(
        registry_path: impl AsRef<Path>,
        schemas_dir: impl Into<PathBuf>,
        defaults_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let registry = TypeRegistry::load(registry_path)?;
        Ok(Self::new(registry, schemas_dir, defaults_dir))
    }

    /// The type registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Every distinct type the document will need, in first-seen order.
    ///
    /// Includes the element types of nested lists that are present and the
    /// types derivation rules will emit for the triggers that exist.
    pub fn discover_types(&self, spec: &CompleteConfig) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut types = Vec::new();
        let mut add = |t: &str| {
            if seen.insert(t.to_string()) {
                types.push(t.to_string());
            }
        };

        let mut derived: Vec<&str> = Vec::new();
        for project in &spec.projects {
            for (collection, resource) in project.all_resources() {
                if let Some(type_name) = resource.type_name() {
                    add(type_name);
                }
                let Some(kind) = resource.kind(collection) else { continue };

                for (field, element_type) in self.registry.nested_resources(kind) {
                    let Some(Value::Array(items)) = resource.get(&field) else { continue };
                    for item in items.iter().filter_map(Value::as_object) {
                        match item.get("type").and_then(Value::as_str) {
                            Some(t) => add(t),
                            None => add(element_type.as_str()),
                        }
                    }
                }

                if derive::wants_nat(resource, collection) {
                    derived.push(derive::ROUTER_TYPE);
                }
                if collection == PRODUCERS_COLLECTION {
                    if derive::wants_firewall(resource) {
                        derived.push(derive::FIREWALL_RULE_TYPE);
                    }
                    if derive::wants_psc_endpoint(resource, &self.registry) {
                        derived.push(derive::ADDRESS_TYPE);
                        derived.push(derive::FORWARDING_RULE_TYPE);
                    }
                }
            }
        }
        for type_name in derived {
            add(type_name);
        }

        types
    }

    /// Load schemas and defaults for the given types in one batch each.
    pub fn preload(&mut self, types: &[String]) -> ResourceCatalog {
        let schemas = self.schemas.load_for_types(types, &self.registry);
        let defaults = self.defaults.load_for_types(types);
        ResourceCatalog::new(schemas, defaults)
    }

    /// Resolve an architecture spec into a complete configuration.
    #[instrument(skip(self, spec), fields(projects = spec.projects.len()))]
    pub fn generate(&mut self, spec: CompleteConfig) -> CompleteConfig {
        for issue in spec.validate() {
            warn!("Spec issue at {}", issue);
        }

        let types = self.discover_types(&spec);
        debug!("Discovered resource types: {:?}", types);
        let catalog = self.preload(&types);

        let mut config = spec;
        instantiate::instantiate_all(&mut config, &self.registry, &catalog);
        derive::derive_implicit_resources(&mut config, &self.registry, &catalog);
        let hoisted = hoist::hoist_nested_resources(&mut config, &self.registry);
        let stats = resolve::resolve_references(&mut config, &self.registry);

        info!(
            "Resolved {} projects: {} nested resources hoisted, {} references resolved, {} unresolved, {} self-links",
            config.projects.len(),
            hoisted,
            stats.resolved,
            stats.unresolved,
            stats.self_links
        );
        config
    }

    /// Read a spec file and resolve it. A malformed spec is the only fatal
    /// input error.
    pub fn generate_from_path(&mut self, path: impl AsRef<Path>) -> Result<CompleteConfig> {
        let spec = CompleteConfig::from_path(path)?;
        Ok(self.generate(spec))
    }
}
