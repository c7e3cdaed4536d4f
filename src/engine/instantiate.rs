//! Schema-driven instantiation, layered defaults and count expansion.

use crate::loader::{Defaults, Schema};
use crate::model::{CompleteConfig, Resource, COUNT_FIELD, NAME_FIELD, TYPE_FIELD};
use crate::registry::TypeRegistry;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Schemas and defaults preloaded for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    schemas: IndexMap<String, Schema>,
    defaults: IndexMap<String, Defaults>,
}

impl ResourceCatalog {
    /// Build a catalog from preloaded schemas and defaults.
    pub fn new(schemas: IndexMap<String, Schema>, defaults: IndexMap<String, Defaults>) -> Self {
        Self { schemas, defaults }
    }

    /// Register (or replace) a type's schema.
    pub fn insert_schema(&mut self, type_name: impl Into<String>, schema: Schema) {
        self.schemas.insert(type_name.into(), schema);
    }

    /// Register (or replace) a type's defaults.
    pub fn insert_defaults(&mut self, type_name: impl Into<String>, defaults: Defaults) {
        self.defaults.insert(type_name.into(), defaults);
    }

    /// Schema for a type, if preloaded.
    pub fn schema(&self, type_name: &str) -> Option<&Schema> {
        self.schemas.get(type_name)
    }

    /// Defaults for a type, if preloaded.
    pub fn defaults(&self, type_name: &str) -> Option<&Defaults> {
        self.defaults.get(type_name)
    }

    /// Layer schema skeleton, then defaults, then `fields` into one resource.
    ///
    /// `type` always comes first and is set to `type_name`; `count` never
    /// survives.
    pub fn instantiate(&self, type_name: &str, fields: Map<String, Value>) -> Resource {
        let mut instance = Map::new();
        instance.insert(TYPE_FIELD.to_string(), Value::String(type_name.to_string()));

        let layers = self
            .schema(type_name)
            .map(Schema::create_instance)
            .into_iter()
            .chain(self.defaults(type_name).cloned());
        for layer in layers.chain(std::iter::once(fields)) {
            for (key, value) in layer {
                if key == TYPE_FIELD || key == COUNT_FIELD {
                    continue;
                }
                instance.insert(key, value);
            }
        }

        Resource::from(instance)
    }
}

/// Replace a resource carrying `count: N` with N named siblings.
///
/// Siblings are named `{prefix-}{name}-{i}` for `i` in `1..=N`. Resources
/// without `count` come back unchanged as a single item.
pub fn expand_count(resource: Resource, name_prefix: Option<&str>) -> Vec<Resource> {
    let Some(count) = resource.get(COUNT_FIELD).cloned() else {
        return vec![resource];
    };

    let mut template = resource;
    template.remove(COUNT_FIELD);

    let Some(count) = count.as_u64() else {
        warn!(
            "Ignoring non-integer count {} on resource '{}'",
            count,
            template.name().unwrap_or("<unnamed>")
        );
        return vec![template];
    };

    let base = template
        .name()
        .or_else(|| template.type_name())
        .unwrap_or("resource")
        .to_string();
    let prefix = name_prefix
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}-", p))
        .unwrap_or_default();

    debug!("Expanding '{}' into {} instances", base, count);
    (1..=count)
        .map(|i| {
            let mut sibling = template.clone();
            sibling.insert(NAME_FIELD, format!("{}{}-{}", prefix, base, i));
            sibling
        })
        .collect()
}

/// Instantiate one declared resource.
///
/// `element_type` is the type implied by the list the resource sits in (for
/// items of a parent's nested list); the declared `type` wins over it. A
/// resource with neither is returned unchanged.
pub fn instantiate_resource(
    resource: Resource,
    element_type: Option<&str>,
    name_prefix: Option<&str>,
    registry: &TypeRegistry,
    catalog: &ResourceCatalog,
) -> Resource {
    let Some(type_name) = resource.type_name().or(element_type).map(str::to_string) else {
        warn!(
            "Resource '{}' has no 'type' field; passing it through unchanged",
            resource.name().unwrap_or("<unnamed>")
        );
        return resource;
    };

    let mut instance = catalog.instantiate(&type_name, resource.into_fields());

    for (field, nested_type) in registry.nested_resources(&type_name) {
        let Some(Value::Array(items)) = instance.get_mut(&field) else {
            continue;
        };
        let declared = std::mem::take(items);
        let mut expanded = Vec::with_capacity(declared.len());
        for item in declared {
            let Value::Object(fields) = item else {
                expanded.push(item);
                continue;
            };
            for sibling in expand_count(Resource::from(fields), name_prefix) {
                let child = instantiate_resource(sibling, Some(nested_type.as_str()), name_prefix, registry, catalog);
                expanded.push(Value::from(child));
            }
        }
        *items = expanded;
    }

    instance
}

/// Expand and instantiate every resource of every project, in place.
pub fn instantiate_all(config: &mut CompleteConfig, registry: &TypeRegistry, catalog: &ResourceCatalog) {
    let prefixes: Vec<Option<String>> = config
        .projects
        .iter()
        .map(|project| config.name_prefix_for(project).map(str::to_string))
        .collect();

    for (project, prefix) in config.projects.iter_mut().zip(prefixes) {
        for (_, items) in project.collections_mut() {
            let declared = std::mem::take(items);
            for item in declared {
                let Some(resource) = item else {
                    items.push(None);
                    continue;
                };
                for sibling in expand_count(resource, prefix.as_deref()) {
                    items.push(Some(instantiate_resource(
                        sibling,
                        None,
                        prefix.as_deref(),
                        registry,
                        catalog,
                    )));
                }
            }
        }
    }
}
