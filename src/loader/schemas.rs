//! Per-type JSON schema loading and instance skeletons.

use super::load_json_file;
use crate::registry::TypeRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A resource type's JSON schema.
///
/// The engine only reads `type` and `properties[*].readOnly`; the rest of
/// the document is opaque and kept as loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Value);

impl Schema {
    /// An empty schema, used when a type's schema is missing.
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Borrow the raw schema document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Properties map, when this is an object-typed schema.
    fn properties(&self) -> Option<&Map<String, Value>> {
        let schema = self.0.as_object()?;
        match schema.get("type") {
            None | Some(Value::Null) => {}
            Some(Value::String(t)) if t == "object" => {}
            Some(_) => return None,
        }
        schema.get("properties")?.as_object()
    }

    /// Instance skeleton: one `null` field per writable property.
    ///
    /// Non-object schemas produce an empty skeleton. Properties marked
    /// `readOnly: true` are skipped.
    pub fn create_instance(&self) -> Map<String, Value> {
        let Some(properties) = self.properties() else {
            return Map::new();
        };
        properties
            .iter()
            .filter(|(_, spec)| !matches!(spec.get("readOnly"), Some(Value::Bool(true))))
            .map(|(name, _)| (name.clone(), Value::Null))
            .collect()
    }
}

impl From<Value> for Schema {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Loads `{type}_schema.json` files, memoizing per loader instance.
#[derive(Debug, Clone)]
pub struct SchemasLoader {
    schemas_dir: PathBuf,
    schemas: IndexMap<String, Schema>,
}

impl SchemasLoader {
    /// Create a loader reading from `schemas_dir`.
    pub fn new(schemas_dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas_dir: schemas_dir.into(),
            schemas: IndexMap::new(),
        }
    }

    /// Directory schemas are read from.
    pub fn schemas_dir(&self) -> &Path {
        &self.schemas_dir
    }

    /// Path of a type's schema file.
    pub fn schema_path(&self, type_name: &str) -> PathBuf {
        self.schemas_dir.join(format!("{}_schema.json", type_name))
    }

    /// Load schemas for the given types in one batch.
    ///
    /// Types missing from the registry are not read from disk; they, and any
    /// type whose file is missing or invalid, resolve to an empty schema.
    pub fn load_for_types(
        &mut self,
        resource_types: &[String],
        registry: &TypeRegistry,
    ) -> IndexMap<String, Schema> {
        for type_name in resource_types {
            if self.schemas.contains_key(type_name) {
                continue;
            }
            let schema = self.load_one(type_name, registry);
            self.schemas.insert(type_name.clone(), schema);
        }

        resource_types
            .iter()
            .filter_map(|t| self.schemas.get(t).map(|s| (t.clone(), s.clone())))
            .collect()
    }

    fn load_one(&self, type_name: &str, registry: &TypeRegistry) -> Schema {
        if !registry.contains(type_name) {
            warn!(
                "Resource type '{}' is not in supported_resources.",
                type_name
            );
            return Schema::empty();
        }

        match load_json_file(self.schema_path(type_name)) {
            Ok(value) => {
                debug!("Loaded schema for resource type '{}'", type_name);
                Schema::from(value)
            }
            Err(e) => {
                warn!(
                    "Schema not found or failed to load for supported resource type: '{}' ({:?})",
                    type_name,
                    e.reason()
                );
                Schema::empty()
            }
        }
    }

    /// Every schema loaded so far.
    pub fn schemas(&self) -> &IndexMap<String, Schema> {
        &self.schemas
    }
}
