//! Per-type default value loading.

use super::load_json_file;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flat default values for one type, lowest precedence under user input.
pub type Defaults = Map<String, Value>;

/// Loads `{type}_defaults.json` files, memoizing per loader instance.
#[derive(Debug, Clone)]
pub struct DefaultsLoader {
    defaults_dir: PathBuf,
    defaults: IndexMap<String, Defaults>,
}

impl DefaultsLoader {
    /// Create a loader reading from `defaults_dir`.
    pub fn new(defaults_dir: impl Into<PathBuf>) -> Self {
        Self {
            defaults_dir: defaults_dir.into(),
            defaults: IndexMap::new(),
        }
    }

    /// Directory defaults are read from.
    pub fn defaults_dir(&self) -> &Path {
        &self.defaults_dir
    }

    /// Path of a type's defaults file.
    pub fn defaults_path(&self, type_name: &str) -> PathBuf {
        self.defaults_dir.join(format!("{}_defaults.json", type_name))
    }

    /// Load defaults for the given types in one batch.
    ///
    /// Missing, unreadable, or non-object files resolve to empty defaults.
    pub fn load_for_types(&mut self, resource_types: &[String]) -> IndexMap<String, Defaults> {
        for type_name in resource_types {
            if self.defaults.contains_key(type_name) {
                continue;
            }
            let defaults = self.load_one(type_name);
            self.defaults.insert(type_name.clone(), defaults);
        }

        resource_types
            .iter()
            .filter_map(|t| self.defaults.get(t).map(|d| (t.clone(), d.clone())))
            .collect()
    }

    fn load_one(&self, type_name: &str) -> Defaults {
        match load_json_file(self.defaults_path(type_name)) {
            Ok(Value::Object(map)) => {
                debug!("Loaded {} defaults for resource type '{}'", map.len(), type_name);
                map
            }
            Ok(_) => {
                warn!(
                    "Defaults file for resource type '{}' is not a JSON object; ignoring it",
                    type_name
                );
                Defaults::new()
            }
            Err(e) => {
                warn!(
                    "Defaults not found or failed to load for resource type: '{}' ({:?})",
                    type_name,
                    e.reason()
                );
                Defaults::new()
            }
        }
    }

    /// Every defaults map loaded so far.
    pub fn defaults(&self) -> &IndexMap<String, Defaults> {
        &self.defaults
    }
}
