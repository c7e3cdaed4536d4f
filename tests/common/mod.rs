//! Shared test utilities and fixtures for the Topogen test suite.
//!
//! This module provides:
//! - Fixture loading helpers for the checked-in registry, schemas, defaults and templates
//! - Temporary workspaces with their own registry/schema/defaults trees
//! - A recording template renderer
//!
//! # Usage
//!
//! Include this module in your integration tests:
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;

use topogen::engine::ResolutionEngine;
use topogen::error::{Error, Result};
use topogen::registry::TypeRegistry;
use topogen::template::TemplateRenderer;

// ============================================================================
// Fixtures
// ============================================================================

/// Get the path to the test fixtures directory.
pub fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Get the path to a specific fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_path().join(relative_path)
}

/// Load a fixture file as JSON.
pub fn load_json_fixture(relative_path: &str) -> Value {
    let content = std::fs::read_to_string(fixture_path(relative_path))
        .unwrap_or_else(|e| panic!("fixture {}: {}", relative_path, e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("fixture {}: {}", relative_path, e))
}

/// The checked-in type registry.
pub fn fixture_registry() -> TypeRegistry {
    TypeRegistry::load(fixture_path("registry/supported_resources.json")).unwrap()
}

/// An engine over the checked-in registry, schemas and defaults.
pub fn fixture_engine() -> ResolutionEngine {
    ResolutionEngine::new(
        fixture_registry(),
        fixture_path("schemas"),
        fixture_path("defaults"),
    )
}

// ============================================================================
// Temporary Workspaces
// ============================================================================

/// A temporary directory laid out like a Topogen project.
pub struct TestContext {
    /// The temporary directory
    pub temp_dir: TempDir,
}

impl TestContext {
    /// Create a new, empty workspace.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a file in the temporary directory.
    pub fn create_file(&self, relative_path: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a JSON file in the temporary directory.
    pub fn create_json(&self, relative_path: &str, value: &Value) -> std::io::Result<PathBuf> {
        self.create_file(relative_path, &serde_json::to_string_pretty(value)?)
    }

    /// Registry path inside the workspace.
    pub fn registry_path(&self) -> PathBuf {
        self.path().join("schemas/supported_resources.json")
    }

    /// Schemas directory inside the workspace.
    pub fn schemas_dir(&self) -> PathBuf {
        self.path().join("schemas")
    }

    /// Defaults directory inside the workspace.
    pub fn defaults_dir(&self) -> PathBuf {
        self.path().join("defaults")
    }

    /// Output directory inside the workspace.
    pub fn output_dir(&self) -> PathBuf {
        self.path().join("output")
    }

    /// Write the registry.
    pub fn with_registry(self, registry: &Value) -> Self {
        self.create_json("schemas/supported_resources.json", registry)
            .unwrap();
        self
    }

    /// Write a schema for a type.
    pub fn with_schema(self, type_name: &str, schema: &Value) -> Self {
        self.create_json(&format!("schemas/{}_schema.json", type_name), schema)
            .unwrap();
        self
    }

    /// Write defaults for a type.
    pub fn with_defaults(self, type_name: &str, defaults: &Value) -> Self {
        self.create_json(&format!("defaults/{}_defaults.json", type_name), defaults)
            .unwrap();
        self
    }

    /// An engine reading this workspace.
    pub fn engine(&self) -> ResolutionEngine {
        ResolutionEngine::from_paths(self.registry_path(), self.schemas_dir(), self.defaults_dir())
            .unwrap()
    }
}

// ============================================================================
// Renderers
// ============================================================================

/// Renderer that records every call and fails on chosen templates.
#[derive(Default)]
pub struct RecordingRenderer {
    fail_on: Vec<String>,
    calls: Mutex<Vec<(PathBuf, String)>>,
}

impl RecordingRenderer {
    /// A renderer that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever `template_name` is rendered.
    pub fn failing_on(mut self, template_name: &str) -> Self {
        self.fail_on.push(template_name.to_string());
        self
    }

    /// Every (template_dir, template_name) rendered so far.
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TemplateRenderer for RecordingRenderer {
    fn render(&self, template_dir: &Path, template_name: &str, context: &Value) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((template_dir.to_path_buf(), template_name.to_string()));
        if self.fail_on.iter().any(|t| t == template_name) {
            return Err(Error::template_render(template_name, "forced failure"));
        }
        Ok(context.to_string())
    }
}
