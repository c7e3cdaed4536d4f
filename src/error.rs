//! Error types for Topogen.
//!
//! This module defines the error types used throughout Topogen. Only a
//! handful of conditions are fatal: an unreadable primary spec, an
//! unreadable type registry, and a failed artifact batch. Everything else
//! (missing schemas, unknown types, dangling references) is logged and
//! recovered from locally.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Topogen operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Topogen.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Spec Errors
    // ========================================================================
    /// The architecture spec could not be read or decoded.
    #[error("Failed to parse spec '{path}': {message}")]
    SpecParse {
        /// Path to the spec file
        path: PathBuf,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The spec decoded but its shape is unusable.
    #[error("Spec validation failed: {0}")]
    SpecValidation(String),

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// The type registry could not be loaded.
    #[error("Failed to load type registry from '{path}': {message}")]
    RegistryLoad {
        /// Path to the registry file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Template Errors
    // ========================================================================
    /// Template (or its directory) not found.
    #[error("Template '{template}' not found")]
    TemplateNotFound {
        /// Template name or path
        template: String,
    },

    /// Template rendering error.
    #[error("Template rendering failed for '{template}': {message}")]
    TemplateRender {
        /// Template name or path
        template: String,
        /// Error message
        message: String,
    },

    /// At least one file in an artifact batch failed to render.
    #[error("Artifact generation failed: {failed} of {total} files could not be rendered")]
    ArtifactBatch {
        /// Number of failed files
        failed: usize,
        /// Number of files in the batch
        total: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Template error.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new spec parse error.
    pub fn spec_parse(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SpecParse {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a new registry load error.
    pub fn registry_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RegistryLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new template render error.
    pub fn template_render(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateRender {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error belongs to the artifact/template stage.
    pub fn is_render_failure(&self) -> bool {
        matches!(
            self,
            Error::TemplateNotFound { .. }
                | Error::TemplateRender { .. }
                | Error::ArtifactBatch { .. }
                | Error::Template(_)
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::SpecParse { .. } | Error::SpecValidation(_) => 4,
            Error::RegistryLoad { .. } => 5,
            e if e.is_render_failure() => 3,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::spec_parse("a.json", "bad", None).exit_code(), 4);
        assert_eq!(Error::SpecValidation("2 issue(s)".into()).exit_code(), 4);
        assert_eq!(Error::registry_load("r.json", "gone").exit_code(), 5);
        assert_eq!(
            Error::ArtifactBatch {
                failed: 1,
                total: 3
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::Config("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_context_wraps_source() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = res.context("writing artifacts").unwrap_err();
        assert_eq!(err.to_string(), "writing artifacts");
        assert!(std::error::Error::source(&err).is_some());
    }
}
