//! Best-effort loaders for per-type schema and default files.
//!
//! Both loaders share [`load_json_file`], which classifies failures into a
//! [`LoadError`] and logs them. The loaders turn every failure into an empty
//! result for the type concerned, so a missing or broken file never aborts
//! a resolution run.

mod defaults;
mod schemas;

pub use defaults::{Defaults, DefaultsLoader};
pub use schemas::{Schema, SchemasLoader};

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::error;

/// Why a JSON file could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureReason {
    /// The file does not exist
    NotFound,
    /// The file exists but is not valid JSON
    DecodeError,
    /// Any other I/O failure (permissions, is-a-directory, ...)
    IoError,
}

/// Failure loading a JSON file at the loader boundary.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File is not valid JSON.
    #[error("Error decoding JSON from {}: {source}", path.display())]
    Decode {
        /// File path
        path: PathBuf,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Other I/O failure.
    #[error("An unexpected error occurred loading {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// The reason code for this failure.
    pub fn reason(&self) -> LoadFailureReason {
        match self {
            LoadError::NotFound(_) => LoadFailureReason::NotFound,
            LoadError::Decode { .. } => LoadFailureReason::DecodeError,
            LoadError::Io { .. } => LoadFailureReason::IoError,
        }
    }
}

/// Read and decode a JSON file, logging any failure at error level.
pub fn load_json_file(path: impl AsRef<Path>) -> Result<Value, LoadError> {
    let path = path.as_ref();
    let result = read_json(path);
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
