//! # Topogen - Network Topology Configuration Generator
//!
//! Topogen turns a short, human-authored architecture spec describing cloud
//! projects, VPC networks, managed service producers and their consumers
//! into a complete, fully linked configuration document, and from that
//! document into deployment artifacts.
//!
//! ## Core Concepts
//!
//! - **Architecture spec**: the input document; projects holding collections of resources
//! - **Type registry**: per-type metadata (URI template, nested lists, connectivity, artifacts)
//! - **Schemas and defaults**: per-type field skeletons and default values
//! - **Derivation**: implicit NAT routers, firewall rules, SCP policies and PSC endpoints
//! - **Resolution**: name references rewritten to self-links, every typed resource given a `selfLink`
//! - **Artifacts**: YAML and tfvars files rendered from the complete configuration
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │                    (clap-based command parsing)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Resolution Engine                             │
//! │   discover → preload → instantiate → derive → hoist → resolve        │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │  Type Registry  │   │  Schema / Defaults  │   │   Resource Index    │
//! │  (per-type      │   │  loaders (batched,  │   │   (project-first    │
//! │   metadata)     │   │   memoized)         │   │    name lookups)    │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Artifact Context Builder                           │
//! │          (file specs rendered through minijinja templates)           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use topogen::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut engine = ResolutionEngine::from_paths(
//!         "schemas/supported_resources.json",
//!         "schemas",
//!         "defaults",
//!     )?;
//!     let complete = engine.generate_from_path("spec.json")?;
//!
//!     let builder = ArtifactContextBuilder::new(&complete, engine.registry(), "configuration");
//!     let files = builder.generate_all_resource_files(&JinjaRenderer::new())?;
//!     write_artifacts("output".as_ref(), &files)?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    //!
    //! ```rust,ignore
    //! use topogen::prelude::*;
    //! ```

    // Document model
    pub use crate::model::{CompleteConfig, Project, ProjectEntry, PscSettings, Resource};

    // Registry
    pub use crate::registry::{ConnectivityType, GenerationConfig, TypeRegistry, TypeRegistryEntry};

    // Engine
    pub use crate::engine::{ResolutionEngine, ResolutionStats, ResourceCatalog, ResourceIndex};

    // Artifacts and templates
    pub use crate::artifacts::{write_artifacts, ArtifactContextBuilder, FileSpec};
    pub use crate::template::{JinjaRenderer, TemplateRenderer};

    // Configuration
    pub use crate::config::Config;

    // Error types
    pub use crate::error::{Error, ErrorContext, Result};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and the crate-wide `Result` alias.
pub mod error;

/// Architecture spec and complete configuration documents.
///
/// The same types describe input and output; resolution only adds
/// resources, moves nested ones and rewrites references.
pub mod model;

/// The type registry (`supported_resources.json`).
pub mod registry;

/// Schema and defaults loaders.
///
/// Per-type JSON files are loaded once per engine and cached. A missing or
/// malformed file is logged and treated as empty.
pub mod loader;

/// The resolution engine.
pub mod engine;

// ============================================================================
// Artifacts
// ============================================================================

/// Render contexts and output paths for deployment artifacts.
pub mod artifacts;

/// Jinja2-compatible template rendering powered by minijinja.
pub mod template;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration management for Topogen behavior.
///
/// Handles loading and merging configuration from multiple sources:
/// environment variables, config files, and command-line arguments.
pub mod config;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of Topogen.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns detailed version information including build metadata.
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        rust_version: option_env!("CARGO_PKG_RUST_VERSION").unwrap_or("unknown"),
        target: std::env::consts::ARCH,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Detailed version information for the Topogen build.
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Semantic version string
    pub version: &'static str,
    /// Minimum Rust version required
    pub rust_version: &'static str,
    /// Target architecture
    pub target: &'static str,
    /// Build profile (debug or release)
    pub profile: &'static str,
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "topogen {} ({}, {})",
            self.version, self.target, self.profile
        )
    }
}
