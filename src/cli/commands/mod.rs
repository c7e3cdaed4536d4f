//! Subcommands module for Topogen CLI
//!
//! This module contains all the subcommand implementations.

pub mod generate;
pub mod render;
pub mod validate;

use crate::cli::output::OutputFormatter;
use crate::cli::Cli;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use topogen::artifacts::{write_artifacts, ArtifactContextBuilder};
use topogen::config::Config;
use topogen::model::CompleteConfig;
use topogen::registry::TypeRegistry;
use topogen::template::JinjaRenderer;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration with command-line overrides applied
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &Cli, mut config: Config) -> Self {
        let overrides: [(&Option<PathBuf>, &mut PathBuf); 5] = [
            (&cli.registry, &mut config.paths.registry),
            (&cli.schemas_dir, &mut config.paths.schemas_dir),
            (&cli.defaults_dir, &mut config.paths.defaults_dir),
            (&cli.templates_dir, &mut config.paths.templates_dir),
            (&cli.output_dir, &mut config.paths.output_dir),
        ];
        for (flag, target) in overrides {
            if let Some(path) = flag {
                *target = path.clone();
            }
        }

        Self {
            config,
            output: OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity()),
        }
    }

    /// Directory receiving complete configurations and artifacts
    pub fn output_dir(&self) -> &Path {
        &self.config.paths.output_dir
    }

    /// Render every artifact for a complete configuration and write them.
    ///
    /// Nothing is written unless every file renders.
    pub fn render_artifacts(
        &self,
        complete: &CompleteConfig,
        registry: &TypeRegistry,
    ) -> Result<usize> {
        let builder =
            ArtifactContextBuilder::new(complete, registry, self.config.paths.templates_dir.clone());
        let files = builder.generate_all_resource_files(&JinjaRenderer::new())?;

        let out_dir = self.output_dir();
        let written = write_artifacts(out_dir, &files)
            .with_context(|| format!("Failed to write artifacts to {}", out_dir.display()))?;

        self.output.list(
            "Artifacts",
            &written
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        );
        Ok(written.len())
    }
}
