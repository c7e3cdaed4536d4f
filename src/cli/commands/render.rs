//! Render command
//!
//! Renders deployment artifacts from an already generated complete
//! configuration.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use topogen::model::CompleteConfig;
use topogen::registry::TypeRegistry;

/// Arguments for the render command
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    /// Path to a complete configuration produced by `generate`
    #[arg(required = true)]
    pub complete: PathBuf,
}

impl RenderArgs {
    /// Execute the render command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let registry = TypeRegistry::load(&ctx.config.paths.registry)?;
        let complete = CompleteConfig::from_path(&self.complete)?;

        ctx.output.section("Rendering artifacts");
        let count = ctx.render_artifacts(&complete, &registry)?;
        ctx.output.success(&format!(
            "{} artifacts written to {}",
            count,
            ctx.output_dir().display()
        ));
        Ok(0)
    }
}
