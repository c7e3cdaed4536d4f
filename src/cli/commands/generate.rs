//! Generate command
//!
//! Resolves an architecture spec into a complete configuration, and for
//! `all`, renders the artifacts straight after.

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use topogen::engine::ResolutionEngine;
use topogen::model::CompleteConfig;

/// Arguments for the generate command
#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Path to the architecture spec (JSON)
    #[arg(required = true)]
    pub spec: PathBuf,

    /// Name used for the output file (defaults to the spec file stem)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Print the complete configuration instead of writing it
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments for the all command
#[derive(Parser, Debug, Clone)]
pub struct AllArgs {
    /// Path to the architecture spec (JSON)
    #[arg(required = true)]
    pub spec: PathBuf,

    /// Name used for the output file (defaults to the spec file stem)
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

fn spec_name(spec: &Path, name: Option<&str>) -> String {
    name.map(str::to_string).unwrap_or_else(|| {
        spec.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "architecture".to_string())
    })
}

/// Run the engine over a spec file.
fn resolve(ctx: &CommandContext, spec: &Path) -> Result<(ResolutionEngine, CompleteConfig)> {
    let paths = &ctx.config.paths;
    let mut engine = ResolutionEngine::from_paths(
        &paths.registry,
        paths.schemas_dir.clone(),
        paths.defaults_dir.clone(),
    )?;
    ctx.output.info(&format!("Resolving {}", spec.display()));
    let complete = engine.generate_from_path(spec)?;
    Ok((engine, complete))
}

fn serialize(ctx: &CommandContext, complete: &CompleteConfig) -> Result<String> {
    let text = if ctx.config.output.pretty_json {
        complete.to_json_pretty()?
    } else {
        serde_json::to_string(complete)?
    };
    Ok(text)
}

/// Write the complete configuration for `name` under the output directory.
fn write_complete(ctx: &CommandContext, name: &str, complete: &CompleteConfig) -> Result<PathBuf> {
    let path = ctx.config.complete_config_path(ctx.output_dir(), name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, serialize(ctx, complete)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

impl GenerateArgs {
    /// Execute the generate command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (_, complete) = resolve(ctx, &self.spec)?;

        if self.stdout {
            ctx.output.document(&serialize(ctx, &complete)?);
            return Ok(0);
        }

        let name = spec_name(&self.spec, self.name.as_deref());
        let path = write_complete(ctx, &name, &complete)?;
        ctx.output
            .success(&format!("Complete configuration written to {}", path.display()));
        Ok(0)
    }
}

impl AllArgs {
    /// Execute the all command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let (engine, complete) = resolve(ctx, &self.spec)?;

        let name = spec_name(&self.spec, self.name.as_deref());
        let path = write_complete(ctx, &name, &complete)?;
        ctx.output
            .info(&format!("Complete configuration written to {}", path.display()));

        ctx.output.section("Rendering artifacts");
        let count = ctx.render_artifacts(&complete, engine.registry())?;
        ctx.output.success(&format!(
            "{} written with {} artifacts",
            path.display(),
            count
        ));
        Ok(0)
    }
}
