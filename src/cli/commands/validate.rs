//! Validate command
//!
//! Checks the shape of an architecture spec without resolving it.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use topogen::error::Error;
use topogen::model::CompleteConfig;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Path to the architecture spec (JSON)
    #[arg(required = true)]
    pub spec: PathBuf,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let spec = CompleteConfig::from_path(&self.spec)?;
        let issues = spec.validate();

        if issues.is_empty() {
            ctx.output
                .success(&format!("{} is a valid architecture spec", self.spec.display()));
            return Ok(0);
        }

        ctx.output.section("Validation issues");
        for issue in &issues {
            ctx.output.warning(&issue.to_string());
        }
        Err(Error::SpecValidation(format!(
            "{} issue(s) in {}",
            issues.len(),
            self.spec.display()
        ))
        .into())
    }
}
