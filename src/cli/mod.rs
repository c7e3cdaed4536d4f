//! CLI module for Topogen
//!
//! This module provides the command-line interface for Topogen,
//! including argument parsing, configuration overrides, and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use topogen::config::LogFormat;

/// Topogen - network topology configuration generator
///
/// Resolves an architecture spec into a complete configuration and renders
/// deployment artifacts from it.
#[derive(Parser, Debug, Clone)]
#[command(name = "topogen")]
#[command(author = "Topogen Contributors")]
#[command(version)]
#[command(about = "Resolves network topology specs into complete configurations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "TOPOGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Output format for command messages
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Type registry file
    #[arg(long, global = true)]
    pub registry: Option<PathBuf>,

    /// Directory holding per-type schema files
    #[arg(long, global = true)]
    pub schemas_dir: Option<PathBuf>,

    /// Directory holding per-type defaults files
    #[arg(long, global = true)]
    pub defaults_dir: Option<PathBuf>,

    /// Root of the artifact template tree
    #[arg(long, global = true)]
    pub templates_dir: Option<PathBuf>,

    /// Directory receiving complete configurations and artifacts
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,
}

/// Output format for CLI messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON lines for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve a spec into a complete configuration
    Generate(commands::generate::GenerateArgs),

    /// Render deployment artifacts from a complete configuration
    Render(commands::render::RenderArgs),

    /// Generate, then render
    All(commands::generate::AllArgs),

    /// Check the shape of a spec without resolving it
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
