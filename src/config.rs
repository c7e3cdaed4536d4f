//! Configuration module for Topogen
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/topogen/topogen.toml)
//! - User configuration (~/.config/topogen/topogen.toml)
//! - Project configuration (./topogen.toml)
//! - Environment variables
//! - Command-line arguments (applied by the binary)

use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input and output locations
    pub paths: PathsConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Type registry file
    pub registry: PathBuf,

    /// Directory holding `<type>_schema.json` files
    pub schemas_dir: PathBuf,

    /// Directory holding `<type>_defaults.json` files
    pub defaults_dir: PathBuf,

    /// Root of the artifact template tree
    pub templates_dir: PathBuf,

    /// Where complete configs and artifacts are written
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("schemas/supported_resources.json"),
            schemas_dir: PathBuf::from("schemas"),
            defaults_dir: PathBuf::from("defaults"),
            templates_dir: PathBuf::from("configuration"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the complete configuration
    pub pretty_json: bool,

    /// Suffix appended to the spec name for the complete configuration file
    pub complete_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty_json: true,
            complete_suffix: "-complete.json".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("TOPOGEN_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::FileNotFound(path));
                }
                config = config.merge_from_file(&path)?;
            }
            None => {
                for path in Self::get_config_paths() {
                    if path.exists() {
                        config = config.merge_from_file(&path)?;
                    }
                }
            }
        }

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Standard configuration file locations, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/topogen/topogen.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("topogen/topogen.toml"));
        }

        paths.push(PathBuf::from("topogen.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported config format '{}' for {}",
                    other,
                    path.display()
                )))
            }
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; non-default values in `other` win
    fn merge(&self, other: Config) -> Config {
        fn pick<T: PartialEq + Clone>(base: &T, other: T, default: T) -> T {
            if other != default {
                other
            } else {
                base.clone()
            }
        }

        let paths = PathsConfig::default();
        let output = OutputConfig::default();
        let logging = LoggingConfig::default();

        Config {
            paths: PathsConfig {
                registry: pick(&self.paths.registry, other.paths.registry, paths.registry),
                schemas_dir: pick(&self.paths.schemas_dir, other.paths.schemas_dir, paths.schemas_dir),
                defaults_dir: pick(
                    &self.paths.defaults_dir,
                    other.paths.defaults_dir,
                    paths.defaults_dir,
                ),
                templates_dir: pick(
                    &self.paths.templates_dir,
                    other.paths.templates_dir,
                    paths.templates_dir,
                ),
                output_dir: pick(&self.paths.output_dir, other.paths.output_dir, paths.output_dir),
            },
            output: OutputConfig {
                pretty_json: pick(&self.output.pretty_json, other.output.pretty_json, output.pretty_json),
                complete_suffix: pick(
                    &self.output.complete_suffix,
                    other.output.complete_suffix,
                    output.complete_suffix,
                ),
            },
            logging: LoggingConfig {
                level: pick(&self.logging.level, other.logging.level, logging.level),
                format: pick(&self.logging.format, other.logging.format, logging.format),
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        let path_overrides: [(&str, &mut PathBuf); 5] = [
            ("TOPOGEN_REGISTRY", &mut self.paths.registry),
            ("TOPOGEN_SCHEMAS_DIR", &mut self.paths.schemas_dir),
            ("TOPOGEN_DEFAULTS_DIR", &mut self.paths.defaults_dir),
            ("TOPOGEN_TEMPLATES_DIR", &mut self.paths.templates_dir),
            ("TOPOGEN_OUTPUT_DIR", &mut self.paths.output_dir),
        ];
        for (var, target) in path_overrides {
            if let Some(value) = std::env::var_os(var) {
                *target = PathBuf::from(value);
            }
        }

        // TOPOGEN_LOG_LEVEL
        if let Ok(level) = std::env::var("TOPOGEN_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Path of the complete configuration written for a spec named `name`
    pub fn complete_config_path(&self, output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{}{}", name, self.output.complete_suffix))
    }

    /// Load from a specific file, ignoring the standard locations and environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
