//! Topogen - network topology configuration generator
//!
//! This is the main entry point for the Topogen CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use topogen::config::{Config, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for(&e);
            cli::output::OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity())
                .error(&format!("{:#}", e));
            code
        }
    };

    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    // Load configuration
    let (config, config_error) = match Config::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize logging based on verbosity and configuration
    init_logging(
        cli.verbosity(),
        &config.logging.level,
        cli.log_format.unwrap_or(config.logging.format),
    );

    if cli.verbosity() >= 2 {
        tracing::debug!("{}", topogen::version_info());
    }

    // Create command context
    let mut ctx = CommandContext::new(cli, config);
    if let Some(e) = config_error {
        ctx.output
            .warning(&format!("Failed to load config, using defaults: {}", e));
    }

    // Execute the appropriate command
    let exit_code = match &cli.command {
        Commands::Generate(args) => args.execute(&mut ctx)?,
        Commands::Render(args) => args.execute(&mut ctx)?,
        Commands::All(args) => args.execute(&mut ctx)?,
        Commands::Validate(args) => args.execute(&mut ctx)?,
    };

    ctx.output.flush();
    Ok(exit_code)
}

/// Map an error to the process exit status
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<topogen::error::Error>()
        .map_or(1, topogen::error::Error::exit_code)
}

/// Initialize logging based on verbosity level
///
/// `RUST_LOG` wins; otherwise `-v` flags raise the configured level.
fn init_logging(verbosity: u8, configured_level: &str, format: LogFormat) {
    let filter = match verbosity {
        0 => configured_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(topogen::version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_exit_code_mapping() {
        let spec_error: anyhow::Error =
            topogen::error::Error::spec_parse("spec.json", "bad", None).into();
        assert_eq!(exit_code_for(&spec_error), 4);

        let wrapped = anyhow::Error::from(topogen::error::Error::ArtifactBatch {
            failed: 1,
            total: 2,
        })
        .context("rendering");
        assert_eq!(exit_code_for(&wrapped), 3);

        assert_eq!(exit_code_for(&anyhow::anyhow!("other")), 1);
    }
}
