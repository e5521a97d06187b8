//! Arxiom CLI
//!
//! Command-line interface for exercising the bounty registry.

mod scenario;

use anyhow::Context;
use arxiom_registry::RegistryConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arxiom")]
#[command(version)]
#[command(about = "Arxiom - token bounties for open problems", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Registry configuration file (TOML)
    #[arg(short, long, env = "ARXIOM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config,

    /// Replay a scenario file against an in-memory registry
    #[command(visible_alias = "r")]
    Run {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Stop at the first rejected step
        #[arg(long)]
        fail_fast: bool,
    },
}

/// Log level used when `RUST_LOG` is unset
fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = default_log_level(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = RegistryConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Run {
            scenario,
            fail_fast,
        } => {
            let scenario = scenario::Scenario::load(&scenario)?;
            let report = scenario::run(config, &scenario, fail_fast).await?;

            if report.rejected > 0 && fail_fast {
                anyhow::bail!("scenario stopped after a rejected step");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(false), "info");
        assert_eq!(default_log_level(true), "debug");
    }
}
