//! Operator CLI for Handover
//!
//! Checks what version a deployment publishes, watches it for changes, and
//! shows the effective coordinator configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod handlers;

use handlers::{config as config_cmd, probe, watch};

#[derive(Parser)]
#[command(name = "handover")]
#[command(about = "Handover - update coordinator tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = "handover.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the published version once
    Probe {
        /// Deployment base URL (overrides the config file)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Running app version to compare against
        #[arg(short, long)]
        app_version: Option<String>,
    },

    /// Probe periodically and report version changes
    Watch {
        /// Seconds between probes (defaults to the configured poll interval)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many probes
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = handlers::load_config(&cli.config)?;

    match cli.command {
        Commands::Probe {
            base_url,
            app_version,
        } => {
            probe::run(config, base_url, app_version).await?;
        }

        Commands::Watch { interval, count } => {
            watch::run(config, interval, count).await?;
        }

        Commands::Config => {
            config_cmd::run(&config)?;
        }
    }

    Ok(())
}
