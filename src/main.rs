//! Aqua CLI
//!
//! Command-line front end for the Aqua equalizer core.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Aqua v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Response {
            bands,
            preamp,
            curve,
        } => cli::commands::response(&bands, preamp, curve),
        Commands::Simulate {
            fault,
            latency_ms,
            timeout_ms,
        } => cli::commands::simulate(fault, latency_ms, timeout_ms).await,
    }
}
