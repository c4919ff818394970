//! CLI Module
//!
//! Command-line interface for the Aqua equalizer core.

pub mod commands;

use aqua::ipc::Fault;
use aqua::state::Filter;
use clap::{Parser, Subcommand};

/// Aqua - equalizer command/response toolkit
#[derive(Parser, Debug)]
#[command(name = "aqua")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the auto-preamp value for a set of bands
    #[command(name = "response")]
    Response {
        /// Band as FREQ:GAIN:Q[:TYPE], e.g. 1000:6:1.4:PK (repeatable)
        #[arg(short, long = "band", value_parser = commands::parse_band, required = true)]
        bands: Vec<Filter>,

        /// Current preamp in dB
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        preamp: f64,

        /// Print the whole composed curve as JSON
        #[arg(long)]
        curve: bool,
    },

    /// Run a scripted session against the in-process equalizer
    #[command(name = "simulate")]
    Simulate {
        /// Failure to inject (not-installed, not-running, not-ready, silent, malformed)
        #[arg(short, long)]
        fault: Option<Fault>,

        /// Reply latency in milliseconds
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Command deadline in milliseconds (defaults to AQUA_IPC_TIMEOUT_MS or 10000)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}
