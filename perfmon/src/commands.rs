use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "perfmon", version, about = "Fabric performance chart monitor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the dashboard and refresh it for a number of cycles
    Run {
        /// Settings file (.toml or .json)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Pin board file; restored on start and saved on exit
        #[arg(long)]
        board: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        cycles: u64,
        /// Override the refresh period in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,
        /// Pin a summary chart by item name; repeatable
        #[arg(long = "pin")]
        pins: Vec<String>,
    },
    /// List the pins stored in a pin board file
    Pins {
        #[arg(long)]
        board: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
