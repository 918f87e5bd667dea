//! Command-line interface for the game service.

use clap::Parser;
use std::path::PathBuf;

/// Tic-tac-toe game service - line-delimited JSON on stdio
#[derive(Parser, Debug)]
#[command(name = "tictactoe_service")]
#[command(about = "Authoritative tic-tac-toe session engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Append events to this file instead of the configured target
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Override the event topic
    #[arg(long)]
    pub topic: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    pub log_filter: Option<String>,
}
