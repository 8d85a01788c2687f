//! Command-line argument definitions.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Billable time tracking service.
///
/// Tracks per-user timers and time entries against issues over HTTP.
#[derive(Debug, Parser)]
#[command(name = "tt-server", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration.
    #[arg(long, global = true)]
    pub bind: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default).
    Serve,

    /// Print the effective configuration as TOML.
    Config,
}
