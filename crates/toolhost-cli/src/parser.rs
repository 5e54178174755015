//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Supervise local tool servers and expose them to a remote caller.
#[derive(Parser)]
#[command(name = "toolhost")]
#[command(about = "Supervise local MCP tool servers")]
#[command(version)]
pub struct Cli {
    /// Override the config file location
    #[arg(long, global = true, env = "TOOLHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
