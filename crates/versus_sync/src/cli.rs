//! Command-line interface for versus.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Versus - play tic-tac-toe against a server-hosted AI
#[derive(Parser, Debug)]
#[command(name = "versus")]
#[command(about = "Real-time tic-tac-toe client for a server-hosted AI opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a game server and play in the terminal
    Play {
        /// Game server URL (overrides the config file and VERSUS_SERVER_URL)
        #[arg(long)]
        server_url: Option<String>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Play as O instead of X
        #[arg(long)]
        as_o: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
