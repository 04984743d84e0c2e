//! Versus - terminal client
//!
//! Plays tic-tac-toe against an AI opponent hosted by a Socket.IO game server.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use tracing::instrument;
use versus_sync::{Mark, SyncConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            server_url,
            config,
            as_o,
        } => run_play(server_url, config, as_o).await,
        Command::Config { config } => print_config(config),
    }
}

/// Run the terminal client
#[instrument(skip_all)]
async fn run_play(server_url: Option<String>, config: Option<PathBuf>, as_o: bool) -> Result<()> {
    let mut config = SyncConfig::load(config.as_deref())?;
    if let Some(url) = server_url {
        config = config.with_server_url(url);
    }
    if as_o {
        let wire = config.wire().with_human_mark(Mark::O);
        config = config.with_wire(wire);
    }
    versus_sync::run_tui(config).await
}

/// Print the effective configuration
fn print_config(config: Option<PathBuf>) -> Result<()> {
    let config = SyncConfig::load(config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}
