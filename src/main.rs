mod backend;
mod cli;
mod command;
mod commands;
mod config;
mod context;
mod conversation;
mod error;
mod fs_tools;
mod session;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::backend::OpenAiBackend;
use crate::cli::{Cli, Commands};
use crate::commands::handle_config;
use crate::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so the interactive prompt stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Config { command }) => handle_config(command)?,
        None => {
            let config_path = config::config_path()?;
            let cfg = config::load_or_default(&config_path);
            let backend = OpenAiBackend::new().context("Failed to build HTTP client")?;
            let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
            let mut session = Session::new(cwd, cfg, config_path, Box::new(backend));
            session.run().await?;
        }
    }

    Ok(())
}
