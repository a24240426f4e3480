//! Chatwire CLI - talk to an OpenAI-style chat completions endpoint.

mod commands;
mod conversation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use chatwire_core::Config;
use commands::{Commands, handle_command};

/// Chatwire CLI - build, send and decode chat completion requests
#[derive(Parser)]
#[command(name = "chatwire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default search path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    handle_command(args.command, config).await
}
