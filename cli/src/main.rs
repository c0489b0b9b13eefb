//! # devmate CLI
//!
//! Command-line interface for devmate - a tool-using assistant.
//!
//! ## Usage
//!
//! - `devmate` - Start the interactive session
//! - `devmate "task description"` - Execute a single task
//! - `devmate ingest` - Build the knowledge index from docs/
//! - `devmate tools` - Show available tools

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{ingest_command, repl_command, run_command, tools_command};
use config::CliConfigLoader;

/// devmate - a tool-using assistant
#[derive(Parser)]
#[command(name = "devmate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A tool-using assistant that retrieves docs, searches the web and writes files")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key override
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// Maximum model iterations per turn
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Output trajectory file
    #[arg(long)]
    trajectory_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// The task to execute (if provided, runs in single-task mode)
    task: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the knowledge index from the docs directory
    Ingest,

    /// Show available tools
    Tools,
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }
    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }
    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }
    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }
    if let Some(max_iterations) = cli.max_iterations {
        loader = loader.with_max_iterations_override(max_iterations);
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = build_config_loader(&cli).load().await?;

    match (cli.task, cli.command) {
        // If a task is provided, run in single-task mode
        (Some(task), None) => run_command(task, config, cli.trajectory_file).await,
        (Some(_), Some(_)) => {
            tracing::error!("Cannot specify both a task and a subcommand");
            std::process::exit(1);
        }
        (None, Some(Commands::Ingest)) => ingest_command(config).await,
        (None, Some(Commands::Tools)) => tools_command(config).await,
        // Default to the interactive session
        (None, None) => repl_command(config, cli.trajectory_file).await,
    }
}
