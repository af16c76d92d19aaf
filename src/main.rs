// ABOUTME: Entry point for the hoist CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use hoist::config::{self, AgentConfig, CONFIG_FILENAME};
use hoist::error::Result;
use hoist::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output_mode());

    match cli.command {
        Commands::Init { node_name, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, node_name.as_deref(), force)?;
            output.success(&format!("Created {CONFIG_FILENAME}"));
            Ok(())
        }
        Commands::Deploy {
            ref request,
            continue_on_error,
        } => {
            let config = load_config(&cli)?;
            commands::deploy(config, request, continue_on_error, output).await
        }
        Commands::Describe { ref request } => {
            let config = load_config(&cli)?;
            commands::describe(&config, request, &output)
        }
    }
}

/// Load the agent config named by `--config`, or discover one in the working directory.
fn load_config(cli: &Cli) -> Result<AgentConfig> {
    match cli.config {
        Some(ref path) => AgentConfig::load(path),
        None => AgentConfig::discover(&env::current_dir()?),
    }
}
