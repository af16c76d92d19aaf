// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use hoist::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hoist")]
#[command(about = "Phased container image deployment agent for Docker-compatible engines")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Agent config file (default: discover hoist.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a hoist.yml agent configuration template
    Init {
        /// Node name to write instead of the placeholder
        #[arg(long)]
        node_name: Option<String>,

        /// Overwrite an existing hoist.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy the image described by a request file
    Deploy {
        /// Deployment request (YAML or JSON)
        request: PathBuf,

        /// Run every phase even after one fails
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Print what a deployment request would do, without contacting the engine
    Describe {
        /// Deployment request (YAML or JSON)
        request: PathBuf,
    },
}
