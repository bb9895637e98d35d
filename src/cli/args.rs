//! CLI argument definitions using clap
//!
//! Commands:
//! - docstore exec [--config <path>] [--seed <path>]
//! - docstore check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docstore - an in-memory document collection engine
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute line-delimited JSON requests from stdin
    Exec {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON file mapping collection names to arrays of documents
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Validate a configuration file and print the effective settings
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./docstore.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
