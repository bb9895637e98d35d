//! CLI module
//!
//! - exec: run line-delimited JSON requests against an in-memory store
//! - check: validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, exec, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
