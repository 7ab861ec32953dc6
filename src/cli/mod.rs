//! CLI module for envscope
//!
//! Provides command-line interface for:
//! - serve: static asset server for the diagnostic page
//! - monitor: environment monitor against the scripted host, logging every update

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{apply_server_overrides, monitor, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
