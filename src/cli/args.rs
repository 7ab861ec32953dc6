//! CLI argument definitions using clap
//!
//! Commands:
//! - envscope serve --config <path> [--port <port>] [--root <dir>]
//! - envscope monitor --config <path> [--duration-secs <n>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// envscope - live host-environment diagnostics
#[derive(Parser, Debug)]
#[command(name = "envscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the diagnostic page and its assets
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./envscope.json")]
        config: PathBuf,

        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,

        /// Asset directory (overrides server.root)
        #[arg(long)]
        root: Option<String>,
    },

    /// Run the environment monitor against the scripted host
    Monitor {
        /// Path to configuration file
        #[arg(long, default_value = "./envscope.json")]
        config: PathBuf,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
