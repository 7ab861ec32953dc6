//! envscope CLI entry point
//!
//! Parsing, configuration and runtime setup all live in the CLI module; this file
//! only reports the error and sets the exit status.

use envscope::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
