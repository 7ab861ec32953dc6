//! CLI command implementations

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::http_server::HttpServer;
use crate::monitor::{ConsoleSink, Monitor, ScriptedHost};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port, root } => serve(&config, port, root),
        Command::Monitor {
            config,
            duration_secs,
        } => monitor(&config, duration_secs),
    }
}

/// Apply command-line overrides on top of the file configuration
pub fn apply_server_overrides(config: &mut AppConfig, port: Option<u16>, root: Option<String>) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(root) = root {
        config.server.root = root;
    }
}

/// Serve the asset directory until the process is killed
pub fn serve(config_path: &Path, port: Option<u16>, root: Option<String>) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    apply_server_overrides(&mut config, port, root);
    config.validate()?;

    let server = HttpServer::with_config(config.server);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(server.start())?;
    Ok(())
}

/// Run the monitor against the scripted host until Ctrl-C or the duration elapses
pub fn monitor(config_path: &Path, duration_secs: Option<u64>) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;

    // One logical thread, like the page the monitor was built for.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async move {
        let host = Arc::new(ScriptedHost::new(config.host));
        let sink = Arc::new(ConsoleSink::new());
        let handle = Monitor::bootstrap(host, sink, config.monitor)?;

        let stop = async move {
            let ctrl_c = async {
                // A failed handler install leaves only the duration as a stop condition.
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            match duration_secs {
                Some(secs) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                        _ = ctrl_c => {}
                    }
                }
                None => ctrl_c.await,
            }
        };
        handle.run_until(stop).await;

        let report = handle.shutdown().await;
        if report.timed_out {
            return Err(CliError::runtime_failed(
                "Observers did not stop within the shutdown grace period",
            ));
        }
        Ok(())
    })
}
