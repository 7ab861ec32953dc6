//! Configuration file
//!
//! One JSON document with three sections, every field defaulted:
//!
//! ```json
//! {
//!   "server":  { "host": "0.0.0.0", "port": 8080, "root": "/app" },
//!   "monitor": { "clock_interval_ms": 1000, "fft_size": 256 },
//!   "host":    { "clipboard": { "contents": "hello" } }
//! }
//! ```
//!
//! A missing file is not an error; defaults apply.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::monitor::{MonitorConfig, ScriptedHostConfig};
use crate::observability::{log_event_with_fields, Event};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Scripted host scenario for the `monitor` command
    #[serde(default)]
    pub host: ScriptedHostConfig,
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, source) = match fs::read_to_string(path) {
            Ok(content) => (Self::from_json(&content)?, "file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Self::default(), "defaults"),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.validate()?;

        let display = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &display), ("source", source)],
        );
        Ok(config)
    }

    /// Parse configuration JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate().map_err(ConfigError::Invalid)?;
        self.monitor
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
