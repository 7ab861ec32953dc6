//! envscope - live host-environment diagnostics
//!
//! A continuous environment monitor (clock, viewport, clipboard, camera and
//! microphone, battery, location) that publishes into named display targets, plus
//! the static asset server that ships the page.

pub mod cli;
pub mod config;
pub mod http_server;
pub mod monitor;
pub mod observability;

pub use config::{AppConfig, ConfigError};
pub use monitor::{Monitor, MonitorConfig, MonitorError, MonitorHandle, MonitorResult};
