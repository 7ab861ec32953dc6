//! Continuous environment monitor
//!
//! A set of long-lived observers sampling host signals and publishing changes into a
//! [`Sink`]. Building blocks, leaves first:
//!
//! - [`CompletionBridge`]: one host asynchronous operation becomes one awaitable result
//! - [`CancellationSignal`]: write-once stop flag observed by every loop
//! - [`HandleRegistry`]: ownership table of callbacks the host still holds
//! - observers: clock and viewport (fixed interval), clipboard, battery and location
//!   (asynchronous completion), media and meter (frame-driven streaming)
//! - [`Monitor::bootstrap`] / [`MonitorHandle::shutdown`]
//!
//! ```ignore
//! let handle = Monitor::bootstrap(host, sink, MonitorConfig::default())?;
//! handle.run_until(tokio::signal::ctrl_c().map(|_| ())).await;
//! let report = handle.shutdown().await;
//! ```

mod bootstrap;
mod bridge;
mod cancellation;
mod config;
mod context;
mod errors;
mod host;
pub mod observers;
mod registry;
mod scripted;
pub mod sink;
mod snapshot;

pub use bootstrap::{Monitor, MonitorHandle, TeardownReport};
pub use bridge::{Completion, CompletionBridge, FrameTimestamp, Pending};
pub use cancellation::CancellationSignal;
pub use config::{MonitorConfig, MAX_FFT_SIZE, MIN_FFT_SIZE};
pub use context::MonitorContext;
pub use errors::{HostError, MonitorError, MonitorResult};
pub use host::{
    AudioAnalyser, BatteryStatus, Capability, ConnectionInfo, EnvironmentAttributes, GpuInfo,
    Host, MediaStream, Position, Viewport,
};
pub use registry::{CallbackHandle, HandleId, HandleRegistry, ObserverId};
pub use scripted::{
    ClipboardScript, MediaPermission, MediaScript, Outcome, ScriptedHost, ScriptedHostConfig,
    ViewportStep,
};
pub use sink::{keys, ConsoleSink, MemorySink, Sink, SinkWrite};
pub use snapshot::{entries as snapshot_entries, publish_snapshot, CLIPBOARD_PLACEHOLDER};
