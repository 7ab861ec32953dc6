//! Observability for envscope
//!
//! - Structured logging (JSON lines)
//! - Monitor counters
//! - Typed lifecycle events
//!
//! Observability is read-only: a failed log write or a counter never changes what an
//! observer publishes.
//!
//! ```ignore
//! use envscope::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ObserverStarted, &[("observer", "clock")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, MonitorMetrics};

/// Log a lifecycle event with fields
///
/// Severity follows the event: fatal events at FATAL, contained failures at WARN,
/// state-transition detail at TRACE, everything else at INFO.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else if event.is_trace() {
        Severity::Trace
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
