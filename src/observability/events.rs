//! Observable lifecycle events
//!
//! Events are explicit and typed; the logger only ever sees their string form.

use std::fmt;

/// Observable events in envscope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded (or defaults applied)
    ConfigLoaded,

    // Monitor lifecycle
    /// Bootstrap begins (snapshot publishing)
    MonitorBootstrap,
    /// Every observer has been started
    MonitorReady,
    /// An observer task started
    ObserverStarted,
    /// An observer task reached `Stopped`
    ObserverStopped,
    /// An observer switched its display to a degraded message
    ObserverDegraded,
    /// Teardown requested: cancellation signal set
    TeardownBegin,
    /// Teardown finished, registry drained
    TeardownComplete,
    /// Some observer did not stop inside the grace period
    TeardownTimeout,
    /// Media observer moved between capture states
    MediaState,

    // Sink
    /// A sink write named a key with no display target
    SinkTargetMissing,
    /// A sink write failed for a reason other than a missing target
    SinkWriteFailed,
    /// A sink write (console sink only)
    SinkUpdate,

    // Static asset server
    /// Listener bound
    ServerListening,
    /// Listener failed to bind
    ServerBindFailed,
    /// One request served
    AssetServed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::MonitorBootstrap => "MONITOR_BOOTSTRAP",
            Event::MonitorReady => "MONITOR_READY",
            Event::ObserverStarted => "OBSERVER_STARTED",
            Event::ObserverStopped => "OBSERVER_STOPPED",
            Event::ObserverDegraded => "OBSERVER_DEGRADED",
            Event::TeardownBegin => "TEARDOWN_BEGIN",
            Event::TeardownComplete => "TEARDOWN_COMPLETE",
            Event::TeardownTimeout => "TEARDOWN_TIMEOUT",
            Event::MediaState => "MEDIA_STATE",

            Event::SinkTargetMissing => "SINK_TARGET_MISSING",
            Event::SinkWriteFailed => "SINK_WRITE_FAILED",
            Event::SinkUpdate => "SINK_UPDATE",

            Event::ServerListening => "SERVER_LISTENING",
            Event::ServerBindFailed => "SERVER_BIND_FAILED",
            Event::AssetServed => "ASSET_SERVED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ServerBindFailed)
    }

    /// Returns true if this event is a contained, non-fatal failure
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::ObserverDegraded
                | Event::SinkTargetMissing
                | Event::SinkWriteFailed
                | Event::TeardownTimeout
        )
    }

    /// Returns true for per-transition detail logged below INFO
    pub fn is_trace(&self) -> bool {
        matches!(self, Event::MediaState)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_upper_snake() {
        for event in [
            Event::ConfigLoaded,
            Event::MonitorBootstrap,
            Event::ObserverStopped,
            Event::TeardownComplete,
            Event::AssetServed,
        ] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_only_bind_failure_is_fatal() {
        assert!(Event::ServerBindFailed.is_fatal());
        assert!(!Event::ObserverDegraded.is_fatal());
        assert!(!Event::TeardownTimeout.is_fatal());
    }

    #[test]
    fn test_warning_classification() {
        assert!(Event::SinkTargetMissing.is_warning());
        assert!(Event::SinkWriteFailed.is_warning());
        assert!(!Event::MonitorReady.is_warning());
    }

    #[test]
    fn test_media_state_is_trace() {
        assert!(Event::MediaState.is_trace());
        assert_eq!(Event::MediaState.as_str(), "MEDIA_STATE");
        assert!(!Event::ObserverStarted.is_trace());
    }
}
