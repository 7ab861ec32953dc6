//! Monitor counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics: observers never wait on metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Operational counters shared by every observer
#[derive(Debug, Default)]
pub struct MonitorMetrics {
    /// Sink writes accepted
    publishes: AtomicU64,
    /// Ticks whose value matched the last published one
    suppressed: AtomicU64,
    /// Sink writes that named a missing target
    sink_misses: AtomicU64,
    /// Host operations that completed with a failure
    host_failures: AtomicU64,
    /// Completions delivered to their awaiting observer
    completions_resolved: AtomicU64,
    /// Completions dropped because cancellation was already observed
    completions_discarded: AtomicU64,
    /// Frame callbacks processed by the meter
    frames: AtomicU64,
    /// Callback handles registered
    handles_registered: AtomicU64,
    /// Callback handles released (fired, dropped or revoked)
    handles_released: AtomicU64,
}

impl MonitorMetrics {
    /// Create a registry with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_publishes(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sink_misses(&self) {
        self.sink_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_host_failures(&self) {
        self.host_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completions_resolved(&self) {
        self.completions_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_completions_discarded(&self) {
        self.completions_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_handles_registered(&self) {
        self.handles_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_handles_released(&self, count: u64) {
        self.handles_released.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all counters as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            publishes: self.publishes.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            sink_misses: self.sink_misses.load(Ordering::Relaxed),
            host_failures: self.host_failures.load(Ordering::Relaxed),
            completions_resolved: self.completions_resolved.load(Ordering::Relaxed),
            completions_discarded: self.completions_discarded.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            handles_registered: self.handles_registered.load(Ordering::Relaxed),
            handles_released: self.handles_released.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub publishes: u64,
    pub suppressed: u64,
    pub sink_misses: u64,
    pub host_failures: u64,
    pub completions_resolved: u64,
    pub completions_discarded: u64,
    pub frames: u64,
    pub handles_registered: u64,
    pub handles_released: u64,
}

impl MetricsSnapshot {
    /// Render as log fields (for `TEARDOWN_COMPLETE`)
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("publishes", self.publishes.to_string()),
            ("suppressed", self.suppressed.to_string()),
            ("sink_misses", self.sink_misses.to_string()),
            ("host_failures", self.host_failures.to_string()),
            ("completions_resolved", self.completions_resolved.to_string()),
            ("completions_discarded", self.completions_discarded.to_string()),
            ("frames", self.frames.to_string()),
            ("handles_registered", self.handles_registered.to_string()),
            ("handles_released", self.handles_released.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(MonitorMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = MonitorMetrics::new();
        metrics.increment_publishes();
        metrics.increment_publishes();
        metrics.increment_suppressed();
        metrics.increment_handles_registered();
        metrics.add_handles_released(3);

        let snap = metrics.snapshot();
        assert_eq!(snap.publishes, 2);
        assert_eq!(snap.suppressed, 1);
        assert_eq!(snap.handles_registered, 1);
        assert_eq!(snap.handles_released, 3);
    }

    #[test]
    fn test_fields_cover_every_counter() {
        let fields = MetricsSnapshot::default().to_fields();
        assert_eq!(fields.len(), 9);
        assert!(fields.iter().all(|(_, v)| v == "0"));
    }
}
