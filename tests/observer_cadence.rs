//! Fixed-interval observer tests
//!
//! Clock and viewport sampling under virtual time:
//! - the clock publishes once per interval, formatted HH:MM:SS
//! - the viewport publishes only when the size changes
//!
//! One test runs on the real clock to check the tick grid does not drift.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveTime;
use envscope::monitor::{
    keys, MemorySink, Monitor, MonitorConfig, MonitorHandle, MonitorResult, ScriptedHost,
    ScriptedHostConfig, Sink, Viewport, ViewportStep,
};

fn start(config: ScriptedHostConfig) -> (Arc<ScriptedHost>, Arc<MemorySink>, MonitorHandle) {
    let host = Arc::new(ScriptedHost::new(config));
    let sink = Arc::new(MemorySink::new());
    let handle = Monitor::bootstrap(host.clone(), sink.clone(), MonitorConfig::default()).unwrap();
    (host, sink, handle)
}

fn step(at_ms: u64, width: u32, height: u32) -> ViewportStep {
    ViewportStep {
        at_ms,
        width,
        height,
    }
}

// =============================================================================
// Clock
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_clock_publishes_once_per_second() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        clock_start: NaiveTime::from_hms_opt(9, 59, 58),
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(
        sink.texts(keys::CLOCK),
        vec!["09:59:58", "09:59:59", "10:00:00", "10:00:01"]
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_clock_wraps_at_midnight() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        clock_start: NaiveTime::from_hms_opt(23, 59, 59),
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(sink.texts(keys::CLOCK), vec!["23:59:59", "00:00:00"]);
    handle.shutdown().await;
}

// =============================================================================
// Viewport
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_viewport_publishes_only_on_change() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        viewport: vec![step(0, 800, 600), step(1000, 800, 600), step(1600, 1024, 768)],
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(3000)).await;

    // Snapshot clears the target first.
    assert_eq!(sink.texts(keys::WINDOW_SIZE), vec!["", "800x600", "1024x768"]);
    assert!(handle.metrics().suppressed > 0);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_viewport_unknown_when_size_missing() {
    let (host, sink, handle) = start(ScriptedHostConfig::default());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.last_text(keys::WINDOW_SIZE).as_deref(), Some("1280x720"));

    host.set_viewport(None);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(sink.last_text(keys::WINDOW_SIZE).as_deref(), Some("Unknown"));

    host.set_viewport(Some(Viewport {
        width: 0,
        height: 900,
    }));
    tokio::time::sleep(Duration::from_millis(600)).await;
    // Zero dimension also reads as Unknown; no duplicate publish.
    assert_eq!(
        sink.texts(keys::WINDOW_SIZE),
        vec!["", "1280x720", "Unknown"]
    );

    handle.shutdown().await;
}

// =============================================================================
// Real-time cadence
// =============================================================================

/// Records when each clock write arrived
#[derive(Default)]
struct TimingSink {
    clock_writes: Mutex<Vec<Instant>>,
}

impl TimingSink {
    fn clock_writes(&self) -> Vec<Instant> {
        self.clock_writes.lock().unwrap().clone()
    }
}

impl Sink for TimingSink {
    fn set_text(&self, key: &str, _value: &str) -> MonitorResult<()> {
        if key == keys::CLOCK {
            self.clock_writes.lock().unwrap().push(Instant::now());
        }
        Ok(())
    }

    fn set_visible(&self, _key: &str, _visible: bool) -> MonitorResult<()> {
        Ok(())
    }

    fn set_enabled(&self, _key: &str, _enabled: bool) -> MonitorResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_clock_cadence_does_not_drift() {
    const PERIOD: Duration = Duration::from_millis(10);
    const TICKS: usize = 100;

    let host = Arc::new(ScriptedHost::new(ScriptedHostConfig::default()));
    let sink = Arc::new(TimingSink::default());
    let config = MonitorConfig {
        clock_interval_ms: PERIOD.as_millis() as u64,
        ..Default::default()
    };
    let handle = Monitor::bootstrap(host, sink.clone(), config).unwrap();

    tokio::time::timeout(Duration::from_secs(10), async {
        while sink.clock_writes().len() < TICKS {
            tokio::time::sleep(PERIOD).await;
        }
    })
    .await
    .expect("clock kept publishing");
    handle.shutdown().await;

    let writes = sink.clock_writes();
    let first = writes[0];
    let last = writes[TICKS - 1];
    let expected = PERIOD * (TICKS as u32 - 1);
    let elapsed = last - first;

    // Tick n lands n periods after the first, however long each publish took.
    let lag = elapsed.saturating_sub(expected);
    assert!(
        lag < Duration::from_millis(30),
        "{} ticks took {:?}, expected about {:?}",
        TICKS,
        elapsed,
        expected
    );
    assert!(elapsed + Duration::from_millis(5) >= expected);
}
