//! Teardown and one-shot observer tests
//!
//! - Teardown stops every observer and drains the registry
//! - Nothing is published after cancellation
//! - Completions arriving after teardown are discarded
//! - Battery and location publish once, or degrade to a message

use std::sync::Arc;
use std::time::Duration;

use envscope::monitor::observers::{battery, location};
use envscope::monitor::{
    keys, BatteryStatus, ClipboardScript, HostError, MemorySink, Monitor, MonitorConfig,
    MonitorHandle, ObserverId, Outcome, Position, ScriptedHost, ScriptedHostConfig,
};

fn start(config: ScriptedHostConfig) -> (Arc<ScriptedHost>, Arc<MemorySink>, MonitorHandle) {
    let host = Arc::new(ScriptedHost::new(config));
    let sink = Arc::new(MemorySink::new());
    let handle = Monitor::bootstrap(host.clone(), sink.clone(), MonitorConfig::default()).unwrap();
    (host, sink, handle)
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_every_observer() {
    let (_host, _sink, handle) = start(ScriptedHostConfig::default());
    tokio::time::sleep(Duration::from_secs(1)).await;

    let context = handle.context().clone();
    let report = handle.shutdown().await;

    assert!(!report.timed_out);
    for id in [
        ObserverId::Clock,
        ObserverId::Viewport,
        ObserverId::Clipboard,
        ObserverId::Media,
        ObserverId::Meter,
        ObserverId::Battery,
        ObserverId::Location,
    ] {
        assert!(report.stopped.contains(&id), "{:?} not stopped", id);
    }
    assert_eq!(report.released_handles, 0);
    assert_eq!(context.registry().live_count(), 0);
    assert!(context.is_cancelled());
    assert!(report.metrics.publishes > 0);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_published_after_shutdown() {
    let (host, sink, handle) = start(ScriptedHostConfig::default());
    tokio::time::sleep(Duration::from_secs(2)).await;

    let context = handle.context().clone();
    handle.shutdown().await;
    let writes = sink.len();

    host.set_clipboard("after");
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sink.len(), writes);
    assert!(!context.publish(keys::CLOCK, "00:00:00"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_alone_stops_publishing() {
    let (_host, sink, handle) = start(ScriptedHostConfig::default());
    tokio::time::sleep(Duration::from_millis(500)).await;

    handle.cancel();
    let writes = sink.len();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(sink.len(), writes);

    // run_until returns at once on a cancelled monitor.
    handle.run_until(std::future::pending()).await;
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_late_completion_discarded() {
    let (host, sink, handle) = start(ScriptedHostConfig {
        clipboard: ClipboardScript {
            hold: true,
            ..Default::default()
        },
        ..Default::default()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(host.held_read_count(), 1);

    let report = handle.shutdown().await;
    assert!(!report.timed_out);

    assert_eq!(host.resolve_held_reads(Ok("late".into())), 0);
    assert!(!sink.texts(keys::CLIPBOARD).contains(&"late".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_cancels() {
    let (_host, sink, handle) = start(ScriptedHostConfig::default());
    let context = handle.context().clone();
    tokio::time::sleep(Duration::from_millis(100)).await;

    drop(handle);
    assert!(context.is_cancelled());

    let writes = sink.len();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(sink.len(), writes);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_config_refused() {
    let host = Arc::new(ScriptedHost::new(ScriptedHostConfig::default()));
    let sink = Arc::new(MemorySink::new());
    let config = MonitorConfig {
        fft_size: 300,
        ..Default::default()
    };

    assert!(Monitor::bootstrap(host, sink.clone(), config).is_err());
    assert!(sink.is_empty());
}

// =============================================================================
// Battery and location
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_battery_and_location_publish_once() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        battery: Outcome::Value(BatteryStatus {
            level: 0.42,
            charging: false,
        }),
        location: Outcome::Value(Position {
            latitude: 51.5007,
            longitude: -0.1246,
        }),
        ..Default::default()
    });
    tokio::time::sleep(Duration::from_secs(3)).await;

    // The snapshot clears battery before the observer fills it.
    assert_eq!(sink.texts(keys::BATTERY), vec!["", "42% (Not Charging)"]);
    assert_eq!(
        sink.texts(keys::LOCATION),
        vec!["Latitude: 51.50070, Longitude: -0.12460"]
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_location_refetched_on_request() {
    let (_host, sink, handle) = start(ScriptedHostConfig::default());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.texts(keys::LOCATION).len(), 1);

    assert!(handle.request_location());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.texts(keys::LOCATION).len(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_battery_and_location_degrade() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        battery: Outcome::Unsupported,
        location: Outcome::Denied,
        ..Default::default()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        sink.last_text(keys::BATTERY).as_deref(),
        Some(battery::UNSUPPORTED_MESSAGE)
    );
    assert_eq!(
        sink.last_text(keys::LOCATION).as_deref(),
        Some(location::UNAVAILABLE_MESSAGE)
    );
    assert!(handle.metrics().host_failures >= 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_battery_failure_reports_unavailable() {
    let (_host, sink, handle) = start(ScriptedHostConfig {
        battery: Outcome::Fail("no battery manager".into()),
        location: Outcome::Unsupported,
        ..Default::default()
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        sink.last_text(keys::BATTERY).as_deref(),
        Some(battery::UNAVAILABLE_MESSAGE)
    );
    assert_eq!(
        sink.last_text(keys::LOCATION).as_deref(),
        Some(location::UNSUPPORTED_MESSAGE)
    );

    handle.shutdown().await;
}

#[test]
fn test_host_error_kinds() {
    assert!(HostError::unsupported("Battery API").is_unsupported());
    assert!(!HostError::denied("Camera").is_unsupported());
    assert_eq!(HostError::denied("Camera").to_string(), "Camera access denied");
}
