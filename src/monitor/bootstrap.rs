//! Bootstrap and teardown
//!
//! Bootstrap publishes the snapshot first, so the display is non-empty, then starts
//! every observer as an independent task. The caller keeps the returned
//! [`MonitorHandle`] and parks on it; teardown sets the cancellation signal exactly
//! once, waits for the observers to reach `Stopped`, and drains the registry.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;

use super::config::MonitorConfig;
use super::context::MonitorContext;
use super::errors::MonitorResult;
use super::host::Host;
use super::observers::{battery, clipboard, clock, location, media, viewport};
use super::registry::ObserverId;
use super::sink::Sink;
use super::snapshot::publish_snapshot;
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot};

/// Entry point of the environment monitor
pub struct Monitor;

impl Monitor {
    /// Publish the snapshot and start every observer.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn bootstrap(
        host: Arc<dyn Host>,
        sink: Arc<dyn Sink>,
        config: MonitorConfig,
    ) -> MonitorResult<MonitorHandle> {
        config.validate()?;

        let ctx = MonitorContext::new(host, sink, config);
        let session = ctx.session_id().to_string();
        log_event_with_fields(Event::MonitorBootstrap, &[("session", &session)]);

        let published = publish_snapshot(&ctx).to_string();

        let (clipboard_tx, clipboard_rx) = mpsc::unbounded_channel();
        let (camera_tx, camera_rx) = mpsc::unbounded_channel();
        let (location_tx, location_rx) = mpsc::unbounded_channel();

        let spawned = [
            ctx.spawn_observer(ObserverId::Clock, clock::run(ctx.clone())),
            ctx.spawn_observer(ObserverId::Viewport, viewport::run(ctx.clone())),
            ctx.spawn_observer(
                ObserverId::Clipboard,
                clipboard::run(ctx.clone(), clipboard_rx),
            ),
            ctx.spawn_observer(ObserverId::Media, media::run(ctx.clone(), camera_rx)),
            ctx.spawn_observer(ObserverId::Battery, battery::run(ctx.clone())),
            ctx.spawn_observer(ObserverId::Location, location::run(ctx.clone(), location_rx)),
        ];

        let started = spawned.iter().filter(|ok| **ok).count().to_string();
        log_event_with_fields(
            Event::MonitorReady,
            &[
                ("session", &session),
                ("snapshot_entries", &published),
                ("observers", &started),
            ],
        );

        Ok(MonitorHandle {
            ctx,
            clipboard_tx,
            camera_tx,
            location_tx,
            torn_down: false,
        })
    }
}

/// Outcome of a teardown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    /// Observers that reached `Stopped` inside the grace period
    pub stopped: Vec<ObserverId>,
    /// True if some observer had to be aborted
    pub timed_out: bool,
    /// Registry entries still live at the final drain
    pub released_handles: usize,
    pub metrics: MetricsSnapshot,
}

/// Control surface of a running monitor
///
/// Dropping the handle without calling [`MonitorHandle::shutdown`] still sets the
/// cancellation signal, so observers never outlive it.
pub struct MonitorHandle {
    ctx: Arc<MonitorContext>,
    clipboard_tx: UnboundedSender<()>,
    camera_tx: UnboundedSender<()>,
    location_tx: UnboundedSender<()>,
    torn_down: bool,
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("ctx", &self.ctx)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

impl MonitorHandle {
    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.ctx
    }

    /// Set the cancellation signal without waiting for observers to stop
    pub fn cancel(&self) -> bool {
        self.ctx.cancel()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics().snapshot()
    }

    /// Press the camera start control. Returns false once the media observer stopped.
    pub fn start_camera(&self) -> bool {
        self.camera_tx.send(()).is_ok()
    }

    /// Press the location permission control
    pub fn request_location(&self) -> bool {
        self.location_tx.send(()).is_ok()
    }

    /// Press the clipboard permission control
    pub fn request_clipboard(&self) -> bool {
        self.clipboard_tx.send(()).is_ok()
    }

    /// Park until `until` completes or the monitor is cancelled
    pub async fn run_until<F: Future<Output = ()>>(&self, until: F) {
        tokio::select! {
            _ = until => {}
            _ = self.ctx.cancellation().cancelled() => {}
        }
    }

    /// Tear the monitor down.
    ///
    /// Sets the cancellation signal, waits up to the configured grace period for every
    /// observer to stop, aborts the rest, then releases every registry entry.
    pub async fn shutdown(mut self) -> TeardownReport {
        self.torn_down = true;
        let session = self.ctx.session_id().to_string();
        log_event_with_fields(Event::TeardownBegin, &[("session", &session)]);
        self.ctx.cancel();

        let grace = self.ctx.config().shutdown_grace();
        let mut stopped = Vec::new();
        let drained = tokio::time::timeout(grace, drain(&self.ctx, &mut stopped)).await;

        let timed_out = drained.is_err();
        if timed_out {
            // Tasks the dropped drain held were aborted with it; catch any spawned since.
            let mut rest = self.ctx.take_tasks();
            rest.abort_all();
            while rest.join_next().await.is_some() {}
            let grace_ms = grace.as_millis().to_string();
            log_event_with_fields(
                Event::TeardownTimeout,
                &[("session", &session), ("grace_ms", &grace_ms)],
            );
        }

        let released_handles = self.ctx.registry().release_all();
        let metrics = self.ctx.metrics().snapshot();

        let stopped_count = stopped.len().to_string();
        let released = released_handles.to_string();
        let mut fields: Vec<(&str, String)> = vec![
            ("session", session.clone()),
            ("stopped", stopped_count),
            ("released", released),
        ];
        fields.extend(metrics.to_fields());
        let field_refs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        log_event_with_fields(Event::TeardownComplete, &field_refs);

        TeardownReport {
            stopped,
            timed_out,
            released_handles,
            metrics,
        }
    }
}

/// Join every observer task, including any spawned while earlier ones were stopping
async fn drain(ctx: &MonitorContext, stopped: &mut Vec<ObserverId>) {
    loop {
        let mut tasks: JoinSet<ObserverId> = ctx.take_tasks();
        if tasks.is_empty() {
            return;
        }
        while let Some(joined) = tasks.join_next().await {
            if let Ok(id) = joined {
                stopped.push(id);
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if !self.torn_down {
            self.ctx.cancel();
        }
    }
}
