//! Monitor context
//!
//! The single shared value every observer receives at start. It carries the
//! cancellation signal, the handle registry and completion bridge, the host and the
//! sink. Nothing here is a process-wide global; two monitors in one process are fully
//! independent.

use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

use tokio::task::JoinSet;
use uuid::Uuid;

use super::bridge::CompletionBridge;
use super::cancellation::CancellationSignal;
use super::config::MonitorConfig;
use super::errors::MonitorError;
use super::host::Host;
use super::registry::{HandleRegistry, ObserverId};
use super::sink::Sink;
use crate::observability::{log_event_with_fields, Event, MonitorMetrics};

/// Shared state of one running monitor
pub struct MonitorContext {
    session_id: Uuid,
    config: MonitorConfig,
    cancel: CancellationSignal,
    registry: Arc<HandleRegistry>,
    bridge: CompletionBridge,
    metrics: Arc<MonitorMetrics>,
    host: Arc<dyn Host>,
    sink: Arc<dyn Sink>,
    // Writes hold it shared; cancel() takes it exclusively.
    gate: RwLock<()>,
    tasks: Mutex<JoinSet<ObserverId>>,
}

impl std::fmt::Debug for MonitorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorContext")
            .field("session_id", &self.session_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("registry", &self.registry)
            .finish()
    }
}

impl MonitorContext {
    /// Build a fresh context with the signal unset and an empty registry
    pub fn new(host: Arc<dyn Host>, sink: Arc<dyn Sink>, config: MonitorConfig) -> Arc<Self> {
        let metrics = Arc::new(MonitorMetrics::new());
        let registry = Arc::new(HandleRegistry::new(metrics.clone()));
        let cancel = CancellationSignal::new();
        let bridge = CompletionBridge::new(registry.clone(), cancel.clone(), metrics.clone());

        Arc::new(Self {
            session_id: Uuid::new_v4(),
            config,
            cancel,
            registry,
            bridge,
            metrics,
            host,
            sink,
            gate: RwLock::new(()),
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Set the cancellation signal.
    ///
    /// Waits for writes already past their cancellation check, so once this returns
    /// the sink sees nothing further from this monitor, on any runtime flavor.
    pub fn cancel(&self) -> bool {
        let _gate = self.gate.write();
        self.cancel.cancel()
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn bridge(&self) -> &CompletionBridge {
        &self.bridge
    }

    pub fn metrics(&self) -> &Arc<MonitorMetrics> {
        &self.metrics
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// Write text to `key`.
    ///
    /// Returns false when nothing was written: the monitor is cancelled or the key has
    /// no target. A missing target is logged and never propagated.
    pub fn publish(&self, key: &str, value: &str) -> bool {
        self.write(key, |sink| sink.set_text(key, value))
    }

    /// Write a 0-100 level to `key`
    pub fn publish_level(&self, key: &str, percent: u8) -> bool {
        self.write(key, |sink| sink.set_level(key, percent.min(100)))
    }

    /// Show or hide the control at `key`
    pub fn set_visible(&self, key: &str, visible: bool) -> bool {
        self.write(key, |sink| sink.set_visible(key, visible))
    }

    /// Enable or disable the control at `key`
    pub fn set_enabled(&self, key: &str, enabled: bool) -> bool {
        self.write(key, |sink| sink.set_enabled(key, enabled))
    }

    fn write<F>(&self, key: &str, op: F) -> bool
    where
        F: FnOnce(&dyn Sink) -> Result<(), MonitorError>,
    {
        let Ok(_gate) = self.gate.read() else {
            return false;
        };
        if self.cancel.is_cancelled() {
            return false;
        }

        match op(self.sink.as_ref()) {
            Ok(()) => {
                self.metrics.increment_publishes();
                true
            }
            Err(MonitorError::Sink { key }) => {
                self.metrics.increment_sink_misses();
                log_event_with_fields(Event::SinkTargetMissing, &[("key", &key)]);
                false
            }
            Err(e) => {
                let error = e.to_string();
                log_event_with_fields(Event::SinkWriteFailed, &[("key", key), ("error", &error)]);
                false
            }
        }
    }

    /// Start `observer` as an independent task.
    ///
    /// Refused once the monitor is cancelled.
    pub fn spawn_observer<F>(&self, id: ObserverId, observer: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return false;
        }
        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.spawn(async move {
                    observer.await;
                    id
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Hand over every observer task spawned so far
    pub(crate) fn take_tasks(&self) -> JoinSet<ObserverId> {
        self.tasks
            .lock()
            .map(|mut tasks| std::mem::take(&mut *tasks))
            .unwrap_or_default()
    }
}
