//! # Completion Bridge
//!
//! Turns one host asynchronous operation into one awaitable result.
//!
//! For each request the bridge registers exactly one success and one failure
//! continuation with the [`HandleRegistry`]. The host fires at most one of them, at
//! most once. Whichever fires first resolves the [`Completion`] and releases both
//! registry entries, so neither continuation is ever a candidate for reuse.
//!
//! Both continuations consult the cancellation signal: a read that was already in
//! flight at teardown completes at the host, and its result is discarded here.
//!
//! The bridge imposes no timeout. A host that never completes leaves the completion
//! pending; callers race it against cancellation.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::cancellation::CancellationSignal;
use super::errors::{HostError, MonitorError, MonitorResult};
use super::registry::{CallbackHandle, HandleId, HandleRegistry, ObserverId};
use crate::observability::MonitorMetrics;

/// Timestamp handed to frame callbacks, in milliseconds since the host started
pub type FrameTimestamp = f64;

/// The pair of continuations handed to the host for one request
#[derive(Debug)]
pub struct Pending<T> {
    on_success: CallbackHandle<T>,
    on_failure: CallbackHandle<HostError>,
}

impl<T> Pending<T> {
    /// Fire the success continuation; the failure branch is released unused
    pub fn succeed(self, value: T) -> bool {
        self.on_success.invoke(value)
    }

    /// Fire the failure continuation; the success branch is released unused
    pub fn fail(self, error: HostError) -> bool {
        self.on_failure.invoke(error)
    }

    /// Fire whichever continuation matches `result`
    pub fn resolve(self, result: Result<T, HostError>) -> bool {
        match result {
            Ok(value) => self.succeed(value),
            Err(error) => self.fail(error),
        }
    }

    /// Owning observer
    pub fn owner(&self) -> ObserverId {
        self.on_success.owner()
    }
}

/// The observer's side of a bridged request
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, HostError>>,
}

impl<T> Completion<T> {
    /// Wait for the single resolution.
    ///
    /// `MonitorError::Released` means every continuation was dropped or revoked
    /// without firing, or the result was discarded because of cancellation.
    pub async fn wait(self) -> MonitorResult<T> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(MonitorError::Host(error)),
            Err(_) => Err(MonitorError::Released),
        }
    }
}

struct Resolution<T> {
    tx: Option<oneshot::Sender<Result<T, HostError>>>,
    handles: Vec<HandleId>,
}

/// Shared state both continuations of one request point at
struct Settle<T> {
    owner: ObserverId,
    state: Mutex<Resolution<T>>,
    registry: Arc<HandleRegistry>,
    cancel: CancellationSignal,
    metrics: Arc<MonitorMetrics>,
}

impl<T> Settle<T> {
    fn settle(&self, result: Result<T, HostError>) {
        let (tx, handles) = match self.state.lock() {
            Ok(mut state) => (state.tx.take(), std::mem::take(&mut state.handles)),
            Err(_) => return,
        };

        // The sibling continuation can no longer fire; drop its entry now.
        for id in handles {
            self.registry.release(self.owner, id);
        }

        let Some(tx) = tx else {
            return;
        };

        if self.cancel.is_cancelled() {
            self.metrics.increment_completions_discarded();
            return;
        }

        if result.is_err() {
            self.metrics.increment_host_failures();
        }
        if tx.send(result).is_ok() {
            self.metrics.increment_completions_resolved();
        }
    }
}

/// Factory for bridged requests
#[derive(Debug, Clone)]
pub struct CompletionBridge {
    registry: Arc<HandleRegistry>,
    cancel: CancellationSignal,
    metrics: Arc<MonitorMetrics>,
}

impl CompletionBridge {
    /// Create a bridge registering into `registry`
    pub fn new(
        registry: Arc<HandleRegistry>,
        cancel: CancellationSignal,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            registry,
            cancel,
            metrics,
        }
    }

    /// Register a success/failure pair owned by `owner`
    pub fn pending<T: Send + 'static>(&self, owner: ObserverId) -> (Pending<T>, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        let settle = Arc::new(Settle {
            owner,
            state: Mutex::new(Resolution {
                tx: Some(tx),
                handles: Vec::with_capacity(2),
            }),
            registry: self.registry.clone(),
            cancel: self.cancel.clone(),
            metrics: self.metrics.clone(),
        });

        let on_success = {
            let settle = settle.clone();
            self.registry
                .register(owner, move |value: T| settle.settle(Ok(value)))
        };
        let on_failure = {
            let settle = settle.clone();
            self.registry
                .register(owner, move |error: HostError| settle.settle(Err(error)))
        };

        if let Ok(mut state) = settle.state.lock() {
            state.handles.push(on_success.id());
            state.handles.push(on_failure.id());
        }

        (
            Pending {
                on_success,
                on_failure,
            },
            Completion { rx },
        )
    }

    /// Register a single frame continuation owned by `owner`
    pub fn frame(
        &self,
        owner: ObserverId,
    ) -> (CallbackHandle<FrameTimestamp>, Completion<FrameTimestamp>) {
        let (tx, rx) = oneshot::channel();
        let settle = Arc::new(Settle {
            owner,
            state: Mutex::new(Resolution {
                tx: Some(tx),
                handles: Vec::new(),
            }),
            registry: self.registry.clone(),
            cancel: self.cancel.clone(),
            metrics: self.metrics.clone(),
        });

        let handle = self
            .registry
            .register(owner, move |ts: FrameTimestamp| settle.settle(Ok(ts)));

        (handle, Completion { rx })
    }
}
