//! Cancellation Signal
//!
//! A single shared flag, created false at bootstrap and flipped true exactly once at
//! teardown. Observers read it at every iteration boundary and inside completion
//! continuations. Waiters parked in `cancelled()` are woken when it flips so a loop
//! blocked on a long sleep or a frame that never comes still reaches `Stopped`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct SignalInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Write-once cancellation flag shared by every observer
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<SignalInner>,
}

impl CancellationSignal {
    /// Create a signal in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the signal to true.
    ///
    /// Returns `true` only for the call that performed the transition; later calls
    /// are no-ops. Outside the crate the signal is set through
    /// `MonitorContext::cancel`, which also fences in-flight sink writes.
    pub(crate) fn cancel(&self) -> bool {
        let first = self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Read the flag
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once the signal is (or already was) set
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before re-checking so a concurrent cancel() cannot slip between.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_false() {
        assert!(!CancellationSignal::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_write_once() {
        let signal = CancellationSignal::new();
        assert!(signal.cancel());
        assert!(!signal.cancel());
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancellationSignal::new();
        let observer_view = signal.clone();
        signal.cancel();
        assert!(observer_view.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_set() {
        let signal = CancellationSignal::new();
        signal.cancel();
        tokio::time::timeout(Duration::from_millis(50), signal.cancelled())
            .await
            .expect("already-cancelled signal must resolve");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_parked_waiter() {
        let signal = CancellationSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };
        tokio::task::yield_now().await;
        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .unwrap();
    }
}
