//! Observers
//!
//! Each observer is one long-lived task owning its own state. All of them follow the
//! same suspension contract: every timer tick, completion wait and frame re-arm is
//! raced against the cancellation signal, and the loop re-checks the signal before it
//! touches the host or the sink again.
//!
//! Periodic observers run on a fixed tick grid anchored at start, so the time spent
//! publishing never accumulates into the period.

pub mod battery;
pub mod clipboard;
pub mod clock;
pub mod location;
pub mod media;
pub mod meter;
pub mod viewport;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use super::bridge::Completion;
use super::context::MonitorContext;
use super::errors::MonitorResult;
use super::registry::ObserverId;
use crate::observability::{log_event_with_fields, Event};

/// Timer firing every `period`, first tick immediately. A late tick is skipped
/// rather than bunched, keeping the original grid.
pub(crate) fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Wait for the next tick. Returns false if cancellation arrived first.
pub(crate) async fn tick_or_cancel(ctx: &MonitorContext, ticker: &mut Interval) -> bool {
    tokio::select! {
        _ = ctx.cancellation().cancelled() => false,
        _ = ticker.tick() => !ctx.is_cancelled(),
    }
}

/// Wait for a bridged completion. `None` if cancellation arrived first.
pub(crate) async fn await_or_cancel<T>(
    ctx: &MonitorContext,
    completion: Completion<T>,
) -> Option<MonitorResult<T>> {
    tokio::select! {
        _ = ctx.cancellation().cancelled() => None,
        result = completion.wait() => {
            if ctx.is_cancelled() {
                None
            } else {
                Some(result)
            }
        }
    }
}

/// Running-to-stopped lifetime of one observer
///
/// Logs `OBSERVER_STARTED` on creation. On drop the observer has reached `Stopped`:
/// its registry entry is removed, revoking any callback the host still holds, and
/// `OBSERVER_STOPPED` is logged.
pub(crate) struct ObserverLifetime {
    ctx: Arc<MonitorContext>,
    id: ObserverId,
}

impl ObserverLifetime {
    pub(crate) fn begin(ctx: &Arc<MonitorContext>, id: ObserverId) -> Self {
        log_event_with_fields(Event::ObserverStarted, &[("observer", id.as_str())]);
        Self {
            ctx: ctx.clone(),
            id,
        }
    }

    /// Log a degraded display state for this observer
    pub(crate) fn degraded(&self, reason: &str) {
        log_event_with_fields(
            Event::ObserverDegraded,
            &[("observer", self.id.as_str()), ("reason", reason)],
        );
    }
}

impl Drop for ObserverLifetime {
    fn drop(&mut self) {
        let released = self.ctx.registry().release_owner(self.id).to_string();
        log_event_with_fields(
            Event::ObserverStopped,
            &[("observer", self.id.as_str()), ("released_handles", &released)],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::config::MonitorConfig;
    use crate::monitor::scripted::{ScriptedHost, ScriptedHostConfig};
    use crate::monitor::sink::MemorySink;

    fn context() -> Arc<MonitorContext> {
        MonitorContext::new(
            Arc::new(ScriptedHost::new(ScriptedHostConfig::default())),
            Arc::new(MemorySink::new()),
            MonitorConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_stay_on_grid() {
        let ctx = context();
        let started = tokio::time::Instant::now();
        let mut ticker = ticker(Duration::from_secs(1));

        assert!(tick_or_cancel(&ctx, &mut ticker).await);
        assert_eq!(started.elapsed(), Duration::ZERO);

        // Work inside a period does not push the next tick back.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(tick_or_cancel(&ctx, &mut ticker).await);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_missed_ticks() {
        let ctx = context();
        let started = tokio::time::Instant::now();
        let mut ticker = ticker(Duration::from_secs(1));
        assert!(tick_or_cancel(&ctx, &mut ticker).await);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        // The overdue tick fires at once, then the grid resumes at 3s.
        assert!(tick_or_cancel(&ctx, &mut ticker).await);
        assert_eq!(started.elapsed(), Duration::from_millis(2500));
        assert!(tick_or_cancel(&ctx, &mut ticker).await);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_interrupted_by_cancel() {
        let ctx = context();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let mut ticker = ticker(Duration::from_secs(3600));
        assert!(tick_or_cancel(&ctx, &mut ticker).await);

        let started = tokio::time::Instant::now();
        assert!(!tick_or_cancel(&ctx, &mut ticker).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_lifetime_releases_owner_on_drop() {
        let ctx = context();
        let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Battery);
        let (pending, _completion) = ctx.bridge().pending::<u8>(ObserverId::Battery);
        assert_eq!(ctx.registry().live_for(ObserverId::Battery), 2);

        drop(lifetime);
        assert_eq!(ctx.registry().live_for(ObserverId::Battery), 0);
        // The host firing late is a no-op.
        assert!(!pending.succeed(1));
    }

    #[tokio::test]
    async fn test_pending_completion_abandoned_on_cancel() {
        let ctx = context();
        let (_pending, completion) = ctx.bridge().pending::<String>(ObserverId::Clipboard);
        ctx.cancel();
        assert!(await_or_cancel(&ctx, completion).await.is_none());
    }
}
