//! Clipboard
//!
//! Asynchronous-completion observer. Each iteration issues one read through the
//! completion bridge and fully processes it before waiting for the next tick. Reads are skipped while
//! the page lacks focus; an empty value is shown instead.
//!
//! Failures only change what is displayed. Once the consecutive failure count passes
//! the configured threshold the degraded message is shown, and polling continues at the
//! same cadence. Any success resets the count.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use super::{await_or_cancel, ticker, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::errors::MonitorResult;
use crate::monitor::host::Capability;
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

pub const DEGRADED_MESSAGE: &str = "Clipboard access denied or unavailable";
pub const UNAVAILABLE_MESSAGE: &str = "Clipboard API not available";

/// Clipboard observer state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardState {
    /// Text currently shown in the clipboard target, as written by this observer
    last_value: Option<String>,
    consecutive_errors: u32,
}

impl ClipboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_value(&self) -> Option<&str> {
        self.last_value.as_deref()
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    fn show(&mut self, text: &str) -> Option<String> {
        if self.last_value.as_deref() == Some(text) {
            return None;
        }
        self.last_value = Some(text.to_string());
        Some(text.to_string())
    }

    /// A read succeeded. Returns the text to publish if it differs from what is shown.
    pub fn record_success(&mut self, text: &str) -> Option<String> {
        self.consecutive_errors = 0;
        self.show(text)
    }

    /// A read failed. Returns the degraded message once the count exceeds `threshold`
    /// and it is not already shown.
    pub fn record_failure(&mut self, threshold: u32) -> Option<String> {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.consecutive_errors > threshold {
            self.show(DEGRADED_MESSAGE)
        } else {
            None
        }
    }

    /// The page lacks focus. Returns the empty value if it is not already shown.
    pub fn record_unfocused(&mut self) -> Option<String> {
        self.show("")
    }

    /// A manual read failed: the degraded message is shown regardless of the count
    pub fn record_manual_failure(&mut self) -> Option<String> {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.show(DEGRADED_MESSAGE)
    }

    /// True exactly when the last failure crossed `threshold`
    pub fn just_degraded(&self, threshold: u32) -> bool {
        self.consecutive_errors == threshold.saturating_add(1)
    }
}

struct ClipboardObserver {
    ctx: Arc<MonitorContext>,
    state: ClipboardState,
    lifetime: ObserverLifetime,
    threshold: u32,
}

impl ClipboardObserver {
    fn show(&self, text: Option<String>) {
        match text {
            Some(text) => {
                self.ctx.publish(keys::CLIPBOARD, &text);
            }
            None => self.ctx.metrics().increment_suppressed(),
        }
    }

    async fn read(&self) -> Option<MonitorResult<String>> {
        let (pending, completion) = self.ctx.bridge().pending::<String>(ObserverId::Clipboard);
        self.ctx.host().read_clipboard(pending);
        await_or_cancel(&self.ctx, completion).await
    }

    /// One polling iteration. Returns false if cancellation was observed.
    async fn tick(&mut self) -> bool {
        if !self.ctx.host().has_focus() {
            let text = self.state.record_unfocused();
            self.show(text);
            return true;
        }

        match self.read().await {
            None => false,
            Some(Ok(text)) => {
                let text = self.state.record_success(&text);
                self.show(text);
                true
            }
            Some(Err(e)) => {
                let text = self.state.record_failure(self.threshold);
                if self.state.just_degraded(self.threshold) {
                    self.lifetime.degraded(&e.to_string());
                }
                self.show(text);
                true
            }
        }
    }

    /// One read outside the polling cadence. `None` if cancelled, else whether it
    /// succeeded.
    async fn manual_read(&mut self) -> Option<bool> {
        match self.read().await? {
            Ok(text) => {
                let text = self.state.record_success(&text);
                self.show(text);
                Some(true)
            }
            Err(e) => {
                self.lifetime.degraded(&e.to_string());
                let text = self.state.record_manual_failure();
                self.show(text);
                Some(false)
            }
        }
    }
}

async fn next_request(requests: &mut Option<UnboundedReceiver<()>>) -> Option<()> {
    match requests {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Run the clipboard observer.
///
/// `requests` carries manual reads from the permission control. When autostart is off,
/// polling begins after the first manual read succeeds.
pub async fn run(ctx: Arc<MonitorContext>, requests: UnboundedReceiver<()>) {
    let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Clipboard);

    if !ctx.host().supports(Capability::Clipboard) {
        ctx.publish(keys::CLIPBOARD, UNAVAILABLE_MESSAGE);
        lifetime.degraded("unsupported");
        return;
    }

    let interval = ctx.config().clipboard_interval();
    let mut polling = ctx.config().clipboard_autostart;
    let mut requests = Some(requests);
    let mut observer = ClipboardObserver {
        threshold: ctx.config().clipboard_error_threshold,
        ctx,
        state: ClipboardState::new(),
        lifetime,
    };
    let ctx = observer.ctx.clone();
    let mut polls = ticker(interval);

    loop {
        tokio::select! {
            _ = polls.tick(), if polling => {
                if ctx.is_cancelled() || !observer.tick().await {
                    break;
                }
            }
            request = next_request(&mut requests) => match request {
                Some(()) => match observer.manual_read().await {
                    None => break,
                    Some(true) if !polling => {
                        // The grid starts at the first manual success.
                        polling = true;
                        polls = ticker(interval);
                    }
                    Some(_) => {}
                },
                None => requests = None,
            },
            _ = ctx.cancellation().cancelled() => break,
        }
    }
}
