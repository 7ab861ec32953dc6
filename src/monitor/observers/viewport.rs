//! Viewport size
//!
//! Fixed-interval observer that publishes `WxH` only when it differs from the last
//! published value.

use std::sync::Arc;

use super::{tick_or_cancel, ticker, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::host::Viewport;
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

/// `WxH`, or `Unknown` when the host cannot report a size
pub fn format_viewport(viewport: Option<Viewport>) -> String {
    match viewport {
        Some(v) if v.width > 0 && v.height > 0 => format!("{}x{}", v.width, v.height),
        _ => "Unknown".to_string(),
    }
}

pub async fn run(ctx: Arc<MonitorContext>) {
    let _lifetime = ObserverLifetime::begin(&ctx, ObserverId::Viewport);
    let mut ticker = ticker(ctx.config().viewport_interval());
    let mut last_published: Option<String> = None;

    while tick_or_cancel(&ctx, &mut ticker).await {
        let size = format_viewport(ctx.host().viewport());
        if last_published.as_deref() == Some(size.as_str()) {
            ctx.metrics().increment_suppressed();
        } else {
            ctx.publish(keys::WINDOW_SIZE, &size);
            last_published = Some(size);
        }
    }
}
