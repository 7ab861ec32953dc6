//! Wall clock
//!
//! Fixed-interval observer with no change filter: the formatted time differs on every
//! tick, so every tick publishes.

use std::sync::Arc;

use chrono::NaiveTime;

use super::{tick_or_cancel, ticker, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

/// `HH:MM:SS`
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

pub async fn run(ctx: Arc<MonitorContext>) {
    let _lifetime = ObserverLifetime::begin(&ctx, ObserverId::Clock);
    let mut ticker = ticker(ctx.config().clock_interval());

    while tick_or_cancel(&ctx, &mut ticker).await {
        let now = ctx.host().local_time();
        ctx.publish(keys::CLOCK, &format_clock(now));
    }
}
