//! Battery status (one-shot)

use std::sync::Arc;

use super::{await_or_cancel, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::host::{BatteryStatus, Capability};
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

pub const UNSUPPORTED_MESSAGE: &str = "Battery API not supported";
pub const UNAVAILABLE_MESSAGE: &str = "Battery status unavailable";

/// `"{percent}% (Charging|Not Charging)"`
pub fn format_battery(status: &BatteryStatus) -> String {
    let state = if status.charging {
        "Charging"
    } else {
        "Not Charging"
    };
    format!("{:.0}% ({})", status.level * 100.0, state)
}

pub async fn run(ctx: Arc<MonitorContext>) {
    let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Battery);

    if !ctx.host().supports(Capability::Battery) {
        ctx.publish(keys::BATTERY, UNSUPPORTED_MESSAGE);
        lifetime.degraded("battery unsupported");
        return;
    }

    let (pending, completion) = ctx.bridge().pending::<BatteryStatus>(ObserverId::Battery);
    ctx.host().read_battery(pending);

    match await_or_cancel(&ctx, completion).await {
        None => {}
        Some(Ok(status)) => {
            ctx.publish(keys::BATTERY, &format_battery(&status));
        }
        Some(Err(e)) => {
            ctx.publish(keys::BATTERY, UNAVAILABLE_MESSAGE);
            lifetime.degraded(&e.to_string());
        }
    }
}
