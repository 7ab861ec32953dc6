//! Geolocation
//!
//! One-shot position read at start, repeated on every press of the location control.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use super::{await_or_cancel, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::host::{Capability, Position};
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

pub const UNSUPPORTED_MESSAGE: &str = "Geolocation not supported";
pub const UNAVAILABLE_MESSAGE: &str = "Location unavailable";

pub fn format_position(position: &Position) -> String {
    format!(
        "Latitude: {:.5}, Longitude: {:.5}",
        position.latitude, position.longitude
    )
}

/// Read the position once. Returns false if cancellation was observed.
async fn fetch(ctx: &MonitorContext, lifetime: &ObserverLifetime) -> bool {
    let (pending, completion) = ctx.bridge().pending::<Position>(ObserverId::Location);
    ctx.host().current_position(pending);

    match await_or_cancel(ctx, completion).await {
        None => false,
        Some(Ok(position)) => {
            ctx.publish(keys::LOCATION, &format_position(&position));
            true
        }
        Some(Err(e)) => {
            ctx.publish(keys::LOCATION, UNAVAILABLE_MESSAGE);
            lifetime.degraded(&e.to_string());
            true
        }
    }
}

pub async fn run(ctx: Arc<MonitorContext>, mut requests: UnboundedReceiver<()>) {
    let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Location);

    if !ctx.host().supports(Capability::Geolocation) {
        ctx.publish(keys::LOCATION, UNSUPPORTED_MESSAGE);
        lifetime.degraded("geolocation unsupported");
        return;
    }

    if !fetch(&ctx, &lifetime).await {
        return;
    }

    loop {
        let request = tokio::select! {
            _ = ctx.cancellation().cancelled() => break,
            request = requests.recv() => request,
        };
        match request {
            Some(()) => {
                if !fetch(&ctx, &lifetime).await {
                    break;
                }
            }
            None => {
                ctx.cancellation().cancelled().await;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_position() {
        let position = Position {
            latitude: 52.520008,
            longitude: -13.404954,
        };
        assert_eq!(
            format_position(&position),
            "Latitude: 52.52001, Longitude: -13.40495"
        );
    }
}
