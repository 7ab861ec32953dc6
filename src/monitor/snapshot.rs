//! One-shot environment snapshot
//!
//! Static attributes are formatted once at bootstrap and written before any observer
//! starts, so the display is never empty.

use super::context::MonitorContext;
use super::host::{ConnectionInfo, EnvironmentAttributes, GpuInfo};
use super::sink::keys;

/// Initial text for the clipboard target until the first read completes
pub const CLIPBOARD_PLACEHOLDER: &str = "Click the button to request access";

/// Format every snapshot attribute as `(key, text)` pairs, in publish order
pub fn entries(attrs: &EnvironmentAttributes) -> Vec<(&'static str, String)> {
    vec![
        (keys::USER_AGENT, attrs.user_agent.clone()),
        (keys::LANGUAGE, attrs.language.clone()),
        (keys::PLATFORM, attrs.platform.clone()),
        (keys::TIMEZONE, attrs.timezone.clone()),
        (
            keys::SCREEN_SIZE,
            format!("{}x{}", attrs.screen.width, attrs.screen.height),
        ),
        (keys::GPU, gpu_text(attrs.gpu.as_ref())),
        (keys::CONNECTION, connection_text(attrs.connection.as_ref())),
        (keys::DEVICE_MEMORY, device_memory_text(attrs.device_memory_gb)),
        (
            keys::CPU_CORES,
            attrs
                .cpu_cores
                .filter(|n| *n > 0)
                .map(|n| n.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
        ),
        (keys::COOKIES_ENABLED, flag_text(attrs.cookies_enabled)),
        (keys::ONLINE_STATUS, flag_text(attrs.online)),
        (keys::BROWSER, attrs.browser.clone()),
        (keys::BATTERY, String::new()),
        (
            keys::COLOR_SCHEME,
            if attrs.prefers_dark { "Dark" } else { "Light" }.to_string(),
        ),
        (
            keys::TOUCH_SUPPORT,
            if attrs.touch_events || attrs.max_touch_points > 0 {
                "Yes"
            } else {
                "No"
            }
            .to_string(),
        ),
        (keys::WINDOW_SIZE, String::new()),
        (
            keys::DISPLAY_MODE,
            if attrs.standalone {
                "Standalone/PWA"
            } else {
                "Browser Tab"
            }
            .to_string(),
        ),
        (
            keys::COOKIES,
            if attrs.cookies.is_empty() {
                "None".to_string()
            } else {
                attrs.cookies.clone()
            },
        ),
        (keys::HISTORY_LENGTH, attrs.history_length.to_string()),
        (
            keys::CONTACTS,
            if attrs.contacts_api {
                "Contacts API available (requires user gesture)"
            } else {
                "Contacts API not available"
            }
            .to_string(),
        ),
        (keys::CLIPBOARD, CLIPBOARD_PLACEHOLDER.to_string()),
    ]
}

fn gpu_text(gpu: Option<&GpuInfo>) -> String {
    let Some(gpu) = gpu else {
        return "No WebGL".to_string();
    };
    [gpu.renderer.as_deref(), gpu.vendor.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or("Unknown GPU")
        .to_string()
}

fn connection_text(connection: Option<&ConnectionInfo>) -> String {
    let Some(connection) = connection else {
        return "Not Supported".to_string();
    };
    [
        connection.effective_type.as_deref(),
        connection.connection_type.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|s| !s.is_empty())
    .unwrap_or("Unknown")
    .to_string()
}

fn device_memory_text(gb: Option<f64>) -> String {
    match gb {
        Some(gb) if gb > 0.0 => format!("{:.0} GB", gb),
        _ => "Not Supported".to_string(),
    }
}

fn flag_text(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "true".to_string(),
        Some(false) => "false".to_string(),
        None => "Unknown".to_string(),
    }
}

/// Read the host attributes and write every snapshot entry. Returns the number written.
pub fn publish_snapshot(ctx: &MonitorContext) -> usize {
    let attrs = ctx.host().attributes();
    entries(&attrs)
        .iter()
        .filter(|(key, text)| ctx.publish(key, text))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::host::Viewport;

    fn lookup(entries: &[(&'static str, String)], key: &str) -> String {
        entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    #[test]
    fn test_defaults_render_fallbacks() {
        let entries = entries(&EnvironmentAttributes::default());
        assert_eq!(lookup(&entries, keys::GPU), "No WebGL");
        assert_eq!(lookup(&entries, keys::CONNECTION), "Not Supported");
        assert_eq!(lookup(&entries, keys::DEVICE_MEMORY), "Not Supported");
        assert_eq!(lookup(&entries, keys::CPU_CORES), "Unknown");
        assert_eq!(lookup(&entries, keys::ONLINE_STATUS), "Unknown");
        assert_eq!(lookup(&entries, keys::COOKIES), "None");
        assert_eq!(lookup(&entries, keys::COLOR_SCHEME), "Light");
        assert_eq!(lookup(&entries, keys::DISPLAY_MODE), "Browser Tab");
        assert_eq!(lookup(&entries, keys::CLIPBOARD), CLIPBOARD_PLACEHOLDER);
        assert_eq!(lookup(&entries, keys::BATTERY), "");
    }

    #[test]
    fn test_populated_attributes() {
        let attrs = EnvironmentAttributes {
            screen: Viewport {
                width: 2560,
                height: 1440,
            },
            gpu: Some(GpuInfo {
                renderer: Some(String::new()),
                vendor: Some("ACME".into()),
            }),
            connection: Some(ConnectionInfo {
                effective_type: None,
                connection_type: Some("wifi".into()),
            }),
            device_memory_gb: Some(8.0),
            cpu_cores: Some(12),
            online: Some(true),
            prefers_dark: true,
            max_touch_points: 5,
            standalone: true,
            cookies: "a=1".into(),
            contacts_api: true,
            ..Default::default()
        };
        let entries = entries(&attrs);
        assert_eq!(lookup(&entries, keys::SCREEN_SIZE), "2560x1440");
        assert_eq!(lookup(&entries, keys::GPU), "ACME");
        assert_eq!(lookup(&entries, keys::CONNECTION), "wifi");
        assert_eq!(lookup(&entries, keys::DEVICE_MEMORY), "8 GB");
        assert_eq!(lookup(&entries, keys::CPU_CORES), "12");
        assert_eq!(lookup(&entries, keys::ONLINE_STATUS), "true");
        assert_eq!(lookup(&entries, keys::COLOR_SCHEME), "Dark");
        assert_eq!(lookup(&entries, keys::TOUCH_SUPPORT), "Yes");
        assert_eq!(lookup(&entries, keys::DISPLAY_MODE), "Standalone/PWA");
        assert_eq!(lookup(&entries, keys::COOKIES), "a=1");
        assert_eq!(
            lookup(&entries, keys::CONTACTS),
            "Contacts API available (requires user gesture)"
        );
    }

    #[test]
    fn test_unnamed_gpu_and_connection() {
        assert_eq!(gpu_text(Some(&GpuInfo::default())), "Unknown GPU");
        assert_eq!(connection_text(Some(&ConnectionInfo::default())), "Unknown");
    }
}
