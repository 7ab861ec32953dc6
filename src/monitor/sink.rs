//! Display sink
//!
//! The write-only surface observers publish into. Keys name display targets; a write
//! to a key with no target fails with `MonitorError::Sink`, which the context logs and
//! swallows so the calling observer keeps running.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::errors::{MonitorError, MonitorResult};
use crate::observability::{log_event_with_fields, Event};

/// Display target keys
pub mod keys {
    pub const USER_AGENT: &str = "userAgent";
    pub const BROWSER: &str = "browser";
    pub const LANGUAGE: &str = "language";
    pub const PLATFORM: &str = "platform";
    pub const TIMEZONE: &str = "timezone";
    pub const SCREEN_SIZE: &str = "screenSize";
    pub const GPU: &str = "gpu";
    pub const CONNECTION: &str = "connection";
    pub const DEVICE_MEMORY: &str = "deviceMemory";
    pub const CPU_CORES: &str = "cpuCores";
    pub const COOKIES_ENABLED: &str = "cookiesEnabled";
    pub const ONLINE_STATUS: &str = "onlineStatus";
    pub const COLOR_SCHEME: &str = "preferredColorScheme";
    pub const TOUCH_SUPPORT: &str = "touchSupport";
    pub const DISPLAY_MODE: &str = "displayMode";
    pub const COOKIES: &str = "cookies";
    pub const HISTORY_LENGTH: &str = "historyLength";
    pub const CONTACTS: &str = "contacts";

    pub const CLOCK: &str = "clock";
    pub const WINDOW_SIZE: &str = "windowSize";
    pub const CLIPBOARD: &str = "clipboard";
    pub const BATTERY: &str = "battery";
    pub const LOCATION: &str = "location";
    pub const CAMERA_STATUS: &str = "cameraStatus";
    pub const MIC_STATUS: &str = "micStatus";
    pub const MIC_VOLUME: &str = "micVolume";
    pub const CAMERA_START: &str = "cameraStartBtn";

    /// Every key the monitor writes
    pub const ALL: &[&str] = &[
        USER_AGENT,
        BROWSER,
        LANGUAGE,
        PLATFORM,
        TIMEZONE,
        SCREEN_SIZE,
        GPU,
        CONNECTION,
        DEVICE_MEMORY,
        CPU_CORES,
        COOKIES_ENABLED,
        ONLINE_STATUS,
        COLOR_SCHEME,
        TOUCH_SUPPORT,
        DISPLAY_MODE,
        COOKIES,
        HISTORY_LENGTH,
        CONTACTS,
        CLOCK,
        WINDOW_SIZE,
        CLIPBOARD,
        BATTERY,
        LOCATION,
        CAMERA_STATUS,
        MIC_STATUS,
        MIC_VOLUME,
        CAMERA_START,
    ];
}

/// A display surface
pub trait Sink: Send + Sync {
    /// Replace the text of `key`
    fn set_text(&self, key: &str, value: &str) -> MonitorResult<()>;

    /// Set a 0-100 level indicator
    fn set_level(&self, key: &str, percent: u8) -> MonitorResult<()> {
        self.set_text(key, &percent.to_string())
    }

    /// Show or hide a control
    fn set_visible(&self, key: &str, visible: bool) -> MonitorResult<()>;

    /// Enable or disable a control
    fn set_enabled(&self, key: &str, enabled: bool) -> MonitorResult<()>;
}

/// One recorded sink write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkWrite {
    Text { key: String, value: String },
    Level { key: String, percent: u8 },
    Visible { key: String, visible: bool },
    Enabled { key: String, enabled: bool },
}

impl SinkWrite {
    /// Target key of the write
    pub fn key(&self) -> &str {
        match self {
            SinkWrite::Text { key, .. }
            | SinkWrite::Level { key, .. }
            | SinkWrite::Visible { key, .. }
            | SinkWrite::Enabled { key, .. } => key,
        }
    }
}

/// In-memory sink that records every accepted write
#[derive(Debug)]
pub struct MemorySink {
    targets: HashSet<String>,
    writes: Mutex<Vec<SinkWrite>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Sink with a target for every key the monitor knows
    pub fn new() -> Self {
        Self::with_targets(keys::ALL.iter().copied())
    }

    /// Sink with targets only for `targets`
    pub fn with_targets<'a>(targets: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            targets: targets.into_iter().map(str::to_string).collect(),
            writes: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, key: &str, write: SinkWrite) -> MonitorResult<()> {
        if !self.targets.contains(key) {
            return Err(MonitorError::sink_target(key));
        }
        self.writes
            .lock()
            .map_err(|_| MonitorError::Internal("Lock poisoned".into()))?
            .push(write);
        Ok(())
    }

    /// Every accepted write, in order
    pub fn writes(&self) -> Vec<SinkWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of accepted writes
    pub fn len(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Check if nothing was written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every text written to `key`, in order
    pub fn texts(&self, key: &str) -> Vec<String> {
        self.writes
            .lock()
            .map(|writes| {
                writes
                    .iter()
                    .filter_map(|w| match w {
                        SinkWrite::Text { key: k, value } if k == key => Some(value.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent text written to `key`
    pub fn last_text(&self, key: &str) -> Option<String> {
        self.texts(key).pop()
    }

    /// Every level written to `key`, in order
    pub fn levels(&self, key: &str) -> Vec<u8> {
        self.writes
            .lock()
            .map(|writes| {
                writes
                    .iter()
                    .filter_map(|w| match w {
                        SinkWrite::Level { key: k, percent } if k == key => Some(*percent),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Latest visibility written to `key`
    pub fn visible(&self, key: &str) -> Option<bool> {
        self.writes.lock().ok().and_then(|writes| {
            writes.iter().rev().find_map(|w| match w {
                SinkWrite::Visible { key: k, visible } if k == key => Some(*visible),
                _ => None,
            })
        })
    }

    /// Latest enabled state written to `key`
    pub fn enabled(&self, key: &str) -> Option<bool> {
        self.writes.lock().ok().and_then(|writes| {
            writes.iter().rev().find_map(|w| match w {
                SinkWrite::Enabled { key: k, enabled } if k == key => Some(*enabled),
                _ => None,
            })
        })
    }
}

impl Sink for MemorySink {
    fn set_text(&self, key: &str, value: &str) -> MonitorResult<()> {
        self.record(
            key,
            SinkWrite::Text {
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    fn set_level(&self, key: &str, percent: u8) -> MonitorResult<()> {
        self.record(
            key,
            SinkWrite::Level {
                key: key.to_string(),
                percent,
            },
        )
    }

    fn set_visible(&self, key: &str, visible: bool) -> MonitorResult<()> {
        self.record(
            key,
            SinkWrite::Visible {
                key: key.to_string(),
                visible,
            },
        )
    }

    fn set_enabled(&self, key: &str, enabled: bool) -> MonitorResult<()> {
        self.record(
            key,
            SinkWrite::Enabled {
                key: key.to_string(),
                enabled,
            },
        )
    }
}

/// Sink that renders updates as `SINK_UPDATE` log lines
///
/// Level indicators update every frame, so only level changes are logged.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    levels: Mutex<HashMap<String, u8>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for ConsoleSink {
    fn set_text(&self, key: &str, value: &str) -> MonitorResult<()> {
        log_event_with_fields(Event::SinkUpdate, &[("key", key), ("value", value)]);
        Ok(())
    }

    fn set_level(&self, key: &str, percent: u8) -> MonitorResult<()> {
        let changed = self
            .levels
            .lock()
            .map(|mut levels| levels.insert(key.to_string(), percent) != Some(percent))
            .unwrap_or(true);
        if changed {
            let percent = percent.to_string();
            log_event_with_fields(Event::SinkUpdate, &[("key", key), ("level", &percent)]);
        }
        Ok(())
    }

    fn set_visible(&self, key: &str, visible: bool) -> MonitorResult<()> {
        let visible = if visible { "true" } else { "false" };
        log_event_with_fields(Event::SinkUpdate, &[("key", key), ("visible", visible)]);
        Ok(())
    }

    fn set_enabled(&self, key: &str, enabled: bool) -> MonitorResult<()> {
        let enabled = if enabled { "true" } else { "false" };
        log_event_with_fields(Event::SinkUpdate, &[("key", key), ("enabled", enabled)]);
        Ok(())
    }
}
