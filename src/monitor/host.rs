//! Host capability interface
//!
//! Everything the monitor reads from its environment goes through [`Host`]. Host
//! asynchronous operations take a [`Pending`] pair built by the completion bridge and
//! fire exactly one side of it, now or later. Implementations must not block.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::bridge::{FrameTimestamp, Pending};
use super::errors::HostError;
use super::registry::CallbackHandle;

/// Optional host capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Clipboard,
    Battery,
    Geolocation,
    MediaCapture,
    AudioAnalysis,
    FrameCallbacks,
}

impl Capability {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Clipboard => "clipboard",
            Capability::Battery => "battery",
            Capability::Geolocation => "geolocation",
            Capability::MediaCapture => "media_capture",
            Capability::AudioAnalysis => "audio_analysis",
            Capability::FrameCallbacks => "frame_callbacks",
        }
    }
}

/// Inner size of the display surface, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Battery reading; `level` is a fraction in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub level: f64,
    pub charging: bool,
}

/// Geolocation fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Opaque reference to a granted capture stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Live audio analysis node fed by a capture stream
pub trait AudioAnalyser: Send {
    /// Number of samples one time-domain read produces
    fn frequency_bin_count(&self) -> usize;

    /// Fill `buffer` with unsigned 8-bit time-domain samples (128 = silence)
    fn time_domain_data(&mut self, buffer: &mut [u8]);
}

/// The host environment
pub trait Host: Send + Sync {
    /// Static attributes for the one-shot snapshot
    fn attributes(&self) -> EnvironmentAttributes;

    /// Whether an optional capability exists at all
    fn supports(&self, capability: Capability) -> bool;

    /// Local wall-clock time
    fn local_time(&self) -> NaiveTime;

    /// Current viewport, `None` when the host cannot report it
    fn viewport(&self) -> Option<Viewport>;

    /// Whether the page currently has input focus
    fn has_focus(&self) -> bool;

    /// Read clipboard text
    fn read_clipboard(&self, pending: Pending<String>);

    /// Read battery status
    fn read_battery(&self, pending: Pending<BatteryStatus>);

    /// Read the current position
    fn current_position(&self, pending: Pending<Position>);

    /// Request combined audio/video capture
    fn request_media(&self, pending: Pending<MediaStream>);

    /// Attach a granted stream to the video surface
    fn attach_video(&self, stream: &MediaStream);

    /// Start video playback; fails when autoplay is refused by policy
    fn play_video(&self, pending: Pending<()>);

    /// Build a source → analyser pipeline for `stream`
    fn create_analyser(
        &self,
        stream: &MediaStream,
        fft_size: usize,
    ) -> Result<Box<dyn AudioAnalyser>, HostError>;

    /// Run `callback` before the next presented frame
    fn request_frame(&self, callback: CallbackHandle<FrameTimestamp>);
}

/// WebGL renderer identification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuInfo {
    pub renderer: Option<String>,
    pub vendor: Option<String>,
}

/// Network information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub connection_type: Option<String>,
}

/// Static host attributes read once at bootstrap
///
/// `None` means the host does not expose the attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentAttributes {
    pub user_agent: String,
    pub browser: String,
    pub language: String,
    pub platform: String,
    pub timezone: String,
    pub screen: Viewport,
    /// `None` when no WebGL context can be created
    pub gpu: Option<GpuInfo>,
    /// `None` when the network information API is missing
    pub connection: Option<ConnectionInfo>,
    pub device_memory_gb: Option<f64>,
    pub cpu_cores: Option<u32>,
    pub cookies_enabled: Option<bool>,
    pub online: Option<bool>,
    pub prefers_dark: bool,
    pub touch_events: bool,
    pub max_touch_points: u32,
    pub standalone: bool,
    pub cookies: String,
    pub history_length: u32,
    pub contacts_api: bool,
}

impl Default for EnvironmentAttributes {
    fn default() -> Self {
        Self {
            user_agent: "envscope/0.1".to_string(),
            browser: "Unknown".to_string(),
            language: "en-US".to_string(),
            platform: std::env::consts::OS.to_string(),
            timezone: "UTC".to_string(),
            screen: Viewport {
                width: 1920,
                height: 1080,
            },
            gpu: None,
            connection: None,
            device_memory_gb: None,
            cpu_cores: None,
            cookies_enabled: None,
            online: None,
            prefers_dark: false,
            touch_events: false,
            max_touch_points: 0,
            standalone: false,
            cookies: String::new(),
            history_length: 1,
            contacts_api: false,
        }
    }
}
