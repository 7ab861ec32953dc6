//! Scripted host
//!
//! A deterministic [`Host`] driven by configuration. The `monitor` subcommand runs
//! against it, and tests steer it at runtime: focus, clipboard contents, failures,
//! permissions, held completions and manually fired frames.
//!
//! Time comes from tokio, so under a paused test runtime the clock, the viewport
//! script and frame timestamps advance exactly with virtual time.

use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::bridge::{FrameTimestamp, Pending};
use super::errors::HostError;
use super::host::{
    AudioAnalyser, BatteryStatus, Capability, EnvironmentAttributes, Host, MediaStream, Position,
    Viewport,
};
use super::registry::CallbackHandle;

/// Scripted result of a one-shot host request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome<T> {
    Unsupported,
    Denied,
    Fail(String),
    Value(T),
}

impl<T: Clone> Outcome<T> {
    fn is_supported(&self) -> bool {
        !matches!(self, Outcome::Unsupported)
    }

    fn resolve(&self, capability: &str) -> Result<T, HostError> {
        match self {
            Outcome::Unsupported => Err(HostError::unsupported(capability)),
            Outcome::Denied => Err(HostError::denied(capability)),
            Outcome::Fail(message) => Err(HostError::transient(message.clone())),
            Outcome::Value(value) => Ok(value.clone()),
        }
    }
}

/// Viewport size from `at_ms` onwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportStep {
    pub at_ms: u64,
    pub width: u32,
    pub height: u32,
}

/// Clipboard behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardScript {
    pub supported: bool,
    pub focused: bool,
    pub contents: String,
    /// The next `fail_reads` reads fail transiently
    pub fail_reads: u32,
    /// Every read is refused
    pub denied: bool,
    /// Reads stay pending until resolved explicitly
    pub hold: bool,
}

impl Default for ClipboardScript {
    fn default() -> Self {
        Self {
            supported: true,
            focused: true,
            contents: String::new(),
            fail_reads: 0,
            denied: false,
            hold: false,
        }
    }
}

/// Capture permission answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPermission {
    Granted,
    Denied,
    Unsupported,
}

/// Camera and microphone behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaScript {
    pub permission: MediaPermission,
    pub has_audio: bool,
    pub audio_analysis: bool,
    /// When false the first playback attempt is refused by autoplay policy
    pub autoplay: bool,
    /// Deviation of the synthetic waveform from the midpoint, 0-127
    pub amplitude: u8,
}

impl Default for MediaScript {
    fn default() -> Self {
        Self {
            permission: MediaPermission::Granted,
            has_audio: true,
            audio_analysis: true,
            autoplay: true,
            amplitude: 32,
        }
    }
}

/// Scripted host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedHostConfig {
    pub attributes: EnvironmentAttributes,
    /// Time of day at start; local wall clock when absent
    pub clock_start: Option<NaiveTime>,
    pub viewport: Vec<ViewportStep>,
    pub clipboard: ClipboardScript,
    pub media: MediaScript,
    pub battery: Outcome<BatteryStatus>,
    pub location: Outcome<Position>,
    pub frame_callbacks: bool,
    /// Frame period; 0 means frames fire only through [`ScriptedHost::fire_frames`]
    pub frame_interval_ms: u64,
}

impl Default for ScriptedHostConfig {
    fn default() -> Self {
        Self {
            attributes: EnvironmentAttributes::default(),
            clock_start: None,
            viewport: vec![ViewportStep {
                at_ms: 0,
                width: 1280,
                height: 720,
            }],
            clipboard: ClipboardScript::default(),
            media: MediaScript::default(),
            battery: Outcome::Value(BatteryStatus {
                level: 0.8,
                charging: true,
            }),
            location: Outcome::Value(Position {
                latitude: 48.85837,
                longitude: 2.29448,
            }),
            frame_callbacks: true,
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug)]
struct ScriptState {
    viewport_override: Option<Option<Viewport>>,
    clipboard: ClipboardScript,
    held_reads: Vec<Pending<String>>,
    media_permission: MediaPermission,
    autoplay_refusals: u32,
    attached: Option<String>,
    frames: Vec<CallbackHandle<FrameTimestamp>>,
}

/// Deterministic host for the CLI and tests
#[derive(Debug)]
pub struct ScriptedHost {
    config: ScriptedHostConfig,
    started: Instant,
    clock_start: NaiveTime,
    amplitude: Arc<AtomicU8>,
    clipboard_reads: AtomicUsize,
    media_requests: AtomicUsize,
    play_attempts: AtomicUsize,
    streams: AtomicU32,
    state: Mutex<ScriptState>,
}

impl ScriptedHost {
    pub fn new(config: ScriptedHostConfig) -> Self {
        let clock_start = config
            .clock_start
            .unwrap_or_else(|| chrono::Local::now().time());
        let state = ScriptState {
            viewport_override: None,
            clipboard: config.clipboard.clone(),
            held_reads: Vec::new(),
            media_permission: config.media.permission,
            autoplay_refusals: u32::from(!config.media.autoplay),
            attached: None,
            frames: Vec::new(),
        };
        Self {
            amplitude: Arc::new(AtomicU8::new(config.media.amplitude.min(127))),
            config,
            started: Instant::now(),
            clock_start,
            clipboard_reads: AtomicUsize::new(0),
            media_requests: AtomicUsize::new(0),
            play_attempts: AtomicUsize::new(0),
            streams: AtomicU32::new(0),
            state: Mutex::new(state),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScriptState) -> R) -> Option<R> {
        self.state.lock().ok().map(|mut state| f(&mut state))
    }

    /// Override the scripted viewport from now on; `None` reports no size
    pub fn set_viewport(&self, viewport: Option<Viewport>) {
        self.with_state(|s| s.viewport_override = Some(viewport));
    }

    pub fn set_focus(&self, focused: bool) {
        self.with_state(|s| s.clipboard.focused = focused);
    }

    pub fn set_clipboard(&self, contents: &str) {
        self.with_state(|s| s.clipboard.contents = contents.to_string());
    }

    /// Fail the next `count` clipboard reads
    pub fn fail_clipboard_reads(&self, count: u32) {
        self.with_state(|s| s.clipboard.fail_reads = count);
    }

    pub fn set_clipboard_denied(&self, denied: bool) {
        self.with_state(|s| s.clipboard.denied = denied);
    }

    /// Keep subsequent clipboard reads pending until [`Self::resolve_held_reads`]
    pub fn hold_clipboard_reads(&self, hold: bool) {
        self.with_state(|s| s.clipboard.hold = hold);
    }

    pub fn held_read_count(&self) -> usize {
        self.with_state(|s| s.held_reads.len()).unwrap_or(0)
    }

    /// Complete every held read with `result`. Returns how many continuations ran.
    pub fn resolve_held_reads(&self, result: Result<String, HostError>) -> usize {
        let held = self
            .with_state(|s| std::mem::take(&mut s.held_reads))
            .unwrap_or_default();
        held.into_iter()
            .map(|pending| pending.resolve(result.clone()))
            .filter(|fired| *fired)
            .count()
    }

    pub fn clipboard_reads(&self) -> usize {
        self.clipboard_reads.load(Ordering::SeqCst)
    }

    pub fn set_media_permission(&self, permission: MediaPermission) {
        self.with_state(|s| s.media_permission = permission);
    }

    pub fn media_requests(&self) -> usize {
        self.media_requests.load(Ordering::SeqCst)
    }

    pub fn play_attempts(&self) -> usize {
        self.play_attempts.load(Ordering::SeqCst)
    }

    /// Id of the stream attached to the video surface
    pub fn attached_stream(&self) -> Option<String> {
        self.with_state(|s| s.attached.clone()).flatten()
    }

    pub fn set_amplitude(&self, amplitude: u8) {
        self.amplitude.store(amplitude.min(127), Ordering::SeqCst);
    }

    /// Frame callbacks waiting for [`Self::fire_frames`]
    pub fn queued_frames(&self) -> usize {
        self.with_state(|s| s.frames.len()).unwrap_or(0)
    }

    /// Fire every queued frame callback. Returns how many continuations ran.
    pub fn fire_frames(&self) -> usize {
        let frames = self
            .with_state(|s| std::mem::take(&mut s.frames))
            .unwrap_or_default();
        let timestamp = self.elapsed().as_secs_f64() * 1000.0;
        frames
            .into_iter()
            .map(|frame| frame.invoke(timestamp))
            .filter(|fired| *fired)
            .count()
    }
}

impl Host for ScriptedHost {
    fn attributes(&self) -> EnvironmentAttributes {
        self.config.attributes.clone()
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Clipboard => self.config.clipboard.supported,
            Capability::Battery => self.config.battery.is_supported(),
            Capability::Geolocation => self.config.location.is_supported(),
            Capability::MediaCapture => self.config.media.permission != MediaPermission::Unsupported,
            Capability::AudioAnalysis => self.config.media.audio_analysis,
            Capability::FrameCallbacks => self.config.frame_callbacks,
        }
    }

    fn local_time(&self) -> NaiveTime {
        let elapsed = chrono::Duration::milliseconds(self.elapsed().as_millis() as i64);
        self.clock_start.overflowing_add_signed(elapsed).0
    }

    fn viewport(&self) -> Option<Viewport> {
        if let Some(Some(viewport)) = self.with_state(|s| s.viewport_override) {
            return viewport;
        }
        let now_ms = self.elapsed().as_millis() as u64;
        self.config
            .viewport
            .iter()
            .filter(|step| step.at_ms <= now_ms)
            .last()
            .map(|step| Viewport {
                width: step.width,
                height: step.height,
            })
    }

    fn has_focus(&self) -> bool {
        self.with_state(|s| s.clipboard.focused).unwrap_or(false)
    }

    fn read_clipboard(&self, pending: Pending<String>) {
        self.clipboard_reads.fetch_add(1, Ordering::SeqCst);

        let outcome = self.state.lock().ok().map(|mut s| {
            if !s.clipboard.supported {
                Some(Err(HostError::unsupported("Clipboard API")))
            } else if s.clipboard.denied {
                Some(Err(HostError::denied("Clipboard")))
            } else if s.clipboard.fail_reads > 0 {
                s.clipboard.fail_reads -= 1;
                Some(Err(HostError::transient("Clipboard read failed")))
            } else if s.clipboard.hold {
                None
            } else {
                Some(Ok(s.clipboard.contents.clone()))
            }
        });

        match outcome {
            Some(Some(result)) => {
                pending.resolve(result);
            }
            Some(None) => {
                self.with_state(|s| s.held_reads.push(pending));
            }
            None => {
                pending.fail(HostError::transient("Host state unavailable"));
            }
        }
    }

    fn read_battery(&self, pending: Pending<BatteryStatus>) {
        pending.resolve(self.config.battery.resolve("Battery API"));
    }

    fn current_position(&self, pending: Pending<Position>) {
        pending.resolve(self.config.location.resolve("Geolocation"));
    }

    fn request_media(&self, pending: Pending<MediaStream>) {
        self.media_requests.fetch_add(1, Ordering::SeqCst);
        let permission = self
            .with_state(|s| s.media_permission)
            .unwrap_or(MediaPermission::Denied);

        let result = match permission {
            MediaPermission::Granted => {
                let n = self.streams.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(MediaStream {
                    id: format!("scripted-stream-{}", n),
                    has_audio: self.config.media.has_audio,
                    has_video: true,
                })
            }
            MediaPermission::Denied => Err(HostError::denied("Camera")),
            MediaPermission::Unsupported => Err(HostError::unsupported("getUserMedia")),
        };
        pending.resolve(result);
    }

    fn attach_video(&self, stream: &MediaStream) {
        self.with_state(|s| s.attached = Some(stream.id.clone()));
    }

    fn play_video(&self, pending: Pending<()>) {
        self.play_attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .with_state(|s| {
                if s.autoplay_refusals > 0 {
                    s.autoplay_refusals -= 1;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(true);

        if refused {
            pending.fail(HostError::denied("Autoplay"));
        } else {
            pending.succeed(());
        }
    }

    fn create_analyser(
        &self,
        stream: &MediaStream,
        fft_size: usize,
    ) -> Result<Box<dyn AudioAnalyser>, HostError> {
        if !self.config.media.audio_analysis {
            return Err(HostError::unsupported("AudioContext"));
        }
        if !stream.has_audio {
            return Err(HostError::transient("Stream has no audio track"));
        }
        Ok(Box::new(ScriptedAnalyser {
            bins: fft_size / 2,
            amplitude: self.amplitude.clone(),
        }))
    }

    fn request_frame(&self, callback: CallbackHandle<FrameTimestamp>) {
        let interval = self.config.frame_interval_ms;
        if interval == 0 {
            self.with_state(|s| s.frames.push(callback));
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let started = self.started;
                runtime.spawn(async move {
                    tokio::time::sleep(Duration::from_millis(interval)).await;
                    callback.invoke(started.elapsed().as_secs_f64() * 1000.0);
                });
            }
            Err(_) => {
                self.with_state(|s| s.frames.push(callback));
            }
        }
    }
}

/// Square wave of configurable amplitude around the midpoint
struct ScriptedAnalyser {
    bins: usize,
    amplitude: Arc<AtomicU8>,
}

impl AudioAnalyser for ScriptedAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.bins
    }

    fn time_domain_data(&mut self, buffer: &mut [u8]) {
        let amplitude = self.amplitude.load(Ordering::SeqCst);
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample = if i % 2 == 0 {
                128 + amplitude
            } else {
                128 - amplitude
            };
        }
    }
}
