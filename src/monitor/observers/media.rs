//! Camera and microphone
//!
//! One-shot capture request with a manual retry control. A granted stream is attached
//! to the video surface, the level meter is started on its audio, and playback is
//! attempted. Denial and refused autoplay both reveal the start control instead of
//! looping.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use super::{await_or_cancel, meter, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::errors::{HostError, MonitorError};
use crate::monitor::host::{Capability, MediaStream};
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;
use crate::observability::{log_event_with_fields, Event};

pub const UNSUPPORTED_MESSAGE: &str = "Camera/microphone not supported";
pub const CAMERA_ACTIVE: &str = "Camera active";
pub const LISTENING: &str = "Listening...";
pub const NO_AUDIO_CONTEXT: &str = "No AudioContext support";
pub const NO_AUDIO_TRACK: &str = "No audio track";
pub const CAMERA_DENIED: &str = "Camera access denied";
pub const MICROPHONE_DENIED: &str = "Microphone access denied";
pub const MANUAL_START: &str = "Click 'Start Camera' to begin";

/// Media observer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Idle,
    Unsupported,
    Requesting,
    Denied,
    AwaitManualStart,
    Playing,
}

impl MediaState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaState::Idle => "idle",
            MediaState::Unsupported => "unsupported",
            MediaState::Requesting => "requesting",
            MediaState::Denied => "denied",
            MediaState::AwaitManualStart => "await_manual_start",
            MediaState::Playing => "playing",
        }
    }
}

/// What a manual start does in each state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAction {
    RequestCapture,
    Play,
    Ignore,
}

impl MediaState {
    pub fn on_manual_start(self) -> StartAction {
        match self {
            MediaState::Idle | MediaState::Denied => StartAction::RequestCapture,
            MediaState::AwaitManualStart => StartAction::Play,
            MediaState::Unsupported | MediaState::Requesting | MediaState::Playing => {
                StartAction::Ignore
            }
        }
    }
}

struct MediaObserver {
    ctx: Arc<MonitorContext>,
    state: MediaState,
    lifetime: ObserverLifetime,
}

impl MediaObserver {
    fn transition(&mut self, next: MediaState) {
        log_event_with_fields(
            Event::MediaState,
            &[("from", self.state.as_str()), ("to", next.as_str())],
        );
        self.state = next;
    }

    fn publish_unsupported(&mut self) {
        self.ctx.publish(keys::CAMERA_STATUS, UNSUPPORTED_MESSAGE);
        self.ctx.publish(keys::MIC_STATUS, UNSUPPORTED_MESSAGE);
        self.lifetime.degraded("media capture unsupported");
        self.transition(MediaState::Unsupported);
    }

    /// Request capture. Returns false if cancellation was observed.
    async fn request_capture(&mut self) -> bool {
        self.ctx.set_visible(keys::CAMERA_START, false);
        self.transition(MediaState::Requesting);

        let (pending, completion) = self.ctx.bridge().pending::<MediaStream>(ObserverId::Media);
        self.ctx.host().request_media(pending);

        match await_or_cancel(&self.ctx, completion).await {
            None => false,
            Some(Ok(stream)) => self.activate(stream).await,
            Some(Err(MonitorError::Host(e))) if e.is_unsupported() => {
                self.publish_unsupported();
                true
            }
            Some(Err(e)) => {
                self.ctx.publish(keys::CAMERA_STATUS, CAMERA_DENIED);
                self.ctx.publish(keys::MIC_STATUS, MICROPHONE_DENIED);
                self.ctx.set_visible(keys::CAMERA_START, true);
                self.lifetime.degraded(&e.to_string());
                self.transition(MediaState::Denied);
                true
            }
        }
    }

    async fn activate(&mut self, stream: MediaStream) -> bool {
        self.ctx.host().attach_video(&stream);
        self.ctx.publish(keys::CAMERA_STATUS, CAMERA_ACTIVE);
        self.start_meter(&stream);
        self.play().await
    }

    /// Start the level meter, or show why the microphone is not being listened to.
    ///
    /// `micStatus` reads "Listening..." and `micVolume` is enabled only while a meter runs.
    fn start_meter(&self, stream: &MediaStream) {
        if !stream.has_audio {
            self.microphone_unavailable(NO_AUDIO_TRACK, "stream has no audio track");
            return;
        }
        let analyser = if self.ctx.host().supports(Capability::AudioAnalysis) {
            self.ctx
                .host()
                .create_analyser(stream, self.ctx.config().fft_size)
        } else {
            Err(HostError::unsupported("AudioContext"))
        };

        match analyser {
            Ok(analyser) => {
                self.ctx.publish(keys::MIC_STATUS, LISTENING);
                self.ctx.set_enabled(keys::MIC_VOLUME, true);
                self.ctx
                    .spawn_observer(ObserverId::Meter, meter::run(self.ctx.clone(), analyser));
            }
            Err(e) => self.microphone_unavailable(NO_AUDIO_CONTEXT, &e.to_string()),
        }
    }

    fn microphone_unavailable(&self, message: &str, reason: &str) {
        self.ctx.publish(keys::MIC_STATUS, message);
        self.ctx.set_enabled(keys::MIC_VOLUME, false);
        self.lifetime.degraded(reason);
    }

    /// Attempt playback. Returns false if cancellation was observed.
    async fn play(&mut self) -> bool {
        self.ctx.set_visible(keys::CAMERA_START, false);

        let (pending, completion) = self.ctx.bridge().pending::<()>(ObserverId::Media);
        self.ctx.host().play_video(pending);

        match await_or_cancel(&self.ctx, completion).await {
            None => false,
            Some(Ok(())) => {
                self.transition(MediaState::Playing);
                true
            }
            Some(Err(_)) => {
                self.ctx.set_visible(keys::CAMERA_START, true);
                self.ctx.publish(keys::CAMERA_STATUS, MANUAL_START);
                self.transition(MediaState::AwaitManualStart);
                true
            }
        }
    }
}

/// Run the media observer. `starts` carries presses of the start control.
pub async fn run(ctx: Arc<MonitorContext>, mut starts: UnboundedReceiver<()>) {
    let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Media);
    let mut observer = MediaObserver {
        ctx: ctx.clone(),
        state: MediaState::Idle,
        lifetime,
    };

    if !ctx.host().supports(Capability::MediaCapture) {
        observer.publish_unsupported();
        return;
    }

    if !observer.request_capture().await {
        return;
    }

    loop {
        if ctx.is_cancelled() || observer.state == MediaState::Unsupported {
            break;
        }

        let start = tokio::select! {
            _ = ctx.cancellation().cancelled() => break,
            start = starts.recv() => start,
        };
        // Control gone: nothing can leave the current state any more.
        let Some(()) = start else {
            ctx.cancellation().cancelled().await;
            break;
        };

        let still_running = match observer.state.on_manual_start() {
            StartAction::RequestCapture => observer.request_capture().await,
            StartAction::Play => observer.play().await,
            StartAction::Ignore => true,
        };
        if !still_running {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_start_transitions() {
        assert_eq!(
            MediaState::Denied.on_manual_start(),
            StartAction::RequestCapture
        );
        assert_eq!(
            MediaState::AwaitManualStart.on_manual_start(),
            StartAction::Play
        );
        assert_eq!(MediaState::Playing.on_manual_start(), StartAction::Ignore);
        assert_eq!(MediaState::Unsupported.on_manual_start(), StartAction::Ignore);
        assert_eq!(MediaState::Requesting.on_manual_start(), StartAction::Ignore);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(MediaState::AwaitManualStart.as_str(), "await_manual_start");
    }
}
