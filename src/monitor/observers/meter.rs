//! Microphone level meter
//!
//! Streaming observer synchronized to the host's frame cadence. Every frame it reads
//! the analyser into a buffer it owns, computes the RMS of the samples normalized to
//! [-1, 1] and publishes it to the level indicator. It re-arms for the next frame
//! unless cancellation was observed.

use std::sync::Arc;

use super::{await_or_cancel, ObserverLifetime};
use crate::monitor::context::MonitorContext;
use crate::monitor::errors::MonitorError;
use crate::monitor::host::{AudioAnalyser, Capability};
use crate::monitor::registry::ObserverId;
use crate::monitor::sink::keys;

pub const NO_FRAMES_MESSAGE: &str = "Frame callbacks not supported";

const MIDPOINT: f64 = 128.0;

/// Map unsigned 8-bit time-domain samples to a 0-100 level.
///
/// Non-decreasing in the RMS deviation from the midpoint and clamped at 100. An empty
/// buffer is silence.
pub fn level_percent(samples: &[u8], gain: f64) -> u8 {
    if samples.is_empty() {
        return 0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let v = (f64::from(s) - MIDPOINT) / MIDPOINT;
            v * v
        })
        .sum();
    let rms = (sum / samples.len() as f64).sqrt();
    let percent = (rms * 100.0 * gain).floor();
    if percent.is_nan() || percent <= 0.0 {
        0
    } else if percent >= 100.0 {
        100
    } else {
        percent as u8
    }
}

/// Sample buffer reused across every frame
#[derive(Debug)]
pub struct AudioAnalysisBuffer {
    samples: Vec<u8>,
}

impl AudioAnalysisBuffer {
    /// Buffer sized for one analyser read
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![MIDPOINT as u8; len],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Overwrite the buffer with the analyser's current time-domain data
    pub fn refresh(&mut self, analyser: &mut dyn AudioAnalyser) {
        analyser.time_domain_data(&mut self.samples);
    }

    pub fn level_percent(&self, gain: f64) -> u8 {
        level_percent(&self.samples, gain)
    }
}

pub async fn run(ctx: Arc<MonitorContext>, mut analyser: Box<dyn AudioAnalyser>) {
    let lifetime = ObserverLifetime::begin(&ctx, ObserverId::Meter);

    if !ctx.host().supports(Capability::FrameCallbacks) {
        ctx.publish(keys::MIC_STATUS, NO_FRAMES_MESSAGE);
        ctx.set_enabled(keys::MIC_VOLUME, false);
        lifetime.degraded("frame callbacks unsupported");
        return;
    }

    let gain = ctx.config().meter_gain;
    let mut buffer = AudioAnalysisBuffer::new(analyser.frequency_bin_count());

    loop {
        if ctx.is_cancelled() {
            break;
        }

        let (callback, frame) = ctx.bridge().frame(ObserverId::Meter);
        ctx.host().request_frame(callback);

        match await_or_cancel(&ctx, frame).await {
            None => break,
            Some(Ok(_timestamp)) => {}
            Some(Err(MonitorError::Released)) => {
                lifetime.degraded("frame callback dropped by host");
                break;
            }
            Some(Err(e)) => {
                lifetime.degraded(&e.to_string());
                break;
            }
        }

        buffer.refresh(analyser.as_mut());
        ctx.metrics().increment_frames();
        ctx.publish_level(keys::MIC_VOLUME, buffer.level_percent(gain));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_zero() {
        assert_eq!(level_percent(&[128; 64], 2.0), 0);
        assert_eq!(level_percent(&[], 2.0), 0);
    }

    #[test]
    fn test_full_scale_clamps_to_100() {
        let loud: Vec<u8> = (0..64).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
        assert_eq!(level_percent(&loud, 2.0), 100);
    }

    #[test]
    fn test_known_level() {
        // Constant deviation of 32/128 = 0.25 -> 25% * 2.0 gain = 50
        assert_eq!(level_percent(&[160; 16], 2.0), 50);
        assert_eq!(level_percent(&[96; 16], 2.0), 50);
        assert_eq!(level_percent(&[160; 16], 1.0), 25);
    }

    #[test]
    fn test_monotonic_in_deviation() {
        let mut previous = 0;
        for deviation in 0..=127u8 {
            let level = level_percent(&[128 + deviation; 32], 2.0);
            assert!(level >= previous, "deviation {} dropped to {}", deviation, level);
            assert!(level <= 100);
            previous = level;
        }
    }

    struct Constant(u8);

    impl AudioAnalyser for Constant {
        fn frequency_bin_count(&self) -> usize {
            8
        }

        fn time_domain_data(&mut self, buffer: &mut [u8]) {
            buffer.fill(self.0);
        }
    }

    #[test]
    fn test_buffer_reused_across_reads() {
        let mut analyser = Constant(160);
        let mut buffer = AudioAnalysisBuffer::new(analyser.frequency_bin_count());
        assert_eq!(buffer.level_percent(2.0), 0);
        buffer.refresh(&mut analyser);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.level_percent(2.0), 50);
    }
}
