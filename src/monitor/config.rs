//! Monitor Configuration
//!
//! Observer cadences, thresholds and teardown grace.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{MonitorError, MonitorResult};

/// Smallest analyser transform size the host accepts
pub const MIN_FFT_SIZE: usize = 32;

/// Largest analyser transform size the host accepts
pub const MAX_FFT_SIZE: usize = 32768;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Clock tick interval (default: 1000)
    #[serde(default = "default_clock_interval_ms")]
    pub clock_interval_ms: u64,

    /// Viewport poll interval (default: 500)
    #[serde(default = "default_viewport_interval_ms")]
    pub viewport_interval_ms: u64,

    /// Clipboard poll interval (default: 500)
    #[serde(default = "default_clipboard_interval_ms")]
    pub clipboard_interval_ms: u64,

    /// Consecutive clipboard failures tolerated before the degraded message (default: 3)
    #[serde(default = "default_clipboard_error_threshold")]
    pub clipboard_error_threshold: u32,

    /// Start clipboard polling at bootstrap rather than on the first manual request
    /// (default: true)
    #[serde(default = "default_true")]
    pub clipboard_autostart: bool,

    /// RMS to percent multiplier (default: 2.0)
    #[serde(default = "default_meter_gain")]
    pub meter_gain: f64,

    /// Analyser transform size (default: 256)
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    /// How long teardown waits for observers to stop (default: 2000)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_clock_interval_ms() -> u64 {
    1000
}

fn default_viewport_interval_ms() -> u64 {
    500
}

fn default_clipboard_interval_ms() -> u64 {
    500
}

fn default_clipboard_error_threshold() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_meter_gain() -> f64 {
    2.0
}

fn default_fft_size() -> usize {
    256
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            clock_interval_ms: default_clock_interval_ms(),
            viewport_interval_ms: default_viewport_interval_ms(),
            clipboard_interval_ms: default_clipboard_interval_ms(),
            clipboard_error_threshold: default_clipboard_error_threshold(),
            clipboard_autostart: default_true(),
            meter_gain: default_meter_gain(),
            fft_size: default_fft_size(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl MonitorConfig {
    /// Validate configuration
    pub fn validate(&self) -> MonitorResult<()> {
        let intervals = [
            ("clock_interval_ms", self.clock_interval_ms),
            ("viewport_interval_ms", self.viewport_interval_ms),
            ("clipboard_interval_ms", self.clipboard_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(MonitorError::Config(format!("{} must be positive", name)));
            }
        }

        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(MonitorError::Config(format!(
                "fft_size must be a power of two in {}..={}, got {}",
                MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
            )));
        }

        if !(self.meter_gain.is_finite() && self.meter_gain > 0.0) {
            return Err(MonitorError::Config(format!(
                "meter_gain must be positive, got {}",
                self.meter_gain
            )));
        }

        Ok(())
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }

    pub fn viewport_interval(&self) -> Duration {
        Duration::from_millis(self.viewport_interval_ms)
    }

    pub fn clipboard_interval(&self) -> Duration {
        Duration::from_millis(self.clipboard_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clock_interval(), Duration::from_secs(1));
        assert_eq!(config.viewport_interval(), Duration::from_millis(500));
        assert_eq!(config.clipboard_error_threshold, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"meter_gain": 3.5}"#).unwrap();
        assert_eq!(config.meter_gain, 3.5);
        assert_eq!(config.fft_size, 256);
        assert!(config.clipboard_autostart);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = MonitorConfig {
            viewport_interval_ms: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("viewport_interval_ms"));
    }

    #[test]
    fn test_fft_size_must_be_power_of_two() {
        for bad in [0, 16, 300, 65536] {
            let config = MonitorConfig {
                fft_size: bad,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "fft_size {} accepted", bad);
        }
        let config = MonitorConfig {
            fft_size: 2048,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gain_must_be_positive() {
        let config = MonitorConfig {
            meter_gain: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
