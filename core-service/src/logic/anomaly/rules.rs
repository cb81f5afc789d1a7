//! Anomaly Rules & Thresholds
//!
//! Documented defaults and the runtime-configurable threshold set.
//! No classification logic here - constants and config only.

use serde::{Deserialize, Serialize};

use crate::logic::error::{MonitorError, MonitorResult};

// ============================================================================
// DEFAULTS
// ============================================================================

/// Mean power at or above this is "strong" (dBm)
pub const DEFAULT_RSSI_HIGH_DBM: f64 = -50.0;

/// Mean power at or below this is "weak" (dBm)
pub const DEFAULT_RSSI_LOW_DBM: f64 = -90.0;

/// Normalized entropy considered high
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 0.8;

/// Window length the buffer must cover (s)
pub const DEFAULT_DURATION_THRESHOLD_S: f64 = 2.0;

/// Minimum template similarity for a Pattern match
pub const DEFAULT_PATTERN_THRESHOLD: f64 = 0.7;

/// Center frequency moves beyond this are a FrequencyShift (Hz)
pub const DEFAULT_FREQ_SHIFT_THRESHOLD_HZ: u64 = 100_000;

/// Shift that maps to confidence 1.0 (Hz)
pub const DEFAULT_MAX_EXPECTED_SHIFT_HZ: u64 = 1_000_000;

/// std_dev above this multiple of the channel baseline is a StaticBurst
pub const DEFAULT_BURST_MULTIPLIER: f64 = 3.0;

/// Cycles of std_dev history averaged into the burst baseline
pub const DEFAULT_BURST_BASELINE_WINDOW: usize = 10;

/// Baseline is not trusted until it holds this many cycles
pub const MIN_BASELINE_CYCLES: usize = 3;

/// Consecutive StaticBurst cycles after which the raised level becomes the new baseline
pub const SUSTAINED_BURST_CYCLES: usize = 5;

/// Floor applied to the baseline std_dev so a dead-flat channel still compares (dB)
pub const DEFAULT_MIN_BASELINE_STD_DB: f64 = 0.1;

/// dB of margin over a power threshold worth one full confidence point
pub const CONFIDENCE_DB_SCALE: f64 = 10.0;

fn default_freq_shift_threshold_hz() -> u64 {
    DEFAULT_FREQ_SHIFT_THRESHOLD_HZ
}

fn default_max_expected_shift_hz() -> u64 {
    DEFAULT_MAX_EXPECTED_SHIFT_HZ
}

fn default_burst_multiplier() -> f64 {
    DEFAULT_BURST_MULTIPLIER
}

fn default_burst_baseline_window() -> usize {
    DEFAULT_BURST_BASELINE_WINDOW
}

fn default_min_baseline_std_db() -> f64 {
    DEFAULT_MIN_BASELINE_STD_DB
}

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

/// Detection thresholds. The first five are required in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    pub rssi_threshold_high: f64,
    pub rssi_threshold_low: f64,
    pub entropy_threshold: f64,
    /// Seconds of history each channel buffer holds
    pub duration_threshold: f64,
    pub pattern_threshold: f64,
    #[serde(default = "default_freq_shift_threshold_hz")]
    pub freq_shift_threshold_hz: u64,
    #[serde(default = "default_max_expected_shift_hz")]
    pub max_expected_shift_hz: u64,
    #[serde(default = "default_burst_multiplier")]
    pub burst_multiplier: f64,
    #[serde(default = "default_burst_baseline_window")]
    pub burst_baseline_window: usize,
    #[serde(default = "default_min_baseline_std_db")]
    pub min_baseline_std_db: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            rssi_threshold_high: DEFAULT_RSSI_HIGH_DBM,
            rssi_threshold_low: DEFAULT_RSSI_LOW_DBM,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            duration_threshold: DEFAULT_DURATION_THRESHOLD_S,
            pattern_threshold: DEFAULT_PATTERN_THRESHOLD,
            freq_shift_threshold_hz: DEFAULT_FREQ_SHIFT_THRESHOLD_HZ,
            max_expected_shift_hz: DEFAULT_MAX_EXPECTED_SHIFT_HZ,
            burst_multiplier: DEFAULT_BURST_MULTIPLIER,
            burst_baseline_window: DEFAULT_BURST_BASELINE_WINDOW,
            min_baseline_std_db: DEFAULT_MIN_BASELINE_STD_DB,
        }
    }
}

impl AnomalyThresholds {
    pub fn validate(&self) -> MonitorResult<()> {
        let finite = [
            ("rssi_threshold_high", self.rssi_threshold_high),
            ("rssi_threshold_low", self.rssi_threshold_low),
            ("entropy_threshold", self.entropy_threshold),
            ("duration_threshold", self.duration_threshold),
            ("pattern_threshold", self.pattern_threshold),
            ("burst_multiplier", self.burst_multiplier),
            ("min_baseline_std_db", self.min_baseline_std_db),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MonitorError::Config(format!("{} must be finite, got {}", name, value)));
        }

        if self.rssi_threshold_low >= self.rssi_threshold_high {
            return Err(MonitorError::Config(format!(
                "rssi_threshold_low ({}) must be below rssi_threshold_high ({})",
                self.rssi_threshold_low, self.rssi_threshold_high
            )));
        }
        for (name, value) in [
            ("entropy_threshold", self.entropy_threshold),
            ("pattern_threshold", self.pattern_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.duration_threshold <= 0.0 {
            return Err(MonitorError::Config(format!(
                "duration_threshold must be positive, got {}",
                self.duration_threshold
            )));
        }
        if self.burst_multiplier <= 1.0 {
            return Err(MonitorError::Config(format!(
                "burst_multiplier must exceed 1.0, got {}",
                self.burst_multiplier
            )));
        }
        if self.burst_baseline_window < MIN_BASELINE_CYCLES {
            return Err(MonitorError::Config(format!(
                "burst_baseline_window must be at least {}, got {}",
                MIN_BASELINE_CYCLES, self.burst_baseline_window
            )));
        }
        if self.max_expected_shift_hz == 0 {
            return Err(MonitorError::Config("max_expected_shift_hz must be positive".into()));
        }
        if self.min_baseline_std_db <= 0.0 {
            return Err(MonitorError::Config(format!(
                "min_baseline_std_db must be positive, got {}",
                self.min_baseline_std_db
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AnomalyThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_rssi_thresholds_rejected() {
        let t = AnomalyThresholds {
            rssi_threshold_low: -40.0,
            ..Default::default()
        };
        assert!(matches!(t.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_entropy_threshold_out_of_range_rejected() {
        let t = AnomalyThresholds {
            entropy_threshold: 1.5,
            ..Default::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_required_fields_enforced_by_serde() {
        let missing = r#"{"rssi_threshold_high": -50, "rssi_threshold_low": -90}"#;
        assert!(serde_json::from_str::<AnomalyThresholds>(missing).is_err());

        let minimal = r#"{
            "rssi_threshold_high": -50,
            "rssi_threshold_low": -90,
            "entropy_threshold": 0.8,
            "duration_threshold": 2.0,
            "pattern_threshold": 0.7
        }"#;
        let t: AnomalyThresholds = serde_json::from_str(minimal).unwrap();
        assert_eq!(t.freq_shift_threshold_hz, 100_000);
        assert_eq!(t.burst_baseline_window, 10);
    }
}
