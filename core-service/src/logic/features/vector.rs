//! Feature Vector - per-cycle statistics of one channel window
//!
//! Ephemeral: recomputed every scan cycle and consumed immediately by the
//! classifier. A copy rides along in each `AnomalyEvent` as its snapshot.

use serde::{Deserialize, Serialize};

use crate::logic::error::{MonitorError, MonitorResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean power (dBm)
    pub mean: f64,
    /// Population standard deviation (dB)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Normalized Shannon entropy of the binned powers, 0.0 - 1.0
    pub entropy: f64,
    /// Time span covered by the window (s)
    pub duration_s: f64,
    /// Short-term rate of change across the window (dB/s)
    pub rate_of_change: f64,
    /// Effective center frequency of the newest sample (Hz)
    pub center_hz: u64,
    /// Effective center minus the last observed center (Hz)
    pub delta_freq_hz: i64,
    pub sample_count: usize,
}

impl FeatureVector {
    /// Reject vectors carrying NaN/inf before they reach a confidence formula
    pub fn validate(&self) -> MonitorResult<()> {
        let fields = [
            ("mean", self.mean),
            ("std_dev", self.std_dev),
            ("min", self.min),
            ("max", self.max),
            ("entropy", self.entropy),
            ("duration_s", self.duration_s),
            ("rate_of_change", self.rate_of_change),
        ];

        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(MonitorError::Classification(format!(
                "feature '{}' is not finite ({})",
                name, value
            )));
        }
        if self.std_dev < 0.0 {
            return Err(MonitorError::Classification(format!(
                "negative std_dev ({})",
                self.std_dev
            )));
        }
        if !(0.0..=1.0).contains(&self.entropy) {
            return Err(MonitorError::Classification(format!(
                "entropy out of range ({})",
                self.entropy
            )));
        }
        Ok(())
    }

    /// The mean/std/min/max subset published in output records
    pub fn statistics(&self) -> Statistics {
        Statistics {
            mean: self.mean,
            std: self.std_dev,
            min: self.min,
            max: self.max,
        }
    }
}

/// Statistics block of an output record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
pub(crate) fn test_vector(mean: f64, entropy: f64) -> FeatureVector {
    FeatureVector {
        mean,
        std_dev: 0.0,
        min: mean,
        max: mean,
        entropy,
        duration_s: 0.4,
        rate_of_change: 0.0,
        center_hz: 433_920_000,
        delta_freq_hz: 0,
        sample_count: 5,
    }
}
