//! Feature Extractor
//!
//! Deterministic, pure function of a buffer snapshot plus the channel's
//! last observed center frequency.

use super::stats::{self, DEFAULT_ENTROPY_BINS};
use super::vector::FeatureVector;
use crate::logic::buffer::BufferSnapshot;

#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    entropy_bins: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ENTROPY_BINS)
    }
}

impl FeatureExtractor {
    pub fn new(entropy_bins: usize) -> Self {
        Self {
            entropy_bins: entropy_bins.max(2),
        }
    }

    pub fn entropy_bins(&self) -> usize {
        self.entropy_bins
    }

    /// `None` when the snapshot holds fewer samples than its minimum
    pub fn extract(&self, snapshot: &BufferSnapshot, last_center_hz: u64) -> Option<FeatureVector> {
        if !snapshot.is_sufficient() || snapshot.is_empty() {
            return None;
        }

        let samples = snapshot.as_slice();
        let powers: Vec<f64> = samples.iter().map(|s| s.power_dbm).collect();
        let first = samples.first()?;
        let newest = samples.last()?;

        let (min, max) = stats::min_max(&powers);
        let duration_s = (newest.timestamp - first.timestamp).max(0.0);

        Some(FeatureVector {
            mean: stats::mean(&powers),
            std_dev: stats::population_std_dev(&powers),
            min,
            max,
            entropy: stats::normalized_entropy(&powers, self.entropy_bins),
            duration_s,
            rate_of_change: stats::rate_of_change(
                (first.timestamp, first.power_dbm),
                (newest.timestamp, newest.power_dbm),
            ),
            center_hz: newest.frequency_hz,
            delta_freq_hz: frequency_delta(newest.frequency_hz, last_center_hz),
            sample_count: samples.len(),
        })
    }
}

fn frequency_delta(current_hz: u64, previous_hz: u64) -> i64 {
    if current_hz >= previous_hz {
        i64::try_from(current_hz - previous_hz).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous_hz - current_hz).map(|d| -d).unwrap_or(i64::MIN)
    }
}
