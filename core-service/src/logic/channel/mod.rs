//! Channel Module - one monitored frequency
//!
//! A `FrequencyChannel` owns its windowed buffer, its variance baseline
//! and a plain copy of its last classification (`ChannelSummary::last_event`).
//! Created once per configured frequency and kept for the process lifetime.

pub mod baseline;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use baseline::VarianceBaseline;

use crate::logic::anomaly::{AnomalyClassifier, AnomalyEvent, Classification, RuleInput};
use crate::logic::buffer::{BufferSnapshot, SharedBuffer, WindowedBuffer};
use crate::logic::error::MonitorResult;
use crate::logic::features::{FeatureExtractor, FeatureVector};
use crate::logic::source::Sample;

// ============================================================================
// SUMMARY (shared with status readers)
// ============================================================================

/// Per-channel counters and last results, readable from any thread
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub frequency_hz: u64,
    pub cycles: u64,
    pub anomalies: u64,
    pub skipped: u64,
    pub insufficient: u64,
    pub rejected: u64,
    pub baseline_std: Option<f64>,
    pub baseline_cycles: usize,
    pub last_center_hz: u64,
    pub last_features: Option<FeatureVector>,
    pub last_event: Option<AnomalyEvent>,
    pub last_error: Option<String>,
}

/// Read-only handle onto a channel for status queries
#[derive(Debug, Clone)]
pub struct ChannelView {
    pub frequency_hz: u64,
    buffer: SharedBuffer,
    summary: Arc<RwLock<ChannelSummary>>,
}

impl ChannelView {
    pub fn snapshot(&self) -> BufferSnapshot {
        self.buffer.snapshot()
    }

    pub fn buffer_status(&self) -> crate::logic::buffer::BufferStatus {
        self.buffer.status()
    }

    pub fn summary(&self) -> ChannelSummary {
        self.summary.read().clone()
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

pub struct FrequencyChannel {
    frequency_hz: u64,
    buffer: SharedBuffer,
    baseline: VarianceBaseline,
    last_center_hz: u64,
    summary: Arc<RwLock<ChannelSummary>>,
}

impl FrequencyChannel {
    pub fn new(frequency_hz: u64, capacity: usize, min_samples: usize, baseline_window: usize) -> Self {
        let summary = ChannelSummary {
            frequency_hz,
            last_center_hz: frequency_hz,
            ..Default::default()
        };
        Self {
            frequency_hz,
            buffer: SharedBuffer::new(WindowedBuffer::new(capacity, min_samples)),
            baseline: VarianceBaseline::new(baseline_window),
            last_center_hz: frequency_hz,
            summary: Arc::new(RwLock::new(summary)),
        }
    }

    pub fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    pub fn view(&self) -> ChannelView {
        ChannelView {
            frequency_hz: self.frequency_hz,
            buffer: self.buffer.clone(),
            summary: Arc::clone(&self.summary),
        }
    }

    /// Push a complete read into the window
    pub fn ingest(&self, samples: &[Sample]) {
        self.buffer.extend(samples);
    }

    /// Snapshot and feature vector, or `None` while the window is short
    fn extract(&self, extractor: &FeatureExtractor) -> Option<(BufferSnapshot, FeatureVector)> {
        let snapshot = self.buffer.snapshot();
        let features = extractor.extract(&snapshot, self.last_center_hz)?;
        Some((snapshot, features))
    }

    /// Run the rules over an extracted window and fold the result into channel state
    fn classify(
        &mut self,
        classifier: &AnomalyClassifier,
        snapshot: &BufferSnapshot,
        features: &FeatureVector,
        timestamp: f64,
    ) -> MonitorResult<Vec<AnomalyEvent>> {
        let input = RuleInput {
            features,
            samples: snapshot.as_slice(),
            baseline_std: self.baseline.current(),
        };

        match classifier.classify(&input, self.frequency_hz, timestamp) {
            Ok(events) => {
                self.record(features, &events);
                Ok(events)
            }
            Err(e) => {
                let mut summary = self.summary.write();
                summary.rejected += 1;
                summary.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Extract + classify in one step.
    ///
    /// `on_extracted` runs between the two, once features exist.
    pub fn evaluate(
        &mut self,
        extractor: &FeatureExtractor,
        classifier: &AnomalyClassifier,
        timestamp: f64,
        on_extracted: impl FnOnce(),
    ) -> MonitorResult<Classification> {
        match self.extract(extractor) {
            Some((snapshot, features)) => {
                on_extracted();
                let events = self.classify(classifier, &snapshot, &features, timestamp)?;
                Ok(Classification::Evaluated { features, events })
            }
            None => Ok(self.record_insufficient()),
        }
    }

    fn record_insufficient(&self) -> Classification {
        let snapshot = self.buffer.snapshot();
        self.summary.write().insufficient += 1;
        Classification::InsufficientData {
            have: snapshot.len(),
            need: snapshot.min_samples(),
        }
    }

    /// Channel visit abandoned (hardware fault, timeout)
    pub fn record_skip(&self, reason: &str) {
        let mut summary = self.summary.write();
        summary.skipped += 1;
        summary.last_error = Some(reason.to_string());
    }

    fn record(&mut self, features: &FeatureVector, events: &[AnomalyEvent]) {
        if !AnomalyClassifier::is_burst(events) {
            self.baseline.observe(features.std_dev);
        } else if self.baseline.observe_burst(features.std_dev) {
            log::info!(
                "{} Hz: noise level stayed raised, baseline reset to {:.2} dB",
                self.frequency_hz,
                self.baseline.current().unwrap_or(features.std_dev)
            );
        }
        self.last_center_hz = features.center_hz;

        let mut summary = self.summary.write();
        summary.cycles += 1;
        summary.anomalies += events.len() as u64;
        summary.baseline_std = self.baseline.current();
        summary.baseline_cycles = self.baseline.cycles();
        summary.last_center_hz = self.last_center_hz;
        summary.last_features = Some(*features);
        summary.last_error = None;
        if let Some(last) = events.last() {
            summary.last_event = Some(last.clone());
        }
    }
}
