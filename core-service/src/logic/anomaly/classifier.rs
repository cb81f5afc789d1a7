//! Anomaly Classifier
//!
//! Classification logic only. Input: a validated `FeatureVector` plus the
//! window it came from and the channel's std_dev baseline. Output: every
//! `AnomalyEvent` whose rule matched, in `RULES` order. Rules are
//! independent; nothing short-circuits.

use uuid::Uuid;

use super::pattern::{self, PatternTemplate};
use super::rules::{AnomalyThresholds, CONFIDENCE_DB_SCALE};
use super::types::{AnomalyEvent, AnomalyType};
use crate::logic::error::MonitorResult;
use crate::logic::features::FeatureVector;
use crate::logic::source::Sample;

// ============================================================================
// RULE PLUMBING
// ============================================================================

/// Everything a rule may look at for one channel window
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub features: &'a FeatureVector,
    /// Window the features were computed from (oldest first)
    pub samples: &'a [Sample],
    /// Mean std_dev of recent non-burst cycles, once trusted
    pub baseline_std: Option<f64>,
}

/// A matched rule before it becomes an event
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub confidence: f64,
    pub detail: Option<String>,
}

impl RuleHit {
    fn new(confidence: f64) -> Self {
        Self {
            confidence,
            detail: None,
        }
    }

    fn with_detail(confidence: f64, detail: String) -> Self {
        Self {
            confidence,
            detail: Some(detail),
        }
    }
}

type Rule = fn(&AnomalyClassifier, &RuleInput<'_>) -> Option<RuleHit>;

/// Fixed evaluation and emission order
const RULES: [(AnomalyType, Rule); 5] = [
    (AnomalyType::GhostEcho, AnomalyClassifier::ghost_echo),
    (AnomalyType::VoidPulse, AnomalyClassifier::void_pulse),
    (AnomalyType::StaticBurst, AnomalyClassifier::static_burst),
    (AnomalyType::FrequencyShift, AnomalyClassifier::frequency_shift),
    (AnomalyType::Pattern, AnomalyClassifier::pattern_match),
];

/// Clip to [0, 1]; anything non-finite becomes 0
fn clip_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

#[derive(Debug, Clone)]
pub struct AnomalyClassifier {
    thresholds: AnomalyThresholds,
    patterns: Vec<PatternTemplate>,
}

impl AnomalyClassifier {
    pub fn new(thresholds: AnomalyThresholds, patterns: Vec<PatternTemplate>) -> Self {
        Self { thresholds, patterns }
    }

    /// Run every rule; fails only on a malformed feature vector
    pub fn classify(
        &self,
        input: &RuleInput<'_>,
        frequency_hz: u64,
        timestamp: f64,
    ) -> MonitorResult<Vec<AnomalyEvent>> {
        input.features.validate()?;

        Ok(RULES
            .iter()
            .filter_map(|(anomaly_type, rule)| {
                rule(self, input).map(|hit| AnomalyEvent {
                    id: Uuid::new_v4(),
                    anomaly_type: *anomaly_type,
                    confidence: clip_confidence(hit.confidence),
                    frequency_hz,
                    timestamp,
                    detail: hit.detail,
                    feature_snapshot: *input.features,
                })
            })
            .collect())
    }

    /// Returns true if `events` contains a StaticBurst
    pub fn is_burst(events: &[AnomalyEvent]) -> bool {
        events.iter().any(|e| e.anomaly_type == AnomalyType::StaticBurst)
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    fn ghost_echo(&self, input: &RuleInput<'_>) -> Option<RuleHit> {
        let f = input.features;
        let t = &self.thresholds;
        (f.mean >= t.rssi_threshold_high && f.entropy >= t.entropy_threshold).then(|| {
            RuleHit::new((f.mean - t.rssi_threshold_high) / CONFIDENCE_DB_SCALE + f.entropy)
        })
    }

    fn void_pulse(&self, input: &RuleInput<'_>) -> Option<RuleHit> {
        let f = input.features;
        let t = &self.thresholds;
        (f.mean <= t.rssi_threshold_low && f.entropy >= t.entropy_threshold).then(|| {
            RuleHit::new((t.rssi_threshold_low - f.mean) / CONFIDENCE_DB_SCALE + f.entropy)
        })
    }

    fn static_burst(&self, input: &RuleInput<'_>) -> Option<RuleHit> {
        let t = &self.thresholds;
        let baseline = input.baseline_std?.max(t.min_baseline_std_db);
        let ratio = input.features.std_dev / baseline;
        (input.features.std_dev > t.burst_multiplier * baseline).then(|| {
            RuleHit::with_detail(
                ratio / (2.0 * t.burst_multiplier),
                format!("std_dev {:.2} dB is {:.1}x baseline {:.2} dB", input.features.std_dev, ratio, baseline),
            )
        })
    }

    fn frequency_shift(&self, input: &RuleInput<'_>) -> Option<RuleHit> {
        let t = &self.thresholds;
        let shift = input.features.delta_freq_hz.unsigned_abs();
        (shift > t.freq_shift_threshold_hz).then(|| {
            RuleHit::with_detail(
                shift as f64 / t.max_expected_shift_hz as f64,
                format!("center moved {} Hz", input.features.delta_freq_hz),
            )
        })
    }

    fn pattern_match(&self, input: &RuleInput<'_>) -> Option<RuleHit> {
        if self.patterns.is_empty() {
            return None;
        }
        let powers: Vec<f64> = input.samples.iter().map(|s| s.power_dbm).collect();
        let (template, score) = pattern::best_match(&powers, &self.patterns)?;
        (score >= self.thresholds.pattern_threshold)
            .then(|| RuleHit::with_detail(score, format!("matched template '{}'", template.name)))
    }
}
