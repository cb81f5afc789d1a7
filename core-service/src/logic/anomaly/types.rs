//! Anomaly Types
//!
//! Core types for anomaly classification. Data structures only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::features::FeatureVector;

// ============================================================================
// ANOMALY TYPE
// ============================================================================

/// Anomaly categories, in rule evaluation (and emission) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// Strong, high-entropy transmission
    GhostEcho,
    /// Weak but high-entropy transmission
    VoidPulse,
    /// Sudden variance spike over the channel baseline
    StaticBurst,
    /// Effective center frequency moved
    #[serde(rename = "freq_shift")]
    FrequencyShift,
    /// Power shape matches a known template
    Pattern,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::GhostEcho => "ghost_echo",
            AnomalyType::VoidPulse => "void_pulse",
            AnomalyType::StaticBurst => "static_burst",
            AnomalyType::FrequencyShift => "freq_shift",
            AnomalyType::Pattern => "pattern",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ANOMALY EVENT
// ============================================================================

/// One classified anomaly. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    /// Always within [0, 1]
    pub confidence: f64,
    pub frequency_hz: u64,
    /// Unix seconds
    pub timestamp: f64,
    /// Rule-specific note (matched template name, shift size, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub feature_snapshot: FeatureVector,
}

// ============================================================================
// CLASSIFICATION OUTCOME
// ============================================================================

/// Result of evaluating one channel window
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Buffer below its minimum; no rule ran
    InsufficientData { have: usize, need: usize },
    /// Rules ran; `events` may be empty
    Evaluated {
        features: FeatureVector,
        events: Vec<AnomalyEvent>,
    },
}
