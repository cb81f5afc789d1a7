//! Emitter Types
//!
//! Outbound record format and output collaborator configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{get_log_dir, DEFAULT_OUTPUT_QUEUE_CAPACITY};
use crate::logic::anomaly::AnomalyEvent;
use crate::logic::features::{FeatureVector, Statistics};

// ============================================================================
// OUTPUT RECORD
// ============================================================================

/// One channel visit, as handed to every output collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Unix seconds
    pub timestamp: f64,
    pub frequency_hz: u64,
    pub statistics: Statistics,
    pub anomalies: bool,
    /// In rule evaluation order
    pub anomaly_events: Vec<AnomalyEvent>,
}

impl OutputRecord {
    pub fn new(timestamp: f64, frequency_hz: u64, features: &FeatureVector, events: Vec<AnomalyEvent>) -> Self {
        Self {
            timestamp,
            frequency_hz,
            statistics: features.statistics(),
            anomalies: !events.is_empty(),
            anomaly_events: events,
        }
    }

    /// Single JSON line (no trailing newline)
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Highest event confidence, 0 when there are none
    pub fn max_confidence(&self) -> f64 {
        self.anomaly_events
            .iter()
            .map(|e| e.confidence)
            .fold(0.0, f64::max)
    }
}

// ============================================================================
// SINK ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("Sink queue full, record dropped")]
    QueueFull,

    #[error("Sink worker stopped")]
    Stopped,
}

// ============================================================================
// OUTPUT CONFIG
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    DEFAULT_OUTPUT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Log every record through the `log` facade
    #[serde(default = "default_true")]
    pub log_records: bool,
    /// Bounded hand-off between scan loop and sinks
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub recorder: Option<RecorderConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_records: true,
            queue_capacity: DEFAULT_OUTPUT_QUEUE_CAPACITY,
            recorder: None,
            webhook: None,
        }
    }
}

/// JSONL signal log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Falls back to `RFGHOST_LOG_DIR` / app data dir
    pub dir: Option<PathBuf>,
    pub max_file_size_mb: u64,
    pub max_files: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_file_size_mb: 10,
            max_files: 5,
        }
    }
}

impl RecorderConfig {
    /// Configured directory, else the environment / platform default
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(get_log_dir)
    }
}

/// Webhook platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookPlatform {
    Slack,
    Discord,
    Generic,
}

impl WebhookPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookPlatform::Slack => "slack",
            WebhookPlatform::Discord => "discord",
            WebhookPlatform::Generic => "generic",
        }
    }
}

/// Anomaly alert delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "WebhookConfig::default_platform")]
    pub platform: WebhookPlatform,
    /// Only records whose best event reaches this are sent
    #[serde(default = "WebhookConfig::default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "WebhookConfig::default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles per attempt (ms)
    #[serde(default = "WebhookConfig::default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "WebhookConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub include_details: bool,
    /// Alerts waiting for delivery; further alerts are dropped while full
    #[serde(default = "WebhookConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            platform: Self::default_platform(),
            min_confidence: Self::default_min_confidence(),
            max_retries: Self::default_max_retries(),
            backoff_ms: Self::default_backoff_ms(),
            timeout_ms: Self::default_timeout_ms(),
            include_details: true,
            queue_capacity: Self::default_queue_capacity(),
        }
    }

    /// Records worth an alert: anomalous and confident enough
    pub fn should_alert(&self, record: &OutputRecord) -> bool {
        record.anomalies && record.max_confidence() >= self.min_confidence
    }

    fn default_platform() -> WebhookPlatform {
        WebhookPlatform::Generic
    }

    fn default_min_confidence() -> f64 {
        0.5
    }

    fn default_max_retries() -> u32 {
        3
    }

    fn default_backoff_ms() -> u64 {
        500
    }

    fn default_timeout_ms() -> u64 {
        5_000
    }

    fn default_queue_capacity() -> usize {
        32
    }
}
