//! Webhook Alert Sink
//!
//! Sends anomaly records to a Slack, Discord or generic JSON webhook.
//! Records without anomalies, or below `min_confidence`, are not sent.
//! Transient failures (transport errors, 429, 5xx) are retried with
//! exponential backoff; other HTTP statuses are rejected immediately.

use std::time::Duration;

use super::sink::OutputSink;
use super::types::{OutputRecord, SinkError, WebhookConfig, WebhookPlatform};
use crate::constants::APP_NAME;

/// Upper bound for a single retry delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// ALERT LEVEL
// ============================================================================

/// Alert level derived from the best event confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            AlertLevel::Critical
        } else if confidence >= 0.7 {
            AlertLevel::High
        } else if confidence >= 0.5 {
            AlertLevel::Medium
        } else {
            AlertLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Low => "low",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Low => "[LOW]",
            AlertLevel::Medium => "[MEDIUM]",
            AlertLevel::High => "[HIGH]",
            AlertLevel::Critical => "[CRITICAL]",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            AlertLevel::Low => "#36a64f",
            AlertLevel::Medium => "#daa038",
            AlertLevel::High => "#e01e5a",
            AlertLevel::Critical => "#8b0000",
        }
    }
}

// ============================================================================
// SINK
// ============================================================================

pub struct WebhookAlertSink {
    config: WebhookConfig,
    hostname: Option<String>,
    sent: u64,
    failed: u64,
}

impl WebhookAlertSink {
    pub fn new(config: WebhookConfig) -> Self {
        let hostname = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned());
        Self {
            config,
            hostname,
            sent: 0,
            failed: 0,
        }
    }

    pub fn should_alert(&self, record: &OutputRecord) -> bool {
        self.config.should_alert(record)
    }

    fn title(record: &OutputRecord) -> String {
        let kinds: Vec<&str> = record
            .anomaly_events
            .iter()
            .map(|e| e.anomaly_type.as_str())
            .collect();
        format!(
            "{}: {} @ {:.3} MHz",
            APP_NAME,
            kinds.join(", "),
            record.frequency_hz as f64 / 1e6
        )
    }

    fn message(record: &OutputRecord) -> String {
        record
            .anomaly_events
            .iter()
            .map(|e| match &e.detail {
                Some(detail) => format!("{} ({:.2}): {}", e.anomaly_type, e.confidence, detail),
                None => format!("{} ({:.2})", e.anomaly_type, e.confidence),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Request body for the configured platform
    pub fn format_payload(&self, record: &OutputRecord) -> String {
        match self.config.platform {
            WebhookPlatform::Slack => self.format_slack(record),
            WebhookPlatform::Discord => self.format_discord(record),
            WebhookPlatform::Generic => self.format_generic(record),
        }
    }

    fn format_slack(&self, record: &OutputRecord) -> String {
        let level = AlertLevel::from_confidence(record.max_confidence());
        let mut blocks = vec![
            serde_json::json!({
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": format!("{} {}", level.emoji(), Self::title(record)),
                    "emoji": true
                }
            }),
            serde_json::json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": Self::message(record)
                }
            }),
        ];

        if self.config.include_details {
            let mut fields = vec![
                serde_json::json!({
                    "type": "mrkdwn",
                    "text": format!("*Level:* {}", level.as_str())
                }),
                serde_json::json!({
                    "type": "mrkdwn",
                    "text": format!(
                        "*Power:* mean {:.1} dBm, std {:.2} dB",
                        record.statistics.mean, record.statistics.std
                    )
                }),
            ];

            if let Some(ref hostname) = self.hostname {
                fields.push(serde_json::json!({
                    "type": "mrkdwn",
                    "text": format!("*Host:* {}", hostname)
                }));
            }

            blocks.push(serde_json::json!({
                "type": "section",
                "fields": fields
            }));
        }

        serde_json::json!({
            "blocks": blocks,
            "attachments": [{
                "color": level.color()
            }]
        })
        .to_string()
    }

    fn format_discord(&self, record: &OutputRecord) -> String {
        let level = AlertLevel::from_confidence(record.max_confidence());
        let mut fields = Vec::new();

        if self.config.include_details {
            fields.push(serde_json::json!({
                "name": "Level",
                "value": level.as_str(),
                "inline": true
            }));
            fields.push(serde_json::json!({
                "name": "Mean power",
                "value": format!("{:.1} dBm", record.statistics.mean),
                "inline": true
            }));

            if let Some(ref hostname) = self.hostname {
                fields.push(serde_json::json!({
                    "name": "Host",
                    "value": hostname,
                    "inline": true
                }));
            }
        }

        serde_json::json!({
            "embeds": [{
                "title": format!("{} {}", level.emoji(), Self::title(record)),
                "description": Self::message(record),
                "color": u32::from_str_radix(&level.color()[1..], 16).unwrap_or(0),
                "fields": fields,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }]
        })
        .to_string()
    }

    /// The record itself plus source host
    fn format_generic(&self, record: &OutputRecord) -> String {
        serde_json::json!({
            "source": APP_NAME,
            "hostname": self.hostname,
            "level": AlertLevel::from_confidence(record.max_confidence()).as_str(),
            "record": record
        })
        .to_string()
    }

    fn send_once(&self, body: &str) -> Result<u16, ureq::Error> {
        ureq::post(&self.config.url)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .set("Content-Type", "application/json")
            .send_string(body)
            .map(|resp| resp.status())
    }

    fn send_with_retry(&self, body: &str) -> Result<u16, SinkError> {
        let mut attempt = 0u32;
        loop {
            let error = match self.send_once(body) {
                Ok(status) => return Ok(status),
                Err(ureq::Error::Status(status, _)) if !is_retryable_status(status) => {
                    return Err(SinkError::Rejected { status });
                }
                Err(ureq::Error::Status(status, _)) => SinkError::Rejected { status },
                Err(e) => SinkError::Network {
                    message: e.to_string(),
                },
            };

            if attempt >= self.config.max_retries {
                return Err(error);
            }
            let delay = backoff_delay(self.config.backoff_ms, attempt);
            log::debug!(
                "Webhook attempt {} failed ({}), retrying in {:?}",
                attempt + 1,
                error,
                delay
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

impl OutputSink for WebhookAlertSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        if !self.should_alert(record) {
            return Ok(());
        }

        let body = self.format_payload(record);
        match self.send_with_retry(&body) {
            Ok(status) => {
                self.sent += 1;
                log::info!(
                    "Alert sent to {} webhook ({})",
                    self.config.platform.as_str(),
                    status
                );
                Ok(())
            }
            Err(e) => {
                self.failed += 1;
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        log::info!("Webhook sink closed: {} sent, {} failed", self.sent, self.failed);
        Ok(())
    }
}

/// Rate limiting and server errors are worth another attempt
fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

// ============================================================================
// TESTS
// ============================================================================
