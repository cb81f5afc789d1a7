//! Monitor Configuration
//!
//! JSON configuration for the whole engine. Required keys fail fast at
//! startup with `MonitorError::Config`; everything else has a documented
//! default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    get_webhook_url, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SAMPLES_PER_READ, DEFAULT_SAMPLE_RATE_HZ,
};
use crate::logic::anomaly::{AnomalyThresholds, PatternTemplate};
use crate::logic::buffer::WindowedBuffer;
use crate::logic::emitter::{OutputConfig, RecorderConfig, WebhookConfig};
use crate::logic::error::{MonitorError, MonitorResult};
use crate::logic::features::DEFAULT_ENTROPY_BINS;
use crate::logic::source::{create_transceiver, SampleSource, SourceConfig, TransceiverParams};

/// Windows shorter than this cannot carry a meaningful std_dev
pub const MIN_WINDOW_SAMPLES: usize = 2;

fn default_sample_rate_hz() -> f64 {
    DEFAULT_SAMPLE_RATE_HZ
}

fn default_samples_per_read() -> usize {
    DEFAULT_SAMPLES_PER_READ
}

fn default_min_samples() -> usize {
    5
}

fn default_entropy_bins() -> usize {
    DEFAULT_ENTROPY_BINS
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Monitored center frequencies (Hz)
    pub frequencies: Vec<f64>,
    pub thresholds: AnomalyThresholds,
    /// Delay between channel switches (ms)
    pub scan_interval_ms: u64,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f64,
    /// Readings taken per channel visit
    #[serde(default = "default_samples_per_read")]
    pub samples_per_read: usize,
    /// Buffer length required before a channel is classified
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_entropy_bins")]
    pub entropy_bins: usize,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub patterns: Vec<PatternTemplate>,
    #[serde(default)]
    pub output: OutputConfig,
}

impl MonitorConfig {
    /// Read, apply env overrides, validate
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        log::info!(
            "Loaded config from {} ({} frequencies)",
            path.display(),
            config.frequencies.len()
        );
        Ok(config)
    }

    /// Parse only; missing required keys surface as `Config` errors
    pub fn from_json(content: &str) -> MonitorResult<Self> {
        serde_json::from_str(content).map_err(|e| MonitorError::Config(format!("invalid config: {}", e)))
    }

    /// `RFGHOST_WEBHOOK_URL` enables alerts; `RFGHOST_LOG_DIR` enables the signal log
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = get_webhook_url() {
            match self.output.webhook {
                Some(ref mut webhook) => webhook.url = url,
                None => self.output.webhook = Some(WebhookConfig::new(url)),
            }
        }
        if let Ok(dir) = std::env::var("RFGHOST_LOG_DIR") {
            let recorder = self.output.recorder.get_or_insert_with(RecorderConfig::default);
            recorder.dir = Some(dir.into());
        }
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.frequencies.is_empty() {
            return Err(MonitorError::Config("no frequencies configured".into()));
        }
        for &freq in &self.frequencies {
            if !freq.is_finite() || freq <= 0.0 {
                return Err(MonitorError::Config(format!("invalid frequency: {}", freq)));
            }
            let hz = freq.round() as u64;
            if hz < self.source.min_frequency_hz || hz > self.source.max_frequency_hz {
                return Err(MonitorError::Config(format!(
                    "{} Hz is outside the supported band {} - {} Hz",
                    hz, self.source.min_frequency_hz, self.source.max_frequency_hz
                )));
            }
        }

        self.thresholds.validate()?;

        if self.scan_interval_ms == 0 {
            return Err(MonitorError::Config("scan_interval_ms must be positive".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(MonitorError::Config("read_timeout_ms must be positive".into()));
        }
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(MonitorError::Config(format!(
                "sample_rate_hz must be positive, got {}",
                self.sample_rate_hz
            )));
        }
        if self.samples_per_read == 0 {
            return Err(MonitorError::Config("samples_per_read must be positive".into()));
        }
        if self.min_samples < MIN_WINDOW_SAMPLES {
            return Err(MonitorError::Config(format!(
                "min_samples must be at least {}, got {}",
                MIN_WINDOW_SAMPLES, self.min_samples
            )));
        }
        if self.entropy_bins < 2 {
            return Err(MonitorError::Config(format!(
                "entropy_bins must be at least 2, got {}",
                self.entropy_bins
            )));
        }
        if self.source.min_frequency_hz > self.source.max_frequency_hz {
            return Err(MonitorError::Config("source band is inverted".into()));
        }

        for template in &self.patterns {
            if template.name.trim().is_empty() {
                return Err(MonitorError::Config("pattern template without a name".into()));
            }
            if template.shape.len() < MIN_WINDOW_SAMPLES || template.shape.iter().any(|v| !v.is_finite()) {
                return Err(MonitorError::Config(format!(
                    "pattern '{}' needs at least {} finite points",
                    template.name, MIN_WINDOW_SAMPLES
                )));
            }
        }

        if let Some(ref webhook) = self.output.webhook {
            if !webhook.url.starts_with("http://") && !webhook.url.starts_with("https://") {
                return Err(MonitorError::Config(format!("webhook url must be http(s): {}", webhook.url)));
            }
        }
        if let Some(ref recorder) = self.output.recorder {
            if recorder.max_file_size_mb == 0 || recorder.max_files == 0 {
                return Err(MonitorError::Config("recorder limits must be positive".into()));
            }
        }

        Ok(())
    }

    /// Frequencies rounded to whole hertz, in configured order
    pub fn frequencies_hz(&self) -> Vec<u64> {
        self.frequencies.iter().map(|f| f.round() as u64).collect()
    }

    /// C = max(min_samples, ceil(duration_threshold * sample_rate_hz))
    pub fn buffer_capacity(&self) -> usize {
        WindowedBuffer::capacity_for(self.thresholds.duration_threshold, self.sample_rate_hz, self.min_samples)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn transceiver_params(&self) -> TransceiverParams {
        TransceiverParams {
            sample_rate_hz: self.sample_rate_hz,
            gain_db: self.source.gain_db,
        }
    }

    /// Build and configure the sample source described by `source`
    pub fn build_source(&self) -> MonitorResult<SampleSource> {
        let transceiver = create_transceiver(&self.source)?;
        let mut source = SampleSource::new(
            transceiver,
            Duration::from_millis(self.source.settle_time_ms),
            self.read_timeout(),
        );
        source.configure(&self.transceiver_params())?;
        Ok(source)
    }
}
