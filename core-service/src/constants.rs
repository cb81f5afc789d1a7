//! Central Configuration Constants
//!
//! Single source of truth for runtime defaults that are not detection
//! thresholds (those live in `logic::anomaly::rules`).

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "RFGhost";

/// Config file used when neither a CLI argument nor `RFGHOST_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default number of RSSI readings taken per channel visit
pub const DEFAULT_SAMPLES_PER_READ: usize = 10;

/// Default sample rate of the transceiver (readings per second)
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;

/// Default bounded timeout for one channel read (ms)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2_000;

/// Default settling delay after retuning (ms)
pub const DEFAULT_SETTLE_TIME_MS: u64 = 5;

/// Default capacity of the outbound record queue
pub const DEFAULT_OUTPUT_QUEUE_CAPACITY: usize = 256;

/// How long exit waits on blocking work (a stuck device read) before abandoning it
pub const SHUTDOWN_GRACE_SECS: u64 = 3;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Resolve the config path: first CLI argument, then `RFGHOST_CONFIG`, then default
pub fn get_config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("RFGHOST_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

/// Webhook URL for anomaly alerts, if set in the environment
pub fn get_webhook_url() -> Option<String> {
    std::env::var("RFGHOST_WEBHOOK_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Directory for JSONL signal logs (`RFGHOST_LOG_DIR` or app data dir)
pub fn get_log_dir() -> PathBuf {
    std::env::var("RFGHOST_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("rfghost")
                .join("signal_logs")
        })
}

/// Period of the operator status line logged by the binary (s)
pub const STATUS_REPORT_INTERVAL_SECS: u64 = 30;
