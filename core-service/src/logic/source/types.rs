//! Source Types
//!
//! Hardware boundary of the engine: the `Transceiver` trait and the
//! immutable `Sample` every reading is normalized into.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SETTLE_TIME_MS;
use crate::logic::error::MonitorResult;

/// Receive gain a device starts with (dB)
pub const DEFAULT_GAIN_DB: f64 = 20.0;

// ============================================================================
// SAMPLE
// ============================================================================

/// One RSSI reading, stamped with the frequency the device was actually tuned to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic seconds since the source was created
    pub timestamp: f64,
    /// Received power (dBm)
    pub power_dbm: f64,
    /// Effective center frequency reported by the transceiver (Hz)
    pub frequency_hz: u64,
}

// ============================================================================
// TRANSCEIVER BOUNDARY
// ============================================================================

/// Parameters pushed to the device before scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransceiverParams {
    /// Readings per second
    pub sample_rate_hz: f64,
    /// Receive gain (dB)
    pub gain_db: f64,
}

/// What a device can tune to
#[derive(Debug, Clone, Default)]
pub struct TransceiverCapabilities {
    /// Minimum frequency in Hz
    pub min_frequency_hz: u64,
    /// Maximum frequency in Hz
    pub max_frequency_hz: u64,
}

impl TransceiverCapabilities {
    pub fn supports(&self, frequency_hz: u64) -> bool {
        (self.min_frequency_hz..=self.max_frequency_hz).contains(&frequency_hz)
    }
}

/// Common interface for RSSI-capable radios (hardware or simulated)
pub trait Transceiver: Send {
    /// Device name/description
    fn name(&self) -> &str;

    /// Tuning range of the device
    fn capabilities(&self) -> TransceiverCapabilities;

    /// Apply sample rate and gain
    fn configure(&mut self, params: &TransceiverParams) -> MonitorResult<()>;

    /// Retune the receiver
    fn set_frequency(&mut self, frequency_hz: u64) -> MonitorResult<()>;

    /// Frequency the receiver is actually sitting on (may differ from the request)
    fn frequency(&self) -> u64;

    /// One reading: `(monotonic timestamp, power in dBm)`
    fn read_rssi(&mut self) -> MonitorResult<(f64, f64)>;
}

// ============================================================================
// SOURCE CONFIG
// ============================================================================

/// Which transceiver to build and how the simulator behaves
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "simulated" (only built-in driver)
    pub kind: String,
    pub gain_db: f64,
    /// Settling delay after each retune (ms)
    pub settle_time_ms: u64,
    pub min_frequency_hz: u64,
    pub max_frequency_hz: u64,
    /// Simulated noise floor (dBm)
    pub noise_floor_dbm: f64,
    /// Simulated noise standard deviation (dB)
    pub noise_std_db: f64,
    /// Constant tuning error added by the simulator (Hz)
    pub frequency_offset_hz: i64,
    /// Frequencies at which the simulator reports a tuning fault
    pub fault_frequencies: Vec<f64>,
    /// Artificial latency per reading (ms)
    pub read_delay_ms: u64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: "simulated".to_string(),
            gain_db: DEFAULT_GAIN_DB,
            settle_time_ms: DEFAULT_SETTLE_TIME_MS,
            min_frequency_hz: 300_000_000,
            max_frequency_hz: 928_000_000,
            noise_floor_dbm: -100.0,
            noise_std_db: 2.0,
            frequency_offset_hz: 0,
            fault_frequencies: Vec::new(),
            read_delay_ms: 0,
            seed: None,
        }
    }
}
