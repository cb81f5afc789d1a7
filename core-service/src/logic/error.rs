//! Error Types
//!
//! Error taxonomy for the acquisition and classification engine.
//! A short buffer is not an error; see `CycleOutcome::InsufficientData`.

use std::time::Duration;

/// Result type for engine operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised by the sample source, scheduler and classifier
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Invalid or missing configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transceiver unreachable or reported a fault (skip channel this cycle)
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Read did not finish within its bounded timeout
    #[error("Timeout after {0:?} waiting for samples")]
    Timeout(Duration),

    /// Malformed feature vector (non-finite statistics)
    #[error("Classification error: {0}")]
    Classification(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MonitorError {
    /// Hardware faults and timeouts are contained by the scheduler
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MonitorError::Hardware(_) | MonitorError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(MonitorError::Hardware("spi".into()).is_recoverable());
        assert!(MonitorError::Timeout(Duration::from_millis(10)).is_recoverable());
        assert!(!MonitorError::Config("no frequencies".into()).is_recoverable());
        assert!(!MonitorError::Classification("NaN".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = MonitorError::Config("no frequencies configured".into());
        assert_eq!(err.to_string(), "Configuration error: no frequencies configured");
    }
}
