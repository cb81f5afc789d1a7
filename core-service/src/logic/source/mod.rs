//! Source Module - Sample acquisition
//!
//! ## Structure
//! - `types`: `Sample`, the `Transceiver` hardware boundary, `SourceConfig`
//! - `adapter`: `SampleSource` (tune, settle, lazy bounded read)
//! - `simulated`: Gaussian noise transceiver for running without hardware

pub mod types;
pub mod adapter;
pub mod simulated;

pub use types::{Sample, SourceConfig, Transceiver, TransceiverParams};
pub use adapter::SampleSource;
pub use simulated::SimulatedTransceiver;

use crate::logic::error::{MonitorError, MonitorResult};

/// Build the transceiver named by `config.kind`
pub fn create_transceiver(config: &SourceConfig) -> MonitorResult<Box<dyn Transceiver>> {
    match config.kind.to_ascii_lowercase().as_str() {
        "simulated" => {
            log::info!("Creating simulated RF transceiver");
            Ok(Box::new(SimulatedTransceiver::new(config)?))
        }
        other => Err(MonitorError::Config(format!(
            "unsupported transceiver type: {} (no native driver linked)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_simulator() {
        let device = create_transceiver(&SourceConfig::default()).unwrap();
        assert_eq!(device.name(), "Software Simulator");
    }

    #[test]
    fn test_factory_is_case_insensitive() {
        let config = SourceConfig {
            kind: "Simulated".into(),
            ..Default::default()
        };
        assert!(create_transceiver(&config).is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_kind() {
        let config = SourceConfig {
            kind: "hackrf".into(),
            ..Default::default()
        };
        assert!(matches!(
            create_transceiver(&config),
            Err(MonitorError::Config(_))
        ));
    }
}
