//! Simulated Transceiver
//!
//! Gaussian RSSI around a configurable noise floor, for running the
//! monitor without hardware. Timestamps come from a virtual clock that
//! advances one sample period per reading, so windows have a realistic
//! span without the simulator sleeping.
//!
//! `noise_floor_dbm` is the floor seen at `DEFAULT_GAIN_DB`; any other
//! gain shifts every reading by the difference.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::types::{SourceConfig, Transceiver, TransceiverCapabilities, TransceiverParams, DEFAULT_GAIN_DB};
use crate::logic::error::{MonitorError, MonitorResult};

pub struct SimulatedTransceiver {
    capabilities: TransceiverCapabilities,
    noise: Normal<f64>,
    gain_offset_db: f64,
    rng: StdRng,
    tuned_hz: u64,
    frequency_offset_hz: i64,
    fault_frequencies: Vec<u64>,
    read_delay: Duration,
    sample_period: f64,
    clock: f64,
}

impl SimulatedTransceiver {
    pub fn new(config: &SourceConfig) -> MonitorResult<Self> {
        let noise = Normal::new(config.noise_floor_dbm, config.noise_std_db).map_err(|e| {
            MonitorError::Config(format!(
                "invalid simulated noise ({} dBm, std {} dB): {}",
                config.noise_floor_dbm, config.noise_std_db, e
            ))
        })?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            capabilities: TransceiverCapabilities {
                min_frequency_hz: config.min_frequency_hz,
                max_frequency_hz: config.max_frequency_hz,
            },
            noise,
            gain_offset_db: config.gain_db - DEFAULT_GAIN_DB,
            rng,
            tuned_hz: config.min_frequency_hz,
            frequency_offset_hz: config.frequency_offset_hz,
            fault_frequencies: config
                .fault_frequencies
                .iter()
                .map(|f| f.round() as u64)
                .collect(),
            read_delay: Duration::from_millis(config.read_delay_ms),
            sample_period: 0.1,
            clock: 0.0,
        })
    }
}

impl Transceiver for SimulatedTransceiver {
    fn name(&self) -> &str {
        "Software Simulator"
    }

    fn capabilities(&self) -> TransceiverCapabilities {
        self.capabilities.clone()
    }

    fn configure(&mut self, params: &TransceiverParams) -> MonitorResult<()> {
        if !(params.sample_rate_hz.is_finite() && params.sample_rate_hz > 0.0) {
            return Err(MonitorError::Config(format!(
                "sample rate must be positive, got {}",
                params.sample_rate_hz
            )));
        }
        if !params.gain_db.is_finite() {
            return Err(MonitorError::Config(format!("gain must be finite, got {}", params.gain_db)));
        }
        self.sample_period = 1.0 / params.sample_rate_hz;
        self.gain_offset_db = params.gain_db - DEFAULT_GAIN_DB;
        log::debug!(
            "Simulator configured: {} samples/s, gain {} dB",
            params.sample_rate_hz,
            params.gain_db
        );
        Ok(())
    }

    fn set_frequency(&mut self, frequency_hz: u64) -> MonitorResult<()> {
        if self.fault_frequencies.contains(&frequency_hz) {
            return Err(MonitorError::Hardware(format!(
                "PLL failed to lock at {} Hz",
                frequency_hz
            )));
        }
        self.tuned_hz = frequency_hz.saturating_add_signed(self.frequency_offset_hz);
        Ok(())
    }

    fn frequency(&self) -> u64 {
        self.tuned_hz
    }

    fn read_rssi(&mut self) -> MonitorResult<(f64, f64)> {
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        self.clock += self.sample_period;
        Ok((self.clock, self.noise.sample(&mut self.rng) + self.gain_offset_db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SourceConfig {
        SourceConfig {
            seed: Some(42),
            ..Default::default()
        }
    }

    fn mean_of(sim: &mut SimulatedTransceiver, n: usize) -> f64 {
        (0..n).map(|_| sim.read_rssi().unwrap().1).sum::<f64>() / n as f64
    }

    #[test]
    fn test_readings_center_on_noise_floor() {
        let mut sim = SimulatedTransceiver::new(&seeded()).unwrap();
        let mean = mean_of(&mut sim, 2_000);
        assert!((mean - -100.0).abs() < 0.5, "mean {} too far from floor", mean);
    }

    #[test]
    fn test_gain_shifts_readings() {
        let config = SourceConfig {
            gain_db: 30.0,
            ..seeded()
        };
        let mut sim = SimulatedTransceiver::new(&config).unwrap();
        let mean = mean_of(&mut sim, 1_000);
        assert!((mean - -90.0).abs() < 0.5, "mean {} ignores gain", mean);

        sim.configure(&TransceiverParams { sample_rate_hz: 10.0, gain_db: 0.0 })
            .unwrap();
        let mean = mean_of(&mut sim, 1_000);
        assert!((mean - -120.0).abs() < 0.5, "mean {} ignores reconfigured gain", mean);
    }

    #[test]
    fn test_virtual_clock_is_monotonic() {
        let mut sim = SimulatedTransceiver::new(&seeded()).unwrap();
        sim.configure(&TransceiverParams { sample_rate_hz: 4.0, gain_db: 20.0 })
            .unwrap();
        let (t1, _) = sim.read_rssi().unwrap();
        let (t2, _) = sim.read_rssi().unwrap();
        assert!((t2 - t1 - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_fault_frequency_reports_hardware_error() {
        let config = SourceConfig {
            fault_frequencies: vec![868_000_000.0],
            ..seeded()
        };
        let mut sim = SimulatedTransceiver::new(&config).unwrap();
        assert!(sim.set_frequency(433_920_000).is_ok());
        assert!(matches!(
            sim.set_frequency(868_000_000),
            Err(MonitorError::Hardware(_))
        ));
    }

    #[test]
    fn test_frequency_offset_applied() {
        let config = SourceConfig {
            frequency_offset_hz: -5_000,
            ..seeded()
        };
        let mut sim = SimulatedTransceiver::new(&config).unwrap();
        sim.set_frequency(433_920_000).unwrap();
        assert_eq!(sim.frequency(), 433_915_000);
    }

    #[test]
    fn test_negative_noise_std_rejected() {
        let config = SourceConfig {
            noise_std_db: -1.0,
            ..seeded()
        };
        assert!(matches!(
            SimulatedTransceiver::new(&config),
            Err(MonitorError::Config(_))
        ));
    }
}
