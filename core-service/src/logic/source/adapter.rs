//! Sample Source Adapter
//!
//! Normalizes transceiver reads into a uniform `Sample` stream. A read
//! tunes first, waits for the receiver to settle, then hands out a lazy
//! `SampleReader` that yields exactly `n` samples or stops at the first
//! fault.

use std::thread;
use std::time::{Duration, Instant};

use super::types::{Sample, Transceiver, TransceiverParams};
use crate::logic::error::{MonitorError, MonitorResult};

pub struct SampleSource {
    transceiver: Box<dyn Transceiver>,
    settle_time: Duration,
    read_timeout: Duration,
}

impl SampleSource {
    pub fn new(transceiver: Box<dyn Transceiver>, settle_time: Duration, read_timeout: Duration) -> Self {
        Self {
            transceiver,
            settle_time,
            read_timeout,
        }
    }

    /// Push sample rate / gain to the device
    pub fn configure(&mut self, params: &TransceiverParams) -> MonitorResult<()> {
        self.transceiver.configure(params)?;
        log::info!(
            "Sample source ready: {} ({} Hz - {} Hz)",
            self.transceiver.name(),
            self.transceiver.capabilities().min_frequency_hz,
            self.transceiver.capabilities().max_frequency_hz
        );
        Ok(())
    }

    pub fn device_name(&self) -> &str {
        self.transceiver.name()
    }

    /// Whether `frequency_hz` is inside the device's band
    pub fn supports(&self, frequency_hz: u64) -> bool {
        self.transceiver.capabilities().supports(frequency_hz)
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn settle_time(&self) -> Duration {
        self.settle_time
    }

    /// Tune to `frequency_hz` and start a lazy read of `n_samples`
    pub fn read(&mut self, n_samples: usize, frequency_hz: u64) -> MonitorResult<SampleReader<'_>> {
        if !self.supports(frequency_hz) {
            return Err(MonitorError::Config(format!(
                "{} Hz is outside the band supported by {}",
                frequency_hz,
                self.transceiver.name()
            )));
        }

        self.transceiver.set_frequency(frequency_hz)?;
        if !self.settle_time.is_zero() {
            thread::sleep(self.settle_time);
        }

        Ok(SampleReader {
            transceiver: self.transceiver.as_mut(),
            remaining: n_samples,
            deadline: Instant::now() + self.read_timeout,
            timeout: self.read_timeout,
            finished: false,
        })
    }
}

/// Finite, single-pass iterator over one read
pub struct SampleReader<'a> {
    transceiver: &'a mut dyn Transceiver,
    remaining: usize,
    deadline: Instant,
    timeout: Duration,
    finished: bool,
}

impl SampleReader<'_> {
    fn fail(&mut self, err: MonitorError) -> Option<MonitorResult<Sample>> {
        self.finished = true;
        Some(Err(err))
    }
}

impl Iterator for SampleReader<'_> {
    type Item = MonitorResult<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.remaining == 0 {
            return None;
        }
        if Instant::now() >= self.deadline {
            return self.fail(MonitorError::Timeout(self.timeout));
        }

        let (timestamp, power_dbm) = match self.transceiver.read_rssi() {
            Ok(reading) => reading,
            Err(e) => return self.fail(e),
        };
        if Instant::now() > self.deadline {
            return self.fail(MonitorError::Timeout(self.timeout));
        }
        if !timestamp.is_finite() || !power_dbm.is_finite() {
            return self.fail(MonitorError::Hardware(format!(
                "device returned a non-finite reading ({}, {})",
                timestamp, power_dbm
            )));
        }

        self.remaining -= 1;
        Some(Ok(Sample {
            timestamp,
            power_dbm,
            frequency_hz: self.transceiver.frequency(),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.remaining))
        }
    }
}
