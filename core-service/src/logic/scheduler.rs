//! Frequency Scan Scheduler
//!
//! One tokio task rotates the sample source across the configured
//! channels, strictly one at a time:
//! `Idle -> Tuning -> Sampling -> Extracting -> Classifying -> Idle`.
//!
//! Reads run on the blocking pool under a bounded timeout. A hardware
//! fault or timeout skips the channel for this rotation only; round-robin
//! retries it next time. Shutdown is checked between steps, never mid-read.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::logic::anomaly::{AnomalyClassifier, Classification};
use crate::logic::channel::{ChannelView, FrequencyChannel};
use crate::logic::config::MonitorConfig;
use crate::logic::emitter::{Emitter, OutputRecord};
use crate::logic::error::{MonitorError, MonitorResult};
use crate::logic::features::FeatureExtractor;
use crate::logic::source::{Sample, SampleSource};

/// Slack on top of the read timeout before the outer watchdog gives up
const READ_GRACE: Duration = Duration::from_millis(250);

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    #[default]
    Idle,
    Tuning,
    Sampling,
    Extracting,
    Classifying,
}

/// Process-wide scan progress; written only by the scheduler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanState {
    /// Channel the next step will visit
    pub current_index: usize,
    /// Channel visits completed
    pub cycle_count: u64,
    /// Full passes over all channels
    pub rotations: u64,
    /// Unix seconds of the last completed visit
    pub last_cycle_at: Option<f64>,
    pub phase: ScanPhase,
    pub running: bool,
    /// Records queued for output
    pub emitted_records: u64,
    /// Records the emitter could not queue
    pub dropped_records: u64,
}

/// Result of one channel visit
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Classified { frequency_hz: u64, anomalies: usize },
    /// Buffer still below `min_samples`; not an error
    InsufficientData { frequency_hz: u64, have: usize, need: usize },
    /// Hardware fault or timeout
    Skipped { frequency_hz: u64, reason: String },
    /// Feature vector refused by the classifier
    Rejected { frequency_hz: u64, reason: String },
}

/// Totals over one `run`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub cycles: u64,
    pub rotations: u64,
    pub classified: u64,
    pub anomalies: u64,
    pub insufficient: u64,
    pub skipped: u64,
    pub rejected: u64,
}

impl ScanSummary {
    fn observe(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Classified { anomalies, .. } => {
                self.classified += 1;
                self.anomalies += *anomalies as u64;
            }
            CycleOutcome::InsufficientData { .. } => self.insufficient += 1,
            CycleOutcome::Skipped { .. } => self.skipped += 1,
            CycleOutcome::Rejected { .. } => self.rejected += 1,
        }
    }
}

/// Read-only view for status queries; safe to use while the scan runs
#[derive(Clone)]
pub struct ScanHandle {
    state: Arc<RwLock<ScanState>>,
    channels: Arc<[ChannelView]>,
    device: String,
}

impl ScanHandle {
    pub fn state(&self) -> ScanState {
        self.state.read().clone()
    }

    pub fn channels(&self) -> &[ChannelView] {
        &self.channels
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct ScanScheduler {
    channels: Vec<FrequencyChannel>,
    source: Arc<Mutex<SampleSource>>,
    extractor: FeatureExtractor,
    classifier: AnomalyClassifier,
    emitter: Emitter,
    samples_per_read: usize,
    scan_interval: Duration,
    read_budget: Duration,
    read_timeout: Duration,
    device: String,
    state: Arc<RwLock<ScanState>>,
}

impl ScanScheduler {
    /// One channel per configured frequency, in configured order
    pub fn new(config: &MonitorConfig, source: SampleSource, emitter: Emitter) -> MonitorResult<Self> {
        let frequencies = config.frequencies_hz();
        if frequencies.is_empty() {
            return Err(MonitorError::Config("no frequencies configured".into()));
        }
        if let Some(freq) = frequencies.iter().find(|f| !source.supports(**f)) {
            return Err(MonitorError::Config(format!(
                "{} Hz is outside the band supported by {}",
                freq,
                source.device_name()
            )));
        }

        let capacity = config.buffer_capacity();
        let channels: Vec<FrequencyChannel> = frequencies
            .iter()
            .map(|&hz| {
                FrequencyChannel::new(
                    hz,
                    capacity,
                    config.min_samples,
                    config.thresholds.burst_baseline_window,
                )
            })
            .collect();

        log::info!(
            "Scheduler ready: {} channels, buffer {} samples, {} samples/read, interval {:?}",
            channels.len(),
            capacity,
            config.samples_per_read,
            config.scan_interval()
        );

        let read_budget = source.settle_time() + source.read_timeout() + READ_GRACE;
        let read_timeout = source.read_timeout();
        let device = source.device_name().to_string();

        Ok(Self {
            channels,
            source: Arc::new(Mutex::new(source)),
            extractor: FeatureExtractor::new(config.entropy_bins),
            classifier: AnomalyClassifier::new(config.thresholds.clone(), config.patterns.clone()),
            emitter,
            samples_per_read: config.samples_per_read,
            scan_interval: config.scan_interval(),
            read_budget,
            read_timeout,
            device,
            state: Arc::new(RwLock::new(ScanState::default())),
        })
    }

    pub fn handle(&self) -> ScanHandle {
        ScanHandle {
            state: Arc::clone(&self.state),
            channels: self.channels.iter().map(|c| c.view()).collect(),
            device: self.device.clone(),
        }
    }

    /// Scan until `shutdown` turns true (or its sender is dropped)
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ScanSummary {
        let mut summary = ScanSummary::default();
        self.state.write().running = true;
        log::info!("Scan loop started on {}", self.device);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.step().await;
            summary.observe(&outcome);

            tokio::select! {
                _ = tokio::time::sleep(self.scan_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        {
            let mut state = self.state.write();
            state.running = false;
            state.phase = ScanPhase::Idle;
            summary.rotations = state.rotations;
        }
        log::info!(
            "Scan loop stopped after {} cycles ({} anomalies, {} skipped)",
            summary.cycles,
            summary.anomalies,
            summary.skipped
        );
        summary
    }

    /// Visit the current channel once and advance the rotation
    pub async fn step(&mut self) -> CycleOutcome {
        let index = self.state.read().current_index;
        let frequency_hz = self.channels[index].frequency_hz();
        self.set_phase(ScanPhase::Tuning);

        let outcome = match self.acquire(frequency_hz).await {
            Ok(samples) => self.process(index, &samples),
            Err(e) => {
                if e.is_recoverable() {
                    log::warn!("Skipping {} Hz this rotation: {}", frequency_hz, e);
                } else {
                    log::error!("Read failed on {} Hz: {}", frequency_hz, e);
                }
                self.channels[index].record_skip(&e.to_string());
                CycleOutcome::Skipped {
                    frequency_hz,
                    reason: e.to_string(),
                }
            }
        };

        let mut state = self.state.write();
        state.current_index = (index + 1) % self.channels.len();
        if state.current_index == 0 {
            state.rotations += 1;
        }
        state.cycle_count += 1;
        state.last_cycle_at = Some(unix_now());
        state.phase = ScanPhase::Idle;
        state.emitted_records = self.emitter.emitted();
        state.dropped_records = self.emitter.dropped();

        outcome
    }

    /// Tune + read on the blocking pool; all-or-nothing
    async fn acquire(&self, frequency_hz: u64) -> MonitorResult<Vec<Sample>> {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let n = self.samples_per_read;

        let task = tokio::task::spawn_blocking(move || -> MonitorResult<Vec<Sample>> {
            // A read abandoned by the watchdog may still hold the device
            let mut source = source
                .try_lock()
                .ok_or_else(|| MonitorError::Hardware("transceiver busy with an abandoned read".into()))?;
            let reader = source.read(n, frequency_hz)?;
            state.write().phase = ScanPhase::Sampling;
            reader.collect()
        });

        match tokio::time::timeout(self.read_budget, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(MonitorError::Hardware(format!("read task failed: {}", e))),
            Err(_) => Err(MonitorError::Timeout(self.read_timeout)),
        }
    }

    fn process(&mut self, index: usize, samples: &[Sample]) -> CycleOutcome {
        let state = &self.state;
        let channel = &mut self.channels[index];
        let frequency_hz = channel.frequency_hz();
        channel.ingest(samples);

        state.write().phase = ScanPhase::Extracting;
        let timestamp = unix_now();
        let classifying = || state.write().phase = ScanPhase::Classifying;

        match channel.evaluate(&self.extractor, &self.classifier, timestamp, classifying) {
            Ok(Classification::Evaluated { features, events }) => {
                let anomalies = events.len();
                self.emitter
                    .emit(OutputRecord::new(timestamp, frequency_hz, &features, events));
                CycleOutcome::Classified { frequency_hz, anomalies }
            }
            Ok(Classification::InsufficientData { have, need }) => {
                log::debug!("{} Hz: {} of {} samples, not classified yet", frequency_hz, have, need);
                CycleOutcome::InsufficientData { frequency_hz, have, need }
            }
            Err(e) => {
                log::error!("Rejected feature vector on {} Hz: {}", frequency_hz, e);
                CycleOutcome::Rejected {
                    frequency_hz,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn set_phase(&self, phase: ScanPhase) {
        self.state.write().phase = phase;
    }
}

/// Wall-clock seconds for records and events
fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::anomaly::types::AnomalyType;
    use crate::logic::config::tests::MINIMAL;
    use crate::logic::emitter::sink::memory::MemorySink;
    use crate::logic::emitter::Dispatcher;

    fn config() -> MonitorConfig {
        let mut config = MonitorConfig::from_json(MINIMAL).unwrap();
        config.scan_interval_ms = 1;
        config.source.seed = Some(7);
        config.source.settle_time_ms = 0;
        config
    }

    fn scheduler(config: &MonitorConfig) -> (ScanScheduler, MemorySink, Dispatcher) {
        let sink = MemorySink::default();
        let (emitter, dispatcher) = Emitter::spawn(vec![Box::new(sink.clone())], 64).unwrap();
        let source = config.build_source().unwrap();
        let scheduler = ScanScheduler::new(config, source, emitter).unwrap();
        (scheduler, sink, dispatcher)
    }

    #[tokio::test]
    async fn test_round_robin_rotation() {
        let config = config();
        let (mut scheduler, _sink, _dispatcher) = scheduler(&config);
        let handle = scheduler.handle();

        let mut visited = Vec::new();
        for _ in 0..4 {
            match scheduler.step().await {
                CycleOutcome::Classified { frequency_hz, .. } => visited.push(frequency_hz),
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(visited, vec![433_920_000, 868_300_000, 433_920_000, 868_300_000]);
        let state = handle.state();
        assert_eq!(state.cycle_count, 4);
        assert_eq!(state.rotations, 2);
        assert_eq!(state.current_index, 0);
        assert_eq!(state.phase, ScanPhase::Idle);
        assert!(state.last_cycle_at.is_some());
    }

    #[tokio::test]
    async fn test_records_reach_sinks() {
        let config = config();
        let (mut scheduler, sink, dispatcher) = scheduler(&config);

        scheduler.step().await;
        scheduler.step().await;
        drop(scheduler);
        dispatcher.join();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frequency_hz, 433_920_000);
        assert_eq!(records[1].frequency_hz, 868_300_000);
        assert!(records[0].statistics.mean < -80.0);
        assert_eq!(records[0].anomalies, !records[0].anomaly_events.is_empty());
    }

    #[tokio::test]
    async fn test_hardware_fault_skips_channel_only() {
        let mut config = config();
        config.source.fault_frequencies = vec![868_300_000.0];
        let (mut scheduler, _sink, _dispatcher) = scheduler(&config);
        let handle = scheduler.handle();

        assert!(matches!(scheduler.step().await, CycleOutcome::Classified { .. }));
        assert!(matches!(
            scheduler.step().await,
            CycleOutcome::Skipped { frequency_hz: 868_300_000, .. }
        ));
        assert!(matches!(scheduler.step().await, CycleOutcome::Classified { .. }));

        let faulty = handle.channels()[1].summary();
        assert_eq!(faulty.skipped, 1);
        assert!(faulty.last_error.unwrap().contains("PLL"));
        // Nothing partial was buffered
        assert_eq!(handle.channels()[1].snapshot().len(), 0);
    }

    #[tokio::test]
    async fn test_slow_read_times_out() {
        let mut config = config();
        config.frequencies = vec![433_920_000.0];
        config.read_timeout_ms = 30;
        config.source.read_delay_ms = 20;
        let (mut scheduler, _sink, _dispatcher) = scheduler(&config);
        let handle = scheduler.handle();

        let outcome = scheduler.step().await;
        match outcome {
            CycleOutcome::Skipped { reason, .. } => assert!(reason.contains("Timeout")),
            other => panic!("expected timeout skip, got {:?}", other),
        }
        assert!(handle.channels()[0].snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_stuck_device_is_abandoned_then_reported_busy() {
        let mut config = config();
        config.frequencies = vec![433_920_000.0];
        config.samples_per_read = 1;
        config.read_timeout_ms = 30;
        config.source.read_delay_ms = 600;
        let (mut scheduler, _sink, _dispatcher) = scheduler(&config);
        let handle = scheduler.handle();

        // The single read never returns inside the budget; the watchdog gives up on it
        let started = std::time::Instant::now();
        match scheduler.step().await {
            CycleOutcome::Skipped { reason, .. } => assert!(reason.contains("Timeout"), "{}", reason),
            other => panic!("expected timeout skip, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_millis(500));

        // The abandoned read still holds the device
        let started = std::time::Instant::now();
        match scheduler.step().await {
            CycleOutcome::Skipped { reason, .. } => assert!(reason.contains("busy"), "{}", reason),
            other => panic!("expected busy skip, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_millis(100));

        let summary = handle.channels()[0].summary();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.cycles, 0);
        assert_eq!(handle.state().cycle_count, 2);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_not_an_error() {
        let mut config = config();
        config.frequencies = vec![433_920_000.0];
        config.samples_per_read = 2;
        let (mut scheduler, _sink, _dispatcher) = scheduler(&config);

        assert_eq!(
            scheduler.step().await,
            CycleOutcome::InsufficientData {
                frequency_hz: 433_920_000,
                have: 2,
                need: 5
            }
        );
        scheduler.step().await;
        assert!(matches!(scheduler.step().await, CycleOutcome::Classified { .. }));
    }

    #[tokio::test]
    async fn test_tuning_drift_fires_frequency_shift_once() {
        let mut config = config();
        config.frequencies = vec![433_920_000.0];
        config.source.frequency_offset_hz = 130_000;
        let (mut scheduler, sink, dispatcher) = scheduler(&config);

        let handle = scheduler.handle();
        scheduler.step().await;
        scheduler.step().await;
        assert_eq!(handle.channels()[0].summary().last_center_hz, 434_050_000);
        drop(scheduler);
        dispatcher.join();

        let records = sink.records();
        let shifted = |r: &OutputRecord| {
            r.anomaly_events
                .iter()
                .any(|e| e.anomaly_type == AnomalyType::FrequencyShift)
        };
        assert!(shifted(&records[0]));
        assert!(!shifted(&records[1]));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let config = config();
        let (scheduler, _sink, dispatcher) = scheduler(&config);
        let handle = scheduler.handle();
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(scheduler.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.state().running);

        tx.send(true).unwrap();
        let summary = task.await.unwrap();
        assert!(summary.cycles > 0);
        let state = handle.state();
        assert!(!state.running);
        assert_eq!(state.cycle_count, summary.cycles);
        assert_eq!(state.emitted_records + state.dropped_records, summary.classified);

        dispatcher.join();
    }

    #[test]
    fn test_rejects_empty_and_out_of_band_channels() {
        let mut config = config();
        let (emitter, _dispatcher) = Emitter::spawn(Vec::new(), 4).unwrap();

        config.frequencies.clear();
        let source = config.build_source().unwrap();
        assert!(matches!(
            ScanScheduler::new(&config, source, emitter.clone()),
            Err(MonitorError::Config(_))
        ));

        config.frequencies = vec![100_000_000.0];
        let source = config.build_source().unwrap();
        assert!(matches!(
            ScanScheduler::new(&config, source, emitter),
            Err(MonitorError::Config(_))
        ));
    }
}
