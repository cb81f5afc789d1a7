//! Scan Status
//!
//! Point-in-time view of the scanner for operators and dashboards.
//! Reads shared state and buffer snapshots only, so it can be called
//! from any thread while the scan loop is running.

use serde::Serialize;

use crate::constants::APP_VERSION;
use crate::logic::anomaly::AnomalyEvent;
use crate::logic::buffer::BufferStatus;
use crate::logic::channel::ChannelView;
use crate::logic::scheduler::{ScanHandle, ScanPhase};

#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub version: String,
    pub device: String,
    pub running: bool,
    pub phase: ScanPhase,
    pub current_index: usize,
    pub current_frequency_hz: Option<u64>,
    pub cycle_count: u64,
    pub rotations: u64,
    pub last_cycle_at: Option<f64>,
    pub emitted_records: u64,
    pub dropped_records: u64,
    pub channels: Vec<ChannelStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub frequency_hz: u64,
    pub buffer: BufferStatus,
    /// Mean of the samples currently buffered (dBm)
    pub buffered_mean_dbm: Option<f64>,
    /// Mean from the last classified window (dBm)
    pub last_mean_dbm: Option<f64>,
    pub last_std_db: Option<f64>,
    pub last_center_hz: u64,
    pub baseline_std_db: Option<f64>,
    pub baseline_cycles: usize,
    pub last_event: Option<AnomalyEvent>,
    pub counters: ChannelCounters,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelCounters {
    pub cycles: u64,
    pub anomalies: u64,
    pub skipped: u64,
    pub insufficient: u64,
    pub rejected: u64,
}

/// Collect status for the scanner behind `handle`
pub fn scan_status(handle: &ScanHandle) -> ScanStatus {
    let state = handle.state();
    let channels: Vec<ChannelStatus> = handle.channels().iter().map(channel_status).collect();

    ScanStatus {
        version: APP_VERSION.to_string(),
        device: handle.device().to_string(),
        running: state.running,
        phase: state.phase,
        current_index: state.current_index,
        current_frequency_hz: channels.get(state.current_index).map(|c| c.frequency_hz),
        cycle_count: state.cycle_count,
        rotations: state.rotations,
        last_cycle_at: state.last_cycle_at,
        emitted_records: state.emitted_records,
        dropped_records: state.dropped_records,
        channels,
    }
}

fn channel_status(view: &ChannelView) -> ChannelStatus {
    let snapshot = view.snapshot();
    let summary = view.summary();

    let buffered_mean_dbm = if snapshot.is_empty() {
        None
    } else {
        let total: f64 = snapshot.as_slice().iter().map(|s| s.power_dbm).sum();
        Some(total / snapshot.len() as f64)
    };

    ChannelStatus {
        frequency_hz: view.frequency_hz,
        buffer: view.buffer_status(),
        buffered_mean_dbm,
        last_mean_dbm: summary.last_features.map(|f| f.mean),
        last_std_db: summary.last_features.map(|f| f.std_dev),
        last_center_hz: summary.last_center_hz,
        baseline_std_db: summary.baseline_std,
        baseline_cycles: summary.baseline_cycles,
        last_event: summary.last_event,
        counters: ChannelCounters {
            cycles: summary.cycles,
            anomalies: summary.anomalies,
            skipped: summary.skipped,
            insufficient: summary.insufficient,
            rejected: summary.rejected,
        },
        last_error: summary.last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::tests::MINIMAL;
    use crate::logic::config::MonitorConfig;
    use crate::logic::emitter::Emitter;
    use crate::logic::scheduler::ScanScheduler;

    #[tokio::test]
    async fn test_status_reflects_scan_progress() {
        let mut config = MonitorConfig::from_json(MINIMAL).unwrap();
        config.source.seed = Some(3);
        config.source.settle_time_ms = 0;
        config.source.fault_frequencies = vec![868_300_000.0];

        let (emitter, _dispatcher) = Emitter::spawn(Vec::new(), 8).unwrap();
        let mut scheduler = ScanScheduler::new(&config, config.build_source().unwrap(), emitter).unwrap();
        let handle = scheduler.handle();

        let idle = scan_status(&handle);
        assert!(!idle.running);
        assert_eq!(idle.cycle_count, 0);
        assert_eq!(idle.current_frequency_hz, Some(433_920_000));
        assert_eq!(idle.channels.len(), 2);
        assert!(idle.channels[0].last_mean_dbm.is_none());

        scheduler.step().await;
        scheduler.step().await;

        let status = scan_status(&handle);
        assert_eq!(status.cycle_count, 2);
        assert_eq!(status.rotations, 1);
        assert_eq!(status.phase, ScanPhase::Idle);
        assert_eq!(status.emitted_records, 1);
        assert_eq!(status.dropped_records, 0);

        let healthy = &status.channels[0];
        assert_eq!(healthy.buffer.current_size, 10);
        assert_eq!(healthy.counters.cycles, 1);
        assert!(healthy.last_mean_dbm.is_some());
        assert_eq!(healthy.baseline_cycles, 1);
        assert!(healthy.buffered_mean_dbm.unwrap() < -80.0);

        let faulty = &status.channels[1];
        assert_eq!(faulty.counters.skipped, 1);
        assert_eq!(faulty.buffer.current_size, 0);
        assert!(faulty.last_error.is_some());

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "idle");
        assert_eq!(json["channels"][0]["frequency_hz"], 433_920_000);
    }
}
