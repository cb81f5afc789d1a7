//! Emitter Module - hands classification records to output collaborators
//!
//! The scan loop calls `Emitter::emit`, which never blocks: records go
//! into a bounded queue and are dropped (and counted) when it is full.
//! A dedicated dispatcher thread drains the queue and fans each record
//! out to every configured sink. Sink failures are logged and do not
//! reach the scan loop. The webhook runs behind a `BackgroundSink`, so
//! retries against a dead endpoint never stall the other sinks.
//!
//! ## Structure
//! - `types`: `OutputRecord`, `SinkError`, output config
//! - `sink`: `OutputSink` trait, `LogSink`, `BackgroundSink`
//! - `recorder`: JSONL signal log with rotation
//! - `webhook`: anomaly alerts over HTTP

pub mod types;
pub mod sink;
pub mod recorder;
pub mod webhook;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub use types::{OutputConfig, OutputRecord, RecorderConfig, WebhookConfig};
pub use sink::{BackgroundSink, LogSink, OutputSink};
pub use recorder::JsonlRecorder;
pub use webhook::WebhookAlertSink;

use crate::logic::error::{MonitorError, MonitorResult};

// ============================================================================
// EMITTER
// ============================================================================

/// Non-blocking producer side; cheap to clone
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<OutputRecord>,
    emitted: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

/// Counters reported when the dispatcher exits
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Owns the dispatcher thread
pub struct Dispatcher {
    thread: JoinHandle<DispatchStats>,
}

impl Emitter {
    /// Start the dispatcher thread over `sinks`
    pub fn spawn(sinks: Vec<Box<dyn OutputSink>>, capacity: usize) -> MonitorResult<(Self, Dispatcher)> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let names: Vec<String> = sinks.iter().map(|s| s.name().to_string()).collect();

        let thread = std::thread::Builder::new()
            .name("rfghost-emitter".into())
            .spawn(move || dispatch_loop(rx, sinks))
            .map_err(MonitorError::Io)?;

        log::info!("Emitter started (queue {}, sinks: {})", capacity.max(1), names.join(", "));

        let emitter = Self {
            tx,
            emitted: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        Ok((emitter, Dispatcher { thread }))
    }

    /// Queue a record; returns false if it was dropped
    pub fn emit(&self, record: OutputRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.emitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(record)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "Output queue full, dropped record for {} Hz ({} dropped so far)",
                    record.frequency_hz,
                    dropped
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::error!("Output dispatcher stopped, record dropped");
                false
            }
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Dispatcher {
    /// Wait for the queue to drain; every `Emitter` clone must be dropped first
    pub fn join(self) -> DispatchStats {
        match self.thread.join() {
            Ok(stats) => stats,
            Err(_) => {
                log::error!("Emitter thread panicked");
                DispatchStats::default()
            }
        }
    }
}

fn dispatch_loop(mut rx: mpsc::Receiver<OutputRecord>, mut sinks: Vec<Box<dyn OutputSink>>) -> DispatchStats {
    let mut stats = DispatchStats::default();

    while let Some(record) = rx.blocking_recv() {
        for sink in sinks.iter_mut() {
            match sink.publish(&record) {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    log::error!("Sink '{}' failed: {}", sink.name(), e);
                }
            }
        }
    }

    for sink in sinks.iter_mut() {
        if let Err(e) = sink.flush() {
            log::warn!("Sink '{}' flush failed: {}", sink.name(), e);
        }
    }

    log::info!("Emitter stopped: {} deliveries, {} failures", stats.delivered, stats.failed);
    stats
}

/// Build the sinks named in `config`
pub fn build_sinks(config: &OutputConfig) -> MonitorResult<Vec<Box<dyn OutputSink>>> {
    let mut sinks: Vec<Box<dyn OutputSink>> = Vec::new();

    if config.log_records {
        sinks.push(Box::new(LogSink));
    }

    if let Some(ref recorder) = config.recorder {
        let recorder = JsonlRecorder::from_config(recorder)?;
        log::info!("Recording signal log to {:?}", recorder.base_dir());
        sinks.push(Box::new(recorder));
    }

    if let Some(ref webhook) = config.webhook {
        log::info!(
            "Webhook alerts enabled ({}, queue {})",
            webhook.platform.as_str(),
            webhook.queue_capacity
        );
        let filter = webhook.clone();
        let sink = BackgroundSink::spawn(
            Box::new(WebhookAlertSink::new(webhook.clone())),
            webhook.queue_capacity,
        )?
        .filtered(move |record| filter.should_alert(record));
        sinks.push(Box::new(sink));
    }

    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::sink::memory::{FailingSink, MemorySink, SlowSink};
    use super::types::SinkError;
    use std::time::Duration;
    use crate::logic::features::vector::test_vector;

    fn record(frequency_hz: u64) -> OutputRecord {
        OutputRecord::new(1_700_000_000.0, frequency_hz, &test_vector(-90.0, 0.2), Vec::new())
    }

    #[test]
    fn test_records_reach_every_sink_in_order() {
        let first = MemorySink::default();
        let second = MemorySink::default();
        let (emitter, dispatcher) =
            Emitter::spawn(vec![Box::new(first.clone()), Box::new(second.clone())], 16).unwrap();

        assert!(emitter.emit(record(433_920_000)));
        assert!(emitter.emit(record(868_300_000)));
        drop(emitter);

        let stats = dispatcher.join();
        assert_eq!(stats.delivered, 4);
        for sink in [&first, &second] {
            let freqs: Vec<u64> = sink.records().iter().map(|r| r.frequency_hz).collect();
            assert_eq!(freqs, vec![433_920_000, 868_300_000]);
            assert!(*sink.flushed.lock());
        }
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let memory = MemorySink::default();
        let (emitter, dispatcher) =
            Emitter::spawn(vec![Box::new(FailingSink), Box::new(memory.clone())], 4).unwrap();

        emitter.emit(record(433_920_000));
        drop(emitter);

        let stats = dispatcher.join();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(memory.records().len(), 1);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        // Sink that parks until released keeps the queue full
        struct GateSink(std::sync::mpsc::Receiver<()>);
        impl OutputSink for GateSink {
            fn name(&self) -> &str {
                "gate"
            }
            fn publish(&mut self, _record: &OutputRecord) -> Result<(), SinkError> {
                let _ = self.0.recv();
                Ok(())
            }
        }

        let (release, gate) = std::sync::mpsc::channel();
        let (emitter, dispatcher) = Emitter::spawn(vec![Box::new(GateSink(gate))], 1).unwrap();

        let accepted = (0..20).filter(|_| emitter.emit(record(433_920_000))).count();
        // At most one in flight plus one queued
        assert!(accepted <= 2);
        assert_eq!(emitter.dropped() as usize, 20 - accepted);

        drop(release);
        drop(emitter);
        dispatcher.join();
    }

    #[test]
    fn test_slow_sink_in_background_does_not_starve_others() {
        let healthy = MemorySink::default();
        let slow = SlowSink {
            delay: Duration::from_millis(50),
            inner: MemorySink::default(),
        };
        let background = BackgroundSink::spawn(Box::new(slow.clone()), 2).unwrap();
        let (emitter, dispatcher) =
            Emitter::spawn(vec![Box::new(background), Box::new(healthy.clone())], 4).unwrap();

        for _ in 0..20 {
            assert!(emitter.emit(record(433_920_000)));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(emitter.dropped(), 0);
        assert_eq!(emitter.emitted(), 20);
        drop(emitter);

        let stats = dispatcher.join();
        assert_eq!(healthy.records().len(), 20);
        // The slow sink shed what its own queue could not hold
        let slow_got = slow.inner.records().len();
        assert!(slow_got < 20);
        assert_eq!(stats.failed as usize, 20 - slow_got);
        assert!(*slow.inner.flushed.lock());
    }

    #[test]
    fn test_build_sinks_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = OutputConfig {
            log_records: true,
            queue_capacity: 8,
            recorder: Some(RecorderConfig {
                dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            }),
            webhook: Some(WebhookConfig::new("http://127.0.0.1:9/hook")),
        };

        let sinks = build_sinks(&config).unwrap();
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["log", "jsonl", "webhook"]);
    }

    #[test]
    fn test_build_sinks_minimal() {
        let config = OutputConfig {
            log_records: false,
            ..Default::default()
        };
        assert!(build_sinks(&config).unwrap().is_empty());
    }
}
