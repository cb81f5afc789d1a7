//! Output Sinks
//!
//! Every collaborator that receives classification records implements
//! `OutputSink`. Sinks run on the dispatcher thread, never on the scan loop.
//! A sink that can stall (network retries) is wrapped in `BackgroundSink`
//! so it gets its own thread and queue and cannot hold up the others.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::{OutputRecord, SinkError};
use crate::logic::error::{MonitorError, MonitorResult};

/// Receiver of output records
pub trait OutputSink: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError>;

    /// Called once when the emitter shuts down
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

// ============================================================================
// LOG SINK
// ============================================================================

/// Writes one line per record to the `log` facade
#[derive(Debug, Default)]
pub struct LogSink;

impl OutputSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        let mhz = record.frequency_hz as f64 / 1e6;
        if record.anomalies {
            for event in &record.anomaly_events {
                log::info!(
                    "[ANOMALY] {} @ {:.3} MHz (confidence {:.2}){}",
                    event.anomaly_type,
                    mhz,
                    event.confidence,
                    event.detail.as_deref().map(|d| format!(" - {}", d)).unwrap_or_default()
                );
            }
        } else {
            log::debug!(
                "{:.3} MHz: mean {:.1} dBm, std {:.2} dB, range [{:.1}, {:.1}]",
                mhz,
                record.statistics.mean,
                record.statistics.std,
                record.statistics.min,
                record.statistics.max
            );
        }
        Ok(())
    }
}

// ============================================================================
// BACKGROUND SINK
// ============================================================================

type RecordFilter = Box<dyn Fn(&OutputRecord) -> bool + Send>;

/// Runs another sink on a worker thread behind a bounded queue.
///
/// `publish` only enqueues. A full queue drops the record for this sink
/// alone and reports `SinkError::QueueFull`.
pub struct BackgroundSink {
    name: String,
    tx: Option<mpsc::Sender<OutputRecord>>,
    worker: Option<JoinHandle<()>>,
    filter: Option<RecordFilter>,
}

impl BackgroundSink {
    pub fn spawn(inner: Box<dyn OutputSink>, capacity: usize) -> MonitorResult<Self> {
        let name = inner.name().to_string();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let worker = thread::Builder::new()
            .name(format!("rfghost-sink-{}", name))
            .spawn(move || drain(rx, inner))
            .map_err(MonitorError::Io)?;

        Ok(Self {
            name,
            tx: Some(tx),
            worker: Some(worker),
            filter: None,
        })
    }

    /// Skip records the inner sink would ignore, so they never take a queue slot
    pub fn filtered(mut self, filter: impl Fn(&OutputRecord) -> bool + Send + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

fn drain(mut rx: mpsc::Receiver<OutputRecord>, mut inner: Box<dyn OutputSink>) {
    while let Some(record) = rx.blocking_recv() {
        if let Err(e) = inner.publish(&record) {
            log::error!("Sink '{}' failed: {}", inner.name(), e);
        }
    }
    if let Err(e) = inner.flush() {
        log::warn!("Sink '{}' flush failed: {}", inner.name(), e);
    }
}

impl OutputSink for BackgroundSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
        if let Some(filter) = &self.filter {
            if !filter(record) {
                return Ok(());
            }
        }
        let tx = self.tx.as_ref().ok_or(SinkError::Stopped)?;
        tx.try_send(record.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::QueueFull,
            TrySendError::Closed(_) => SinkError::Stopped,
        })
    }

    /// Close the queue and wait for the worker to deliver what is left
    fn flush(&mut self) -> Result<(), SinkError> {
        self.tx = None;
        if let Some(worker) = self.worker.take() {
            worker.join().map_err(|_| SinkError::Stopped)?;
        }
        Ok(())
    }
}

// ============================================================================
// TEST SINK
// ============================================================================

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Collects records in memory; clones share the same storage
    #[derive(Clone, Default)]
    pub struct MemorySink {
        pub records: Arc<Mutex<Vec<OutputRecord>>>,
        pub flushed: Arc<Mutex<bool>>,
    }

    impl MemorySink {
        pub fn records(&self) -> Vec<OutputRecord> {
            self.records.lock().clone()
        }
    }

    impl OutputSink for MemorySink {
        fn name(&self) -> &str {
            "memory"
        }

        fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
            self.records.lock().push(record.clone());
            Ok(())
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            *self.flushed.lock() = true;
            Ok(())
        }
    }

    /// Takes `delay` per record, like a webhook waiting on a dead host
    #[derive(Clone, Default)]
    pub struct SlowSink {
        pub delay: std::time::Duration,
        pub inner: MemorySink,
    }

    impl OutputSink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        fn publish(&mut self, record: &OutputRecord) -> Result<(), SinkError> {
            std::thread::sleep(self.delay);
            self.inner.publish(record)
        }

        fn flush(&mut self) -> Result<(), SinkError> {
            self.inner.flush()
        }
    }

    /// Always fails, to check that one bad sink does not block others
    pub struct FailingSink;

    impl OutputSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn publish(&mut self, _record: &OutputRecord) -> Result<(), SinkError> {
            Err(SinkError::Network {
                message: "connection refused".into(),
            })
        }
    }
}
