//! Windowed Sample Buffer
//!
//! Fixed-capacity, arrival-ordered store of recent readings for one
//! channel. Oldest sample is evicted on overflow. Readers only ever get
//! an immutable snapshot copy, so a status query never blocks a push for
//! longer than the copy itself.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::logic::source::Sample;

// ============================================================================
// BUFFER
// ============================================================================

#[derive(Debug, Clone)]
pub struct WindowedBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    min_samples: usize,
}

impl WindowedBuffer {
    /// `capacity` is raised to at least `min_samples` (and 1)
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        let capacity = capacity.max(min_samples).max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            min_samples,
        }
    }

    /// Capacity covering `duration_s` seconds at `sample_rate_hz`
    pub fn capacity_for(duration_s: f64, sample_rate_hz: f64, min_samples: usize) -> usize {
        let span = (duration_s * sample_rate_hz).ceil();
        let span = if span.is_finite() && span > 0.0 { span as usize } else { 0 };
        span.max(min_samples).max(1)
    }

    /// Append, evicting the oldest sample when full
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            samples: self.samples.iter().copied().collect(),
            min_samples: self.min_samples,
        }
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.samples.len(),
            capacity: self.capacity,
            required_size: self.min_samples,
            is_ready: self.samples.len() >= self.min_samples,
            fill_percent: (self.samples.len() as f32 / self.capacity as f32 * 100.0).min(100.0),
        }
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable, cheaply clonable view of a buffer at one instant
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    samples: Arc<[Sample]>,
    min_samples: usize,
}

impl BufferSnapshot {
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_sufficient(&self) -> bool {
        self.samples.len() >= self.min_samples
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}

/// Buffer status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub required_size: usize,
    pub is_ready: bool,
    pub fill_percent: f32,
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Lock-guarded buffer shared between the scan loop (writer) and status
/// readers. Never hands out a reference into the buffer.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<RwLock<WindowedBuffer>>,
}

impl SharedBuffer {
    pub fn new(buffer: WindowedBuffer) -> Self {
        Self {
            inner: Arc::new(RwLock::new(buffer)),
        }
    }

    /// Push a complete batch under one lock
    pub fn extend(&self, samples: &[Sample]) {
        let mut buffer = self.inner.write();
        for sample in samples {
            buffer.push(*sample);
        }
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        self.inner.read().snapshot()
    }

    pub fn status(&self) -> BufferStatus {
        self.inner.read().status()
    }
}
