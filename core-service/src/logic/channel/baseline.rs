//! Variance Baseline - rolling std_dev history for burst detection
//!
//! Windows that fired StaticBurst are held aside instead of folded in,
//! so a short burst cannot drag the baseline up and hide itself. Once
//! `SUSTAINED_BURST_CYCLES` bursts arrive back to back the held values
//! replace the history: the channel's noise level has moved for good.

use std::collections::VecDeque;

use crate::logic::anomaly::rules::{MIN_BASELINE_CYCLES, SUSTAINED_BURST_CYCLES};

#[derive(Debug, Clone)]
pub struct VarianceBaseline {
    history: VecDeque<f64>,
    pending: Vec<f64>,
    window: usize,
}

fn is_valid(std_dev: f64) -> bool {
    if !std_dev.is_finite() || std_dev < 0.0 {
        log::debug!("Ignoring invalid std_dev {} for baseline", std_dev);
        return false;
    }
    true
}

impl VarianceBaseline {
    pub fn new(window: usize) -> Self {
        let window = window.max(MIN_BASELINE_CYCLES);
        Self {
            history: VecDeque::with_capacity(window),
            pending: Vec::with_capacity(SUSTAINED_BURST_CYCLES),
            window,
        }
    }

    /// Record one quiet cycle's std_dev; ends any burst run
    pub fn observe(&mut self, std_dev: f64) {
        if !is_valid(std_dev) {
            return;
        }
        self.pending.clear();
        self.push(std_dev);
    }

    /// Record a cycle that fired StaticBurst.
    ///
    /// Returns true when this burst completed a sustained run and the
    /// baseline was rebuilt from it.
    pub fn observe_burst(&mut self, std_dev: f64) -> bool {
        if !is_valid(std_dev) {
            return false;
        }
        self.pending.push(std_dev);
        if self.pending.len() < SUSTAINED_BURST_CYCLES {
            return false;
        }

        self.history.clear();
        for value in std::mem::take(&mut self.pending) {
            self.push(value);
        }
        true
    }

    /// Mean of the history once it has enough cycles
    pub fn current(&self) -> Option<f64> {
        if self.history.len() < MIN_BASELINE_CYCLES {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    /// Cycles currently averaged into the baseline
    pub fn cycles(&self) -> usize {
        self.history.len()
    }

    fn push(&mut self, std_dev: f64) {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(std_dev);
    }
}
