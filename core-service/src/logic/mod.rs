//! Logic Module - Acquisition & Classification Engine
//!
//! ## Pipeline
//! `scheduler` -> `source` -> `buffer` (per `channel`) -> `features`
//! -> `anomaly` -> `emitter` -> sinks
//!
//! - `source/` - Transceiver boundary, sample adapter, simulator
//! - `buffer` - Windowed FIFO with copy-on-read snapshots
//! - `features/` - Statistics, entropy, frequency delta
//! - `anomaly/` - Ordered rule classifier + pattern templates
//! - `channel/` - Per-frequency state (buffer, baseline, last result)
//! - `scheduler` - Round-robin scan loop
//! - `emitter/` - Output records and sinks (log, JSONL, webhook)

pub mod error;
pub mod config;

pub mod source;
pub mod buffer;
pub mod features;
pub mod anomaly;
pub mod channel;
pub mod scheduler;
pub mod emitter;
