//! Anomaly Module
//!
//! Turns feature vectors into anomaly events. This is the CORE STEP -
//! where a window becomes GhostEcho / VoidPulse / StaticBurst /
//! FrequencyShift / Pattern.
//!
//! ## Structure
//! - `types`: `AnomalyType`, `AnomalyEvent`, `Classification`
//! - `rules`: thresholds and documented defaults
//! - `pattern`: template similarity
//! - `classifier`: ordered rule evaluation
//!
//! ## Usage
//! ```ignore
//! use crate::logic::anomaly::{AnomalyClassifier, RuleInput};
//!
//! let events = classifier.classify(&input, frequency_hz, now)?;
//! for event in &events {
//!     log::warn!("{} @ {} Hz ({:.2})", event.anomaly_type, event.frequency_hz, event.confidence);
//! }
//! ```

pub mod types;
pub mod rules;
pub mod pattern;
pub mod classifier;

#[cfg(test)]
mod tests;

pub use types::{AnomalyEvent, Classification};
pub use rules::AnomalyThresholds;
pub use pattern::PatternTemplate;
pub use classifier::{AnomalyClassifier, RuleInput};
