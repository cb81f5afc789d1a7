//! Features Module - Feature extraction from channel windows
//!
//! ## Structure
//! - `stats`: pure numeric helpers (mean, population std, entropy)
//! - `vector`: `FeatureVector` and the published `Statistics` subset
//! - `extract`: `FeatureExtractor` (snapshot -> vector)

pub mod stats;
pub mod vector;
pub mod extract;


pub use vector::{FeatureVector, Statistics};
pub use extract::FeatureExtractor;
pub use stats::DEFAULT_ENTROPY_BINS;
