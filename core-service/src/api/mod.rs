//! API Module
//!
//! Read-only query surface over a running scanner.
//!
//! Usage:
//! - `api::scan_status(&handle)` - scan state + one entry per channel

pub mod status;

pub use status::{scan_status, ScanStatus};
