//! Utility functions module
//!
//! Contains helpers for duration parsing and human-readable formatting.

pub mod units;

// Re-export commonly used functions
pub use units::{format_duration, format_load, format_run_duration, parse_duration};
