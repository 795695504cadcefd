//! Data models module
//!
//! Run summaries and per-worker reports produced by the engine.

pub mod summary;

// Re-export commonly used types
pub use summary::{RunOutcome, RunSummary, WorkerReport};
