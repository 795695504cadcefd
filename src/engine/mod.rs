//! Load generation engine module
//!
//! Contains the duty-cycle worker, the per-worker signal used for stop and
//! interrupt, and the coordinator that spawns and joins workers.

pub mod manager;
pub mod request;
pub mod signal;
pub mod worker;

// Re-export commonly used types
pub use manager::{run, LoadEngine, StopHandle, WorkerInfo};
pub use request::{RunRequest, MAX_SEGMENTS};
pub use signal::{Signal, WorkerSignal};
pub use worker::{DutyCycle, WorkerStatus};
