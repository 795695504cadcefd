//! Host capability module
//!
//! Processor topology discovery and per-thread CPU time measurement.

pub mod cputime;
pub mod topology;

// Re-export commonly used types
pub use cputime::thread_cpu_time;
pub use topology::ProcessorTopology;
