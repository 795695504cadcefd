//! Processor topology discovery
//!
//! Detected once at startup and handed to the engine as a plain value so the
//! engine can be driven with synthetic core counts.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::{LoadError, Result};

/// Number of cores and hardware threads per core to saturate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorTopology {
    pub num_cores: usize,
    pub num_threads_per_core: usize,
}

impl ProcessorTopology {
    pub fn new(num_cores: usize, num_threads_per_core: usize) -> Self {
        Self {
            num_cores,
            num_threads_per_core,
        }
    }

    /// Query the host for its physical core and logical processor counts
    pub fn detect() -> Self {
        Self::from_counts(num_cpus::get_physical(), num_cpus::get())
    }

    /// Derive threads per core from physical and logical counts
    pub fn from_counts(physical: usize, logical: usize) -> Self {
        let num_cores = physical.max(1);
        let num_threads_per_core = (logical / num_cores).max(1);
        Self {
            num_cores,
            num_threads_per_core,
        }
    }

    /// One worker per hardware execution context, saturating on overflow
    pub fn num_workers(&self) -> usize {
        self.num_cores.saturating_mul(self.num_threads_per_core)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_cores == 0 {
            return Err(LoadError::ConfigError(
                "Number of cores must be greater than 0".to_string(),
            ));
        }
        if self.num_threads_per_core == 0 {
            return Err(LoadError::ConfigError(
                "Number of threads per core must be greater than 0".to_string(),
            ));
        }

        const MAX_WORKERS: usize = 4096;
        let workers = self
            .num_cores
            .checked_mul(self.num_threads_per_core)
            .ok_or_else(|| {
                LoadError::ConfigError(format!(
                    "Too many workers: {} cores x {} threads per core overflows (max: {})",
                    self.num_cores, self.num_threads_per_core, MAX_WORKERS
                ))
            })?;
        if workers > MAX_WORKERS {
            return Err(LoadError::ConfigError(format!(
                "Too many workers: {} (max: {})",
                workers, MAX_WORKERS
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ProcessorTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cores x {} threads per core ({} logical processors)",
            self.num_cores,
            self.num_threads_per_core,
            self.num_workers()
        )
    }
}
