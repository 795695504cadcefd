//! Run request: everything the engine needs for one load-generation run

use std::time::Duration;
use crate::host::ProcessorTopology;
use crate::profile::LoadProfile;
use crate::{LoadError, Result, PERIOD};

/// Largest segment count that still leaves a 1 ms sub-period
pub const MAX_SEGMENTS: u32 = PERIOD.as_millis() as u32;

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Host contexts to saturate, one worker each
    pub topology: ProcessorTopology,
    /// Per-worker run length; `None` runs until stopped
    pub duration: Option<Duration>,
    /// Target utilization policy
    pub profile: LoadProfile,
    /// Sub-periods per duty-cycle period; 1 is the steady worker
    pub segments: u32,
}

impl RunRequest {
    /// Create a request; `duration_millis == 0` means run until stopped
    pub fn new(topology: ProcessorTopology, duration_millis: u64, profile: LoadProfile) -> Self {
        Self {
            topology,
            duration: None,
            profile,
            segments: 1,
        }
        .with_duration(Duration::from_millis(duration_millis))
    }

    pub fn unbounded(topology: ProcessorTopology, profile: LoadProfile) -> Self {
        Self::new(topology, 0, profile)
    }

    /// Set the run length; a zero duration makes the run unbounded
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = if duration.is_zero() { None } else { Some(duration) };
        self
    }

    /// Use the alternating worker with `segments` sub-periods
    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    pub fn num_workers(&self) -> usize {
        self.topology.num_workers()
    }

    pub fn is_unbounded(&self) -> bool {
        self.duration.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        self.profile.validate()?;
        self.topology.validate()?;

        if self.segments == 0 || self.segments > MAX_SEGMENTS {
            return Err(LoadError::ConfigError(format!(
                "Segments must be between 1 and {}, got {}",
                MAX_SEGMENTS, self.segments
            )));
        }

        Ok(())
    }
}
