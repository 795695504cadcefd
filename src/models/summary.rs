//! Run summary data models
//!
//! Structures describing how a load-generation run went, per worker and in
//! aggregate. Serializable for the run history file.

use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::engine::WorkerStatus;
use crate::host::ProcessorTopology;

/// How a run that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every worker ran for the requested duration
    Completed,
    /// The run was stopped by its caller
    Stopped,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Stopped => write!(f, "stopped"),
        }
    }
}

/// What one worker did during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub id: usize,
    pub status: WorkerStatus,
    /// Duty-cycle periods started
    pub periods: u64,
    /// Time spent runnable (not sleeping)
    #[serde(with = "duration_serde")]
    pub busy: Duration,
    /// Time spent sleeping
    #[serde(with = "duration_serde")]
    pub slept: Duration,
    /// Wall-clock lifetime of the worker
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Average resolved target over all periods
    pub mean_target: f64,
    /// CPU time measured on the worker thread, where supported
    #[serde(with = "option_duration_serde")]
    pub cpu_time: Option<Duration>,
}

impl WorkerReport {
    /// Fraction of busy+sleep time the worker stayed runnable
    pub fn duty_cycle_utilization(&self) -> f64 {
        let total = (self.busy + self.slept).as_secs_f64();
        if total > 0.0 {
            self.busy.as_secs_f64() / total
        } else {
            0.0
        }
    }

    /// CPU time over wall-clock time, if CPU time was measured
    pub fn measured_utilization(&self) -> Option<f64> {
        let cpu = self.cpu_time?;
        let elapsed = self.elapsed.as_secs_f64();
        if elapsed > 0.0 {
            Some(cpu.as_secs_f64() / elapsed)
        } else {
            None
        }
    }
}

/// Complete result of a run that finished without failed workers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Timestamp when the run started
    pub started_at: DateTime<Utc>,
    pub topology: ProcessorTopology,
    /// Requested duration, `None` for a run until stopped
    #[serde(with = "option_duration_serde")]
    pub duration: Option<Duration>,
    /// Description of the load profile
    pub profile: String,
    pub segments: u32,
    pub outcome: RunOutcome,
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    pub workers: Vec<WorkerReport>,
}

impl RunSummary {
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Period-weighted mean of the resolved targets across all workers
    pub fn mean_target_load(&self) -> f64 {
        let periods: u64 = self.workers.iter().map(|w| w.periods).sum();
        if periods == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .workers
            .iter()
            .map(|w| w.mean_target * w.periods as f64)
            .sum();
        weighted / periods as f64
    }

    /// Average duty-cycle utilization across workers
    pub fn duty_cycle_utilization(&self) -> f64 {
        if self.workers.is_empty() {
            return 0.0;
        }
        self.workers
            .iter()
            .map(WorkerReport::duty_cycle_utilization)
            .sum::<f64>()
            / self.workers.len() as f64
    }

    /// Average measured CPU utilization across workers that report CPU time
    pub fn measured_utilization(&self) -> Option<f64> {
        let samples: Vec<f64> = self
            .workers
            .iter()
            .filter_map(WorkerReport::measured_utilization)
            .collect();
        if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<f64>() / samples.len() as f64)
        }
    }

    /// Get a human-readable summary of the run
    pub fn summary(&self) -> String {
        let measured = match self.measured_utilization() {
            Some(u) => format!("{:.1}%", u * 100.0),
            None => "n/a".to_string(),
        };
        format!(
            "{} - {} - {} workers - {} - {:.2}s - target {:.1}% - duty cycle {:.1}% - measured {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.outcome,
            self.num_workers(),
            self.profile,
            self.elapsed.as_secs_f64(),
            self.mean_target_load() * 100.0,
            self.duty_cycle_utilization() * 100.0,
            measured
        )
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}

mod option_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = Option::<u64>::deserialize(deserializer)?;
        Ok(nanos.map(Duration::from_nanos))
    }
}
