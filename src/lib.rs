//! cpuload - synthetic CPU load generator
//!
//! Drives host CPU utilization towards a fixed level, a randomized range, or a
//! time-of-day dependent range by running one busy/sleep duty-cycle worker per
//! logical processor.

use std::fmt;
use std::time::Duration;

pub mod cli;
pub mod config;
pub mod engine;
pub mod host;
pub mod models;
pub mod profile;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum LoadError {
    /// Load profile bounds are out of range or inconsistent
    InvalidProfile(String),
    /// Configuration or run request validation error
    ConfigError(String),
    /// A single worker was interrupted before its run finished
    WorkerInterrupted {
        worker: usize,
        reason: String,
    },
    /// One or more workers did not finish cleanly
    AggregateRunFailure {
        /// Ids of the workers that were interrupted or died
        failed: Vec<usize>,
        /// Number of workers in the run
        total: usize,
    },
    /// Worker management error (spawn, join, engine reuse)
    WorkerError(String),
    /// I/O operation failed
    IoError(std::io::Error),
    /// Run history persistence error
    PersistenceError(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::InvalidProfile(msg) => write!(f, "Invalid load profile: {}", msg),
            LoadError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            LoadError::WorkerInterrupted { worker, reason } => {
                write!(f, "Worker {} interrupted: {}", worker, reason)
            }
            LoadError::AggregateRunFailure { failed, total } => write!(
                f,
                "{} of {} workers did not complete cleanly: {:?}",
                failed.len(),
                total,
                failed
            ),
            LoadError::WorkerError(msg) => write!(f, "Worker error: {}", msg),
            LoadError::IoError(err) => write!(f, "I/O error: {}", err),
            LoadError::PersistenceError(msg) => write!(f, "Run history error: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::IoError(err)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for LoadError {
    fn from(err: toml::de::Error) -> Self {
        LoadError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for LoadError {
    fn from(err: toml::ser::Error) -> Self {
        LoadError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for cpuload operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Error handling utilities
pub mod error {
    use super::LoadError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &LoadError) -> String {
        match error {
            LoadError::InvalidProfile(msg) => format!(
                "Invalid load profile: {}. Loads are fractions between 0.0 and 1.0 and min must not exceed max.",
                msg
            ),
            LoadError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            LoadError::AggregateRunFailure { failed, total } => format!(
                "Load generation did not complete cleanly on {} of {} workers (ids {:?}).",
                failed.len(),
                total,
                failed
            ),
            LoadError::PersistenceError(_) => {
                "Failed to save run history. Check disk space and permissions.".to_string()
            }
            _ => error.to_string(),
        }
    }

    /// Process exit code for an error
    pub fn exit_code(error: &LoadError) -> i32 {
        match error {
            LoadError::InvalidProfile(_) | LoadError::ConfigError(_) => 2,
            LoadError::WorkerInterrupted { .. } | LoadError::AggregateRunFailure { .. } => 3,
            _ => 1,
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "cpuload";
pub const CONFIG_FILE: &str = "cpuload.toml";
pub const HISTORY_FILE: &str = "history.json";
pub const MAX_RUN_HISTORY: usize = 100;

/// Wall-clock length of one duty-cycle period
pub const PERIOD: Duration = Duration::from_millis(100);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_failure_display() {
        let err = LoadError::AggregateRunFailure {
            failed: vec![1, 3],
            total: 4,
        };
        assert_eq!(
            err.to_string(),
            "2 of 4 workers did not complete cleanly: [1, 3]"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(error::exit_code(&LoadError::InvalidProfile("x".into())), 2);
        assert_eq!(
            error::exit_code(&LoadError::AggregateRunFailure {
                failed: vec![0],
                total: 1
            }),
            3
        );
        assert_eq!(error::exit_code(&LoadError::WorkerError("x".into())), 1);
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;
        let err = LoadError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.source().is_some());
        assert!(LoadError::ConfigError("x".into()).source().is_none());
    }
}
