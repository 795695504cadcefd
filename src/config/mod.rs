//! Configuration management module
//!
//! Handles loading, saving, and validation of the load generator
//! configuration, and turns it into a run request.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::engine::{RunRequest, MAX_SEGMENTS};
use crate::host::ProcessorTopology;
use crate::profile::{LoadProfile, LoadRange};
use crate::{LoadError, Result, APP_NAME, CONFIG_FILE};

pub mod persistence;

pub use persistence::RunHistory;

pub const DEFAULT_MIN_LOAD: f64 = 0.3;
pub const DEFAULT_MAX_LOAD: f64 = 0.5;
/// Seconds; zero runs until stopped
pub const DEFAULT_DURATION: u64 = 0;

/// Load generator configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadConfig {
    /// Lower bound of the normal-hours load range (0.0 to 1.0)
    pub min_cpu_load_percentage: f64,
    /// Upper bound of the normal-hours load range (0.0 to 1.0)
    pub max_cpu_load_percentage: f64,
    /// Fixed load; takes precedence over the range when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_load_percentage: Option<f64>,
    /// Run length in seconds, 0 runs until stopped
    pub duration: u64,
    /// Sub-periods per duty-cycle period; 1 is the steady worker
    pub segments: u32,
    /// Override for the detected physical core count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_cores: Option<usize>,
    /// Override for the detected threads per core
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads_per_core: Option<usize>,
    /// Lower-load band applied during quiet hours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
}

/// Quiet-hours band for time-of-day profiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuietHours {
    pub min_cpu_load_percentage: f64,
    pub max_cpu_load_percentage: f64,
    /// First quiet hour (local time, inclusive)
    pub start_hour: u32,
    /// Last quiet hour (local time, inclusive)
    pub end_hour: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            min_cpu_load_percentage: 0.24,
            max_cpu_load_percentage: 0.26,
            start_hour: 21,
            end_hour: 7,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            min_cpu_load_percentage: DEFAULT_MIN_LOAD,
            max_cpu_load_percentage: DEFAULT_MAX_LOAD,
            cpu_load_percentage: None,
            duration: DEFAULT_DURATION,
            segments: 1,
            num_cores: None,
            num_threads_per_core: None,
            quiet_hours: None,
        }
    }
}

impl LoadConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the load profile this configuration describes
    pub fn profile(&self) -> Result<LoadProfile> {
        if let Some(load) = self.cpu_load_percentage {
            return LoadProfile::fixed(load);
        }
        let normal = LoadRange::new(self.min_cpu_load_percentage, self.max_cpu_load_percentage)?;
        match self.quiet_hours {
            Some(quiet) => LoadProfile::time_of_day(
                normal,
                LoadRange::new(quiet.min_cpu_load_percentage, quiet.max_cpu_load_percentage)?,
                quiet.start_hour,
                quiet.end_hour,
            ),
            None => Ok(LoadProfile::Range(normal)),
        }
    }

    /// Apply the core-count overrides to a detected topology
    pub fn topology(&self, detected: ProcessorTopology) -> ProcessorTopology {
        ProcessorTopology::new(
            self.num_cores.unwrap_or(detected.num_cores),
            self.num_threads_per_core.unwrap_or(detected.num_threads_per_core),
        )
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.profile()?;

        if self.segments == 0 || self.segments > MAX_SEGMENTS {
            return Err(LoadError::ConfigError(format!(
                "Segments must be between 1 and {}, got {}",
                MAX_SEGMENTS, self.segments
            )));
        }

        if self.num_cores == Some(0) {
            return Err(LoadError::ConfigError(
                "Number of cores must be greater than 0".to_string(),
            ));
        }
        if self.num_threads_per_core == Some(0) {
            return Err(LoadError::ConfigError(
                "Number of threads per core must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build a validated run request for `detected` host topology
    pub fn to_request(&self, detected: ProcessorTopology) -> Result<RunRequest> {
        self.validate()?;
        let request = RunRequest::new(self.topology(detected), 0, self.profile()?)
            .with_duration(Duration::from_secs(self.duration))
            .with_segments(self.segments);
        request.validate()?;
        Ok(request)
    }

    /// Set the normal-hours load range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min_cpu_load_percentage = min;
        self.max_cpu_load_percentage = max;
        self
    }

    /// Set a fixed load
    pub fn with_fixed_load(mut self, load: f64) -> Self {
        self.cpu_load_percentage = Some(load);
        self
    }

    /// Set the run length in seconds
    pub fn with_duration(mut self, seconds: u64) -> Self {
        self.duration = seconds;
        self
    }

    /// Set the number of alternating segments
    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    /// Set the quiet-hours band
    pub fn with_quiet_hours(mut self, quiet: QuietHours) -> Self {
        self.quiet_hours = Some(quiet);
        self
    }

    /// Override the core counts
    pub fn with_topology(mut self, cores: usize, threads_per_core: usize) -> Self {
        self.num_cores = Some(cores);
        self.num_threads_per_core = Some(threads_per_core);
        self
    }

    /// Load configuration from `path`; `.json` files are JSON, anything else TOML
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LoadError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                LoadError::ConfigError(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                LoadError::ConfigError(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    /// Save configuration to `path` in the format its extension names
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoadError::ConfigError(format!(
                        "Failed to create config directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| {
                LoadError::ConfigError(format!("Failed to serialize configuration: {}", e))
            })?
        } else {
            toml::to_string_pretty(self)?
        };

        fs::write(path, content).map_err(|e| {
            LoadError::ConfigError(format!(
                "Failed to write config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/cpuload/cpuload.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            LoadError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}
