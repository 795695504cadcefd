//! Run history persistence module
//!
//! Handles saving, loading, and rotation of run summaries.

use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::models::RunSummary;
use crate::{LoadError, Result, APP_NAME, HISTORY_FILE, MAX_RUN_HISTORY};

/// Run history storage manager
#[derive(Debug)]
pub struct RunHistory {
    history_path: PathBuf,
}

/// History file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    runs: Vec<RunSummary>,
}

impl RunHistory {
    /// Create a history manager at the standard location
    pub fn new() -> Result<Self> {
        Ok(Self {
            history_path: Self::history_file_path()?,
        })
    }

    /// Create a history manager backed by `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            history_path: path.into(),
        }
    }

    /// Get the standard history file path
    /// Uses $DATA_HOME/cpuload/history.json
    pub fn history_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            LoadError::PersistenceError("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.history_path
    }

    /// Load all runs from the history file
    pub fn load_runs(&self) -> Result<Vec<RunSummary>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.history_path).map_err(|e| {
            LoadError::PersistenceError(format!(
                "Failed to read history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        let file: HistoryFile = serde_json::from_str(&content).map_err(|e| {
            LoadError::PersistenceError(format!(
                "Failed to parse history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        Ok(file.runs)
    }

    /// Append a run, keeping only the most recent MAX_RUN_HISTORY entries
    pub fn append_run(&self, run: RunSummary) -> Result<()> {
        let mut runs = self.load_runs()?;
        runs.push(run);

        if runs.len() > MAX_RUN_HISTORY {
            let skip_count = runs.len() - MAX_RUN_HISTORY;
            runs.drain(..skip_count);
        }

        self.save_runs(runs)
    }

    fn save_runs(&self, runs: Vec<RunSummary>) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LoadError::PersistenceError(format!(
                    "Failed to create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(&HistoryFile { version: 1, runs })?;

        fs::write(&self.history_path, content).map_err(|e| {
            LoadError::PersistenceError(format!(
                "Failed to write history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    pub fn count_runs(&self) -> Result<usize> {
        Ok(self.load_runs()?.len())
    }

    /// Remove the history file
    pub fn clear(&self) -> Result<()> {
        if self.history_path.exists() {
            fs::remove_file(&self.history_path).map_err(|e| {
                LoadError::PersistenceError(format!(
                    "Failed to remove history file {}: {}",
                    self.history_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// The most recent `count` runs, oldest first
    pub fn recent_runs(&self, count: usize) -> Result<Vec<RunSummary>> {
        let mut runs = self.load_runs()?;
        if runs.len() > count {
            runs.drain(..runs.len() - count);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ProcessorTopology;
    use crate::models::RunOutcome;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_run(segments: u32) -> RunSummary {
        RunSummary {
            started_at: Utc::now(),
            topology: ProcessorTopology::new(2, 2),
            duration: Some(Duration::from_secs(10)),
            profile: "30.0%-50.0%".to_string(),
            segments,
            outcome: RunOutcome::Completed,
            elapsed: Duration::from_secs(10),
            workers: Vec::new(),
        }
    }

    #[test]
    fn test_load_empty_history() {
        let temp_dir = TempDir::new().unwrap();
        let history = RunHistory::at(temp_dir.path().join("history.json"));
        assert!(history.load_runs().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load_run() {
        let temp_dir = TempDir::new().unwrap();
        let history = RunHistory::at(temp_dir.path().join("nested").join("history.json"));

        history.append_run(create_test_run(4)).unwrap();

        let runs = history.load_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].segments, 4);
        assert_eq!(runs[0].topology, ProcessorTopology::new(2, 2));
    }

    #[test]
    fn test_history_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let history = RunHistory::at(temp_dir.path().join("history.json"));

        for i in 0..MAX_RUN_HISTORY + 10 {
            history.append_run(create_test_run(i as u32)).unwrap();
        }

        let runs = history.load_runs().unwrap();
        assert_eq!(runs.len(), MAX_RUN_HISTORY);
        assert_eq!(runs[0].segments, 10);
        assert_eq!(runs[runs.len() - 1].segments, (MAX_RUN_HISTORY + 10 - 1) as u32);
    }

    #[test]
    fn test_recent_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let history = RunHistory::at(temp_dir.path().join("history.json"));

        for i in 0..10 {
            history.append_run(create_test_run(i)).unwrap();
        }

        let recent = history.recent_runs(5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].segments, 5);
        assert_eq!(recent[4].segments, 9);
        assert_eq!(history.recent_runs(20).unwrap().len(), 10);

        history.clear().unwrap();
        assert_eq!(history.count_runs().unwrap(), 0);
    }

    #[test]
    fn test_history_file_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        let history = RunHistory::at(&path);

        history.append_run(create_test_run(1)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let file: HistoryFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.version, 1);
        assert_eq!(file.runs.len(), 1);
    }

    #[test]
    fn test_corrupt_history_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RunHistory::at(&path).load_runs(),
            Err(LoadError::PersistenceError(_))
        ));
    }
}
