//! Command-line front end
//!
//! Argument parsing, layering of CLI flags over the configuration file, and
//! running the engine on a blocking task with Ctrl-C handling and progress.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use crate::config::LoadConfig;
use crate::engine::{LoadEngine, RunRequest};
use crate::host::ProcessorTopology;
use crate::models::RunSummary;
use crate::util::parse_duration;
use crate::{LoadError, Result};

#[derive(Parser, Debug)]
#[command(name = "cpuload", version, about = "Drive host CPU utilization to a target level or range")]
pub struct Args {
    /// Path to a TOML or JSON configuration file.
    /// Defaults to $CONFIG_HOME/cpuload/cpuload.toml when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Lower bound of the load range (0.0 to 1.0).
    #[arg(long)]
    pub min: Option<f64>,

    /// Upper bound of the load range (0.0 to 1.0).
    #[arg(long)]
    pub max: Option<f64>,

    /// Fixed load (0.0 to 1.0); overrides the range.
    #[arg(long)]
    pub load: Option<f64>,

    /// Run length, e.g. "90", "5m" or "1h 30m". 0 runs until stopped.
    #[arg(long, short = 'd', value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Busy/sleep segments per 100 ms period (alternating load).
    #[arg(long)]
    pub segments: Option<u32>,

    /// Lower bound of the quiet-hours load range.
    #[arg(long)]
    pub quiet_min: Option<f64>,

    /// Upper bound of the quiet-hours load range.
    #[arg(long)]
    pub quiet_max: Option<f64>,

    /// First quiet hour (0-23, local time).
    #[arg(long)]
    pub quiet_start: Option<u32>,

    /// Last quiet hour (0-23, local time).
    #[arg(long)]
    pub quiet_end: Option<u32>,

    /// Override the detected number of physical cores.
    #[arg(long)]
    pub cores: Option<usize>,

    /// Override the detected number of threads per core.
    #[arg(long)]
    pub threads_per_core: Option<usize>,

    /// Save the effective configuration to the default config file.
    #[arg(long)]
    pub save_config: bool,

    /// Append the run summary to the run history.
    #[arg(long)]
    pub record: bool,

    /// Print the last N recorded runs and exit.
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,

    /// Disable the progress display.
    #[arg(long)]
    pub no_progress: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Layer the command-line flags over `config`
    pub fn apply(&self, mut config: LoadConfig) -> LoadConfig {
        if let Some(min) = self.min {
            config.min_cpu_load_percentage = min;
        }
        if let Some(max) = self.max {
            config.max_cpu_load_percentage = max;
        }
        if let Some(load) = self.load {
            config.cpu_load_percentage = Some(load);
        }
        if let Some(duration) = self.duration {
            config.duration = whole_seconds(duration);
        }
        if let Some(segments) = self.segments {
            config.segments = segments;
        }
        if let Some(cores) = self.cores {
            config.num_cores = Some(cores);
        }
        if let Some(threads) = self.threads_per_core {
            config.num_threads_per_core = Some(threads);
        }

        let quiet_flags = self.quiet_min.is_some()
            || self.quiet_max.is_some()
            || self.quiet_start.is_some()
            || self.quiet_end.is_some();
        if quiet_flags {
            let mut quiet = config.quiet_hours.unwrap_or_default();
            if let Some(min) = self.quiet_min {
                quiet.min_cpu_load_percentage = min;
            }
            if let Some(max) = self.quiet_max {
                quiet.max_cpu_load_percentage = max;
            }
            if let Some(start) = self.quiet_start {
                quiet.start_hour = start;
            }
            if let Some(end) = self.quiet_end {
                quiet.end_hour = end;
            }
            config.quiet_hours = Some(quiet);
        }

        config
    }

    /// Build the run request, keeping sub-second precision of `--duration`
    pub fn request(&self, config: &LoadConfig, detected: ProcessorTopology) -> Result<RunRequest> {
        let request = config.to_request(detected)?;
        Ok(match self.duration {
            Some(duration) => request.with_duration(duration),
            None => request,
        })
    }
}

/// Seconds for the config file, rounded up so a bounded run stays bounded
fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

fn progress_bar(duration: Option<Duration>) -> ProgressBar {
    match duration {
        Some(d) => {
            let pb = ProgressBar::new(d.as_millis() as u64);
            pb.set_style(
                ProgressStyle::with_template("{spinner} [{elapsed_precise}] {wide_bar} {percent}% {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg} (Ctrl-C to stop)")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}

/// Run `engine` to completion, stopping it on Ctrl-C and showing progress
pub async fn run_with_progress(mut engine: LoadEngine, show_progress: bool) -> Result<RunSummary> {
    let stop = engine.stop_handle();
    let duration = engine.request().duration;
    let total = engine.num_workers();

    let ctrl_c_stop = stop.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping workers");
            ctrl_c_stop.stop();
        }
    });

    let pb = show_progress.then(|| progress_bar(duration));
    let progress_task = pb.clone().map(|pb| {
        let stop = stop.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_millis(200));
            loop {
                ticker.tick().await;
                match duration {
                    Some(d) => pb.set_position(start.elapsed().min(d).as_millis() as u64),
                    None => pb.tick(),
                }
                pb.set_message(format!("{}/{} workers active", stop.active_workers(), total));
            }
        })
    });

    let joined = tokio::task::spawn_blocking(move || engine.run()).await;

    signal_task.abort();
    if let Some(task) = progress_task {
        task.abort();
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    joined.map_err(|e| LoadError::WorkerError(format!("Engine task failed: {}", e)))?
}
