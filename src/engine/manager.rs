//! Load engine coordinator
//!
//! Expands a run request into one worker thread per hardware context, starts
//! them all, and joins every one of them before returning. Stop and
//! per-worker interrupt requests reach the workers through a cloneable
//! `StopHandle`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use chrono::Utc;
use tracing::{error, info, warn};
use crate::engine::request::RunRequest;
use crate::engine::signal::WorkerSignal;
use crate::engine::worker::{run_worker, DutyCycle, WorkerContext, WorkerStatus};
use crate::models::{RunOutcome, RunSummary, WorkerReport};
use crate::profile::{HourSource, LocalClock, LoadProfile};
use crate::{LoadError, Result, PERIOD};

/// Individual worker information
#[derive(Debug)]
pub struct WorkerInfo {
    /// Worker id, also its index in the engine's worker table
    pub id: usize,
    /// Current status of the worker
    pub status: WorkerStatus,
    signal: Arc<WorkerSignal>,
    handle: Option<JoinHandle<WorkerReport>>,
    report: Option<WorkerReport>,
}

impl WorkerInfo {
    fn new(id: usize) -> Self {
        Self {
            id,
            status: WorkerStatus::Idle,
            signal: Arc::new(WorkerSignal::new()),
            handle: None,
            report: None,
        }
    }
}

/// Cloneable handle for stopping a run from another thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    signals: Arc<Vec<Arc<WorkerSignal>>>,
    stopped: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl StopHandle {
    /// Signal every worker to stop; idempotent
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!(workers = self.signals.len(), "stop requested");
        }
        for signal in self.signals.iter() {
            signal.stop();
        }
    }

    /// Interrupt a single worker, leaving its siblings running
    pub fn interrupt_worker(&self, id: usize, reason: &str) -> Result<()> {
        let signal = self.signals.get(id).ok_or_else(|| {
            LoadError::WorkerError(format!(
                "No worker {} (run has {} workers)",
                id,
                self.signals.len()
            ))
        })?;
        signal.interrupt(reason);
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of worker threads currently alive
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Decrements the active-worker count when the worker thread ends, however it ends
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Load engine coordinating one run's workers
pub struct LoadEngine {
    request: RunRequest,
    profile: Arc<LoadProfile>,
    clock: Arc<dyn HourSource>,
    workers: Vec<WorkerInfo>,
    handle: StopHandle,
    has_run: bool,
}

impl LoadEngine {
    /// Validate the request and prepare, but do not start, its workers
    pub fn new(request: RunRequest) -> Result<Self> {
        request.validate()?;

        let workers: Vec<WorkerInfo> = (0..request.num_workers()).map(WorkerInfo::new).collect();
        let handle = StopHandle {
            signals: Arc::new(workers.iter().map(|w| Arc::clone(&w.signal)).collect()),
            stopped: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        };

        Ok(Self {
            profile: Arc::new(request.profile.clone()),
            request,
            clock: Arc::new(LocalClock),
            workers,
            handle,
            has_run: false,
        })
    }

    /// Replace the wall clock used by time-of-day profiles
    pub fn with_clock(mut self, clock: Arc<dyn HourSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.handle.clone()
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Get current worker statuses
    pub fn worker_statuses(&self) -> Vec<(usize, WorkerStatus)> {
        self.workers.iter().map(|w| (w.id, w.status.clone())).collect()
    }

    /// Reports of every worker that has been joined
    pub fn reports(&self) -> Vec<WorkerReport> {
        self.workers.iter().filter_map(|w| w.report.clone()).collect()
    }

    /// Run all workers to completion and block until every one has been joined
    ///
    /// Returns `AggregateRunFailure` if any worker was interrupted or died; the
    /// remaining workers still run their course first.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.has_run {
            return Err(LoadError::WorkerError(
                "Engine has already run; create a new engine for another run".to_string(),
            ));
        }
        self.has_run = true;

        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            workers = self.workers.len(),
            profile = %self.profile.describe(),
            duration = ?self.request.duration,
            segments = self.request.segments,
            "starting load generation"
        );

        if let Err(err) = self.spawn_workers() {
            error!(error = %err, "failed to start all workers, stopping the ones already running");
            self.handle.stop();
            self.join_workers();
            return Err(err);
        }
        self.join_workers();
        let elapsed = start.elapsed();

        let failed: Vec<usize> = self
            .workers
            .iter()
            .filter(|w| !w.status.is_clean())
            .map(|w| w.id)
            .collect();
        if !failed.is_empty() {
            warn!(failed = ?failed, total = self.workers.len(), "run finished with failed workers");
            return Err(LoadError::AggregateRunFailure {
                failed,
                total: self.workers.len(),
            });
        }

        let outcome = run_outcome(&self.workers);
        info!(%outcome, elapsed = ?elapsed, "load generation finished");

        Ok(RunSummary {
            started_at,
            topology: self.request.topology,
            duration: self.request.duration,
            profile: self.profile.describe(),
            segments: self.request.segments,
            outcome,
            elapsed,
            workers: self.reports(),
        })
    }

    fn spawn_workers(&mut self) -> Result<()> {
        let cycle = DutyCycle::new(PERIOD, self.request.segments);

        for worker in self.workers.iter_mut() {
            let ctx = WorkerContext {
                id: worker.id,
                profile: Arc::clone(&self.profile),
                clock: Arc::clone(&self.clock),
                duration: self.request.duration,
                cycle,
                signal: Arc::clone(&worker.signal),
            };
            let guard = ActiveGuard::enter(&self.handle.active);

            let handle = thread::Builder::new()
                .name(format!("cpuload-worker-{}", worker.id))
                .spawn(move || {
                    let _guard = guard;
                    run_worker(ctx)
                })
                .map_err(|e| {
                    LoadError::WorkerError(format!("Failed to spawn worker {}: {}", worker.id, e))
                })?;

            worker.handle = Some(handle);
            worker.status = WorkerStatus::Running;
        }

        Ok(())
    }

    fn join_workers(&mut self) {
        for worker in self.workers.iter_mut() {
            if let Some(handle) = worker.handle.take() {
                match handle.join() {
                    Ok(report) => {
                        worker.status = report.status.clone();
                        worker.report = Some(report);
                    }
                    Err(_) => {
                        error!(worker = worker.id, "worker thread panicked");
                        worker.status = WorkerStatus::Failed("worker thread panicked".to_string());
                    }
                }
            }
        }
    }
}

/// A run counts as stopped only if some worker actually observed the stop
fn run_outcome(workers: &[WorkerInfo]) -> RunOutcome {
    if workers.iter().any(|w| w.status == WorkerStatus::Stopped) {
        RunOutcome::Stopped
    } else {
        RunOutcome::Completed
    }
}

/// One-shot form: build an engine for `request` and run it
pub fn run(request: RunRequest) -> Result<RunSummary> {
    LoadEngine::new(request)?.run()
}
