//! Duty-cycle worker
//!
//! Each worker approximates a target utilization `u` by sleeping for
//! `floor((1 - u) * sub_period)` and staying runnable for the rest of every
//! sub-period. A period is split into `segments` equal sub-periods; the target
//! is resolved once per period, so `segments == 1` is the plain steady worker
//! and larger values give the alternating busy/sleep pattern.

use std::sync::Arc;
use std::time::{Duration, Instant};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::engine::signal::{Signal, WorkerSignal};
use crate::host::thread_cpu_time;
use crate::models::WorkerReport;
use crate::profile::{HourSource, LoadProfile};
use crate::{LoadError, Result};

/// Worker status for tracking individual worker states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerStatus {
    /// Worker has been created but not started
    Idle,
    /// Worker thread is generating load
    Running,
    /// Bounded run reached its duration
    Completed,
    /// Worker observed the engine-wide stop
    Stopped,
    /// Worker alone was interrupted, with the reason given
    Interrupted(String),
    /// Worker thread died
    Failed(String),
}

impl WorkerStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, WorkerStatus::Running)
    }

    pub fn is_completed(&self) -> bool {
        !matches!(self, WorkerStatus::Idle | WorkerStatus::Running)
    }

    /// Finished without interruption or fault
    pub fn is_clean(&self) -> bool {
        matches!(self, WorkerStatus::Completed | WorkerStatus::Stopped)
    }
}

/// Busy/sleep split of one duty-cycle period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    period: Duration,
    segments: u32,
}

impl DutyCycle {
    pub fn new(period: Duration, segments: u32) -> Self {
        Self {
            period,
            segments: segments.max(1),
        }
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Sub-period length, floored to whole milliseconds
    pub fn sub_period(&self) -> Duration {
        let millis = self.period.as_millis() as u64 / u64::from(self.segments);
        Duration::from_millis(millis)
    }

    /// Sleep and busy time within one sub-period for target `load`
    pub fn split(&self, load: f64) -> (Duration, Duration) {
        let sub = self.sub_period();
        let load = load.clamp(0.0, 1.0);
        let sleep_ms = ((1.0 - load) * sub.as_millis() as f64).floor() as u64;
        let sleep = Duration::from_millis(sleep_ms).min(sub);
        (sleep, sub - sleep)
    }
}

/// Everything one worker thread needs; nothing here is mutated after spawn
pub(crate) struct WorkerContext {
    pub id: usize,
    pub profile: Arc<LoadProfile>,
    pub clock: Arc<dyn HourSource>,
    pub duration: Option<Duration>,
    pub cycle: DutyCycle,
    pub signal: Arc<WorkerSignal>,
}

#[derive(Debug, Default)]
struct Accounting {
    periods: u64,
    busy: Duration,
    slept: Duration,
    target_sum: f64,
}

/// Thread body: run the duty cycle until the bound, a stop, or an interrupt
pub(crate) fn run_worker(ctx: WorkerContext) -> WorkerReport {
    let mut rng = SmallRng::from_entropy();
    let cpu_start = thread_cpu_time();
    let start = Instant::now();
    let mut acct = Accounting::default();

    debug!(worker = ctx.id, "worker started");

    let status = match drive(&ctx, &mut rng, start, &mut acct) {
        Ok(status) => status,
        Err(err) => {
            warn!(worker = ctx.id, error = %err, "worker interrupted, exiting");
            match err {
                LoadError::WorkerInterrupted { reason, .. } => WorkerStatus::Interrupted(reason),
                other => WorkerStatus::Failed(other.to_string()),
            }
        }
    };

    let elapsed = start.elapsed();
    let cpu_time = match (cpu_start, thread_cpu_time()) {
        (Some(before), Some(after)) => Some(after.saturating_sub(before)),
        _ => None,
    };
    let mean_target = if acct.periods > 0 {
        acct.target_sum / acct.periods as f64
    } else {
        0.0
    };

    debug!(worker = ctx.id, ?status, periods = acct.periods, "worker exited");

    WorkerReport {
        id: ctx.id,
        status,
        periods: acct.periods,
        busy: acct.busy,
        slept: acct.slept,
        elapsed,
        mean_target,
        cpu_time,
    }
}

fn drive(
    ctx: &WorkerContext,
    rng: &mut SmallRng,
    start: Instant,
    acct: &mut Accounting,
) -> Result<WorkerStatus> {
    // A deadline past the end of the monotonic clock never arrives
    let deadline = ctx.duration.and_then(|d| start.checked_add(d));
    let clip = |t: Instant| match deadline {
        Some(d) => t.min(d),
        None => t,
    };
    let sub = ctx.cycle.sub_period();

    loop {
        if let Some(status) = observe(ctx, ctx.signal.check())? {
            return Ok(status);
        }
        let period_start = Instant::now();
        if deadline.map_or(false, |d| period_start >= d) {
            return Ok(WorkerStatus::Completed);
        }

        let load = ctx.profile.resolve(ctx.clock.as_ref(), rng);
        acct.periods += 1;
        acct.target_sum += load;
        let (sleep, _) = ctx.cycle.split(load);

        for k in 0..ctx.cycle.segments() {
            let sub_start = period_start + sub * k;
            let sub_end = clip(sub_start + sub);
            let nap_end = clip(sub_start + sleep).min(sub_end);

            let before = Instant::now();
            let signal = ctx.signal.sleep(nap_end.saturating_duration_since(before));
            let woke = Instant::now();
            acct.slept += woke - before;
            if let Some(status) = observe(ctx, signal)? {
                return Ok(status);
            }

            let signal = spin_until(sub_end, &ctx.signal);
            acct.busy += woke.elapsed();
            if let Some(status) = observe(ctx, signal)? {
                return Ok(status);
            }

            if deadline.map_or(false, |d| Instant::now() >= d) {
                return Ok(WorkerStatus::Completed);
            }
        }
    }
}

/// Stay runnable until `end`, polling the clock and the signal
fn spin_until(end: Instant, signal: &WorkerSignal) -> Signal {
    while Instant::now() < end {
        let observed = signal.check();
        if observed != Signal::Clear {
            return observed;
        }
        std::hint::spin_loop();
    }
    Signal::Clear
}

fn observe(ctx: &WorkerContext, signal: Signal) -> Result<Option<WorkerStatus>> {
    match signal {
        Signal::Clear => Ok(None),
        Signal::Stop => Ok(Some(WorkerStatus::Stopped)),
        Signal::Interrupt => Err(LoadError::WorkerInterrupted {
            worker: ctx.id,
            reason: ctx
                .signal
                .reason()
                .unwrap_or_else(|| "interrupted".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FixedHour;
    use crate::PERIOD;

    fn context(profile: LoadProfile, duration: Option<Duration>, segments: u32) -> WorkerContext {
        WorkerContext {
            id: 0,
            profile: Arc::new(profile),
            clock: Arc::new(FixedHour(12)),
            duration,
            cycle: DutyCycle::new(PERIOD, segments),
            signal: Arc::new(WorkerSignal::new()),
        }
    }

    #[test]
    fn test_split_steady() {
        let cycle = DutyCycle::new(PERIOD, 1);
        assert_eq!(cycle.sub_period(), Duration::from_millis(100));
        assert_eq!(
            cycle.split(0.3),
            (Duration::from_millis(70), Duration::from_millis(30))
        );
        assert_eq!(cycle.split(0.0), (Duration::from_millis(100), Duration::ZERO));
        assert_eq!(cycle.split(1.0), (Duration::ZERO, Duration::from_millis(100)));
    }

    #[test]
    fn test_split_floors_sleep() {
        let cycle = DutyCycle::new(PERIOD, 1);
        // (1 - 0.255) * 100 = 74.5
        assert_eq!(cycle.split(0.255).0, Duration::from_millis(74));
    }

    #[test]
    fn test_split_alternating() {
        let cycle = DutyCycle::new(PERIOD, 4);
        assert_eq!(cycle.sub_period(), Duration::from_millis(25));
        assert_eq!(
            cycle.split(0.6),
            (Duration::from_millis(10), Duration::from_millis(15))
        );
    }

    #[test]
    fn test_non_divisor_segments_floor() {
        let cycle = DutyCycle::new(PERIOD, 3);
        assert_eq!(cycle.sub_period(), Duration::from_millis(33));
        assert_eq!(DutyCycle::new(PERIOD, 0).segments(), 1);
    }

    #[test]
    fn test_status_predicates() {
        assert!(WorkerStatus::Running.is_active());
        assert!(!WorkerStatus::Idle.is_completed());
        assert!(WorkerStatus::Stopped.is_clean());
        assert!(WorkerStatus::Interrupted("x".into()).is_completed());
        assert!(!WorkerStatus::Interrupted("x".into()).is_clean());
        assert!(!WorkerStatus::Failed("x".into()).is_clean());
    }

    #[test]
    fn test_bounded_worker_completes() {
        let ctx = context(LoadProfile::fixed(0.2).unwrap(), Some(Duration::from_millis(300)), 1);
        let report = run_worker(ctx);
        assert_eq!(report.status, WorkerStatus::Completed);
        assert!(report.elapsed >= Duration::from_millis(300));
        assert!(report.elapsed < Duration::from_millis(500));
        assert!(report.periods >= 3);
        assert_eq!(report.mean_target, 0.2);
    }

    #[test]
    fn test_duty_cycle_accounting_tracks_target() {
        let ctx = context(LoadProfile::fixed(0.3).unwrap(), Some(Duration::from_millis(1000)), 1);
        let report = run_worker(ctx);
        let utilization = report.duty_cycle_utilization();
        assert!(
            (utilization - 0.3).abs() < 0.15,
            "duty cycle utilization {} too far from 0.3",
            utilization
        );
    }

    #[test]
    fn test_alternating_worker_completes() {
        let ctx = context(LoadProfile::fixed(0.5).unwrap(), Some(Duration::from_millis(300)), 5);
        let report = run_worker(ctx);
        assert_eq!(report.status, WorkerStatus::Completed);
        assert!(report.busy > Duration::ZERO);
        assert!(report.slept > Duration::ZERO);
    }

    #[test]
    fn test_interrupted_worker_reports_reason() {
        let ctx = context(LoadProfile::fixed(0.1).unwrap(), None, 1);
        let signal = Arc::clone(&ctx.signal);
        let handle = std::thread::spawn(move || run_worker(ctx));
        std::thread::sleep(Duration::from_millis(150));
        signal.interrupt("fault injected");
        let report = handle.join().unwrap();
        assert_eq!(report.status, WorkerStatus::Interrupted("fault injected".into()));
    }

    #[test]
    fn test_unrepresentable_deadline_runs_until_stopped() {
        let ctx = context(
            LoadProfile::fixed(0.1).unwrap(),
            Some(Duration::from_secs(i64::MAX as u64)),
            1,
        );
        let signal = Arc::clone(&ctx.signal);
        let handle = std::thread::spawn(move || run_worker(ctx));
        std::thread::sleep(Duration::from_millis(150));
        signal.stop();
        let report = handle.join().unwrap();
        assert_eq!(report.status, WorkerStatus::Stopped);
        assert!(report.periods >= 1);
    }

    #[test]
    fn test_stop_before_start() {
        let ctx = context(LoadProfile::fixed(0.9).unwrap(), None, 1);
        ctx.signal.stop();
        let report = run_worker(ctx);
        assert_eq!(report.status, WorkerStatus::Stopped);
        assert_eq!(report.periods, 0);
    }
}
