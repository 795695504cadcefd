//! Per-worker cancellation signal with interruptible sleep

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

const CLEAR: u8 = 0;
const STOP: u8 = 1;
const INTERRUPT: u8 = 2;

/// What a worker observed on its signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Keep going
    Clear,
    /// Engine-wide stop
    Stop,
    /// This worker alone was interrupted
    Interrupt,
}

/// Signal shared between one worker and the engine's stop handle
///
/// The first raised signal wins; later ones are ignored.
#[derive(Debug)]
pub struct WorkerSignal {
    state: AtomicU8,
    lock: Mutex<()>,
    wake: Condvar,
    reason: Mutex<Option<String>>,
}

impl Default for WorkerSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerSignal {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(CLEAR),
            lock: Mutex::new(()),
            wake: Condvar::new(),
            reason: Mutex::new(None),
        }
    }

    /// Current state without blocking
    pub fn check(&self) -> Signal {
        match self.state.load(Ordering::Acquire) {
            CLEAR => Signal::Clear,
            STOP => Signal::Stop,
            _ => Signal::Interrupt,
        }
    }

    pub fn stop(&self) {
        self.raise(STOP);
    }

    pub fn interrupt(&self, reason: impl Into<String>) {
        let mut slot = self.reason.lock().unwrap_or_else(PoisonError::into_inner);
        if self.raise(INTERRUPT) {
            *slot = Some(reason.into());
        }
    }

    /// Reason given to `interrupt`, if this worker was interrupted
    pub fn reason(&self) -> Option<String> {
        self.reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sleep for `duration` unless a signal arrives first
    pub fn sleep(&self, duration: Duration) -> Signal {
        if duration.is_zero() {
            return self.check();
        }
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .wake
            .wait_timeout_while(guard, duration, |_| {
                self.state.load(Ordering::Acquire) == CLEAR
            })
            .unwrap_or_else(PoisonError::into_inner);
        self.check()
    }

    fn raise(&self, to: u8) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let raised = self
            .state
            .compare_exchange(CLEAR, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.wake.notify_all();
        raised
    }
}
