//! Hour-of-day sources for time-of-day profiles

use chrono::{Local, Timelike};

/// Supplies the current local hour (`0..=23`)
pub trait HourSource: Send + Sync {
    fn current_hour(&self) -> u32;
}

/// Host wall clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl HourSource for LocalClock {
    fn current_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// Clock pinned to one hour
#[derive(Debug, Clone, Copy)]
pub struct FixedHour(pub u32);

impl HourSource for FixedHour {
    fn current_hour(&self) -> u32 {
        self.0
    }
}
