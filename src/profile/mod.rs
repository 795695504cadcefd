//! Load profile module
//!
//! Describes what utilization a worker should target at any instant and
//! resolves that policy into a single scalar load for the next period.

use rand::Rng;
use serde::Serialize;
use crate::{LoadError, Result};

pub mod clock;

pub use clock::{FixedHour, HourSource, LocalClock};

/// Inclusive utilization band, `0.0 <= min <= max <= 1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadRange {
    min: f64,
    max: f64,
}

impl LoadRange {
    /// Create a validated range
    pub fn new(min: f64, max: f64) -> Result<Self> {
        check_fraction("min", min)?;
        check_fraction("max", max)?;
        if min > max {
            return Err(LoadError::InvalidProfile(format!(
                "min load {} exceeds max load {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Expected value of a uniform draw from this range
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Draw a fresh target uniformly from `[min, max)`
    ///
    /// A degenerate range (`min == max`) always yields exactly `min`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        (self.min + (self.max - self.min) * u).min(self.max)
    }
}

/// Policy deciding the target utilization of every duty-cycle period
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadProfile {
    /// Constant load
    Fixed { load: f64 },
    /// New uniform draw from the range every period
    Range(LoadRange),
    /// Range chosen by the local hour of day
    TimeOfDay {
        normal: LoadRange,
        quiet: LoadRange,
        quiet_start_hour: u32,
        quiet_end_hour: u32,
    },
}

impl LoadProfile {
    pub fn fixed(load: f64) -> Result<Self> {
        check_fraction("load", load)?;
        Ok(LoadProfile::Fixed { load })
    }

    pub fn range(min: f64, max: f64) -> Result<Self> {
        Ok(LoadProfile::Range(LoadRange::new(min, max)?))
    }

    /// Range profile that switches to `quiet` from `quiet_start_hour` through
    /// midnight to `quiet_end_hour` (both inclusive, local time)
    pub fn time_of_day(
        normal: LoadRange,
        quiet: LoadRange,
        quiet_start_hour: u32,
        quiet_end_hour: u32,
    ) -> Result<Self> {
        check_hour("quiet start hour", quiet_start_hour)?;
        check_hour("quiet end hour", quiet_end_hour)?;
        Ok(LoadProfile::TimeOfDay {
            normal,
            quiet,
            quiet_start_hour,
            quiet_end_hour,
        })
    }

    /// Re-check invariants of a profile built from its public variants
    pub fn validate(&self) -> Result<()> {
        match self {
            LoadProfile::Fixed { load } => check_fraction("load", *load),
            LoadProfile::Range(_) => Ok(()),
            LoadProfile::TimeOfDay {
                quiet_start_hour,
                quiet_end_hour,
                ..
            } => {
                check_hour("quiet start hour", *quiet_start_hour)?;
                check_hour("quiet end hour", *quiet_end_hour)
            }
        }
    }

    /// Resolve the target for the next period using the current hour of `clock`
    pub fn resolve<R: Rng>(&self, clock: &dyn HourSource, rng: &mut R) -> f64 {
        match self {
            LoadProfile::TimeOfDay { .. } => self.resolve_at(clock.current_hour(), rng),
            // Only the time-of-day variant needs the clock
            _ => self.resolve_at(0, rng),
        }
    }

    /// Resolve the target as if the local hour were `hour`
    pub fn resolve_at<R: Rng>(&self, hour: u32, rng: &mut R) -> f64 {
        match self {
            LoadProfile::Fixed { load } => *load,
            LoadProfile::Range(range) => range.sample(rng),
            LoadProfile::TimeOfDay { normal, quiet, .. } => {
                if self.is_quiet_hour(hour) {
                    quiet.sample(rng)
                } else {
                    normal.sample(rng)
                }
            }
        }
    }

    /// Whether `hour` falls inside the quiet band
    ///
    /// Quiet when `hour >= start || hour <= end`, i.e. `[start, 24) ∪ [0, end]`.
    /// The band is meant to wrap midnight; with `start <= end` the union covers
    /// every hour. Profiles without a quiet band are never quiet.
    pub fn is_quiet_hour(&self, hour: u32) -> bool {
        match self {
            LoadProfile::TimeOfDay {
                quiet_start_hour: start,
                quiet_end_hour: end,
                ..
            } => hour >= *start || hour <= *end,
            _ => false,
        }
    }

    /// Long-run average target outside quiet hours
    pub fn expected_load(&self) -> f64 {
        match self {
            LoadProfile::Fixed { load } => *load,
            LoadProfile::Range(range) => range.midpoint(),
            LoadProfile::TimeOfDay { normal, .. } => normal.midpoint(),
        }
    }

    /// Short human-readable description
    pub fn describe(&self) -> String {
        match self {
            LoadProfile::Fixed { load } => format!("fixed {:.1}%", load * 100.0),
            LoadProfile::Range(range) => format!(
                "{:.1}%-{:.1}%",
                range.min * 100.0,
                range.max * 100.0
            ),
            LoadProfile::TimeOfDay {
                normal,
                quiet,
                quiet_start_hour,
                quiet_end_hour,
            } => format!(
                "{:.1}%-{:.1}% ({:.1}%-{:.1}% from {:02}:00 to {:02}:59)",
                normal.min * 100.0,
                normal.max * 100.0,
                quiet.min * 100.0,
                quiet.max * 100.0,
                quiet_start_hour,
                quiet_end_hour
            ),
        }
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(LoadError::InvalidProfile(format!(
            "{} load must be between 0.0 and 1.0, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_hour(name: &str, hour: u32) -> Result<()> {
    if hour > 23 {
        return Err(LoadError::InvalidProfile(format!(
            "{} must be between 0 and 23, got {}",
            name, hour
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_fixed_resolves_constant() {
        let profile = LoadProfile::fixed(0.42).unwrap();
        let mut rng = rng();
        for hour in 0..24 {
            assert_eq!(profile.resolve_at(hour, &mut rng), 0.42);
        }
    }

    #[test]
    fn test_range_samples_within_bounds() {
        let profile = LoadProfile::range(0.3, 0.5).unwrap();
        let mut rng = rng();
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let v = profile.resolve_at(12, &mut rng);
            assert!((0.3..=0.5).contains(&v), "sample {} out of range", v);
            sum += v;
        }
        let mean = sum / n as f64;
        assert!((mean - 0.4).abs() < 0.01, "mean {} too far from 0.4", mean);
    }

    #[test]
    fn test_degenerate_range_matches_fixed() {
        let range = LoadProfile::range(0.25, 0.25).unwrap();
        let fixed = LoadProfile::fixed(0.25).unwrap();
        let mut rng = rng();
        for _ in 0..1000 {
            assert_eq!(range.resolve_at(3, &mut rng), fixed.resolve_at(3, &mut rng));
        }
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        assert!(matches!(
            LoadProfile::range(0.6, 0.4),
            Err(LoadError::InvalidProfile(_))
        ));
        assert!(matches!(
            LoadProfile::range(-0.1, 0.4),
            Err(LoadError::InvalidProfile(_))
        ));
        assert!(matches!(
            LoadProfile::range(0.1, 1.5),
            Err(LoadError::InvalidProfile(_))
        ));
        assert!(matches!(
            LoadProfile::fixed(f64::NAN),
            Err(LoadError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_invalid_hours_rejected() {
        let r = LoadRange::new(0.1, 0.2).unwrap();
        assert!(LoadProfile::time_of_day(r, r, 24, 7).is_err());
        assert!(LoadProfile::time_of_day(r, r, 21, 30).is_err());
    }

    #[test]
    fn test_wrapping_quiet_band() {
        let normal = LoadRange::new(0.6, 0.6).unwrap();
        let quiet = LoadRange::new(0.25, 0.25).unwrap();
        let profile = LoadProfile::time_of_day(normal, quiet, 21, 7).unwrap();
        let mut rng = rng();
        for hour in 0..24 {
            let expected = if hour >= 21 || hour <= 7 { 0.25 } else { 0.6 };
            assert_eq!(profile.resolve_at(hour, &mut rng), expected, "hour {}", hour);
        }
    }

    #[test]
    fn test_quiet_band_is_union_of_both_ends() {
        let normal = LoadRange::new(0.6, 0.6).unwrap();
        let quiet = LoadRange::new(0.1, 0.1).unwrap();

        // start <= end: [start, 24) and [0, end] together cover the whole day
        let profile = LoadProfile::time_of_day(normal, quiet, 12, 13).unwrap();
        assert!((0..24).all(|hour| profile.is_quiet_hour(hour)));
        let mut rng = rng();
        assert_eq!(profile.resolve_at(20, &mut rng), 0.1);

        let profile = LoadProfile::time_of_day(normal, quiet, 5, 3).unwrap();
        let normal_hours: Vec<u32> = (0..24).filter(|h| !profile.is_quiet_hour(*h)).collect();
        assert_eq!(normal_hours, vec![4]);
    }

    #[test]
    fn test_resolve_uses_clock() {
        let normal = LoadRange::new(0.7, 0.7).unwrap();
        let quiet = LoadRange::new(0.2, 0.2).unwrap();
        let profile = LoadProfile::time_of_day(normal, quiet, 21, 7).unwrap();
        let mut rng = rng();
        assert_eq!(profile.resolve(&FixedHour(23), &mut rng), 0.2);
        assert_eq!(profile.resolve(&FixedHour(12), &mut rng), 0.7);
    }

    #[test]
    fn test_describe() {
        assert_eq!(LoadProfile::fixed(0.5).unwrap().describe(), "fixed 50.0%");
        assert_eq!(LoadProfile::range(0.3, 0.5).unwrap().describe(), "30.0%-50.0%");
    }
}
