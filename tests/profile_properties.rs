//! Statistical properties of load profile resolution

use cpuload::profile::{LoadProfile, LoadRange};
use rand::rngs::SmallRng;
use rand::SeedableRng;

const SAMPLES: usize = 20_000;

#[test]
fn test_range_samples_stay_in_bounds_and_center() {
    let mut rng = SmallRng::seed_from_u64(7);
    for (min, max) in [(0.0, 1.0), (0.3, 0.5), (0.24, 0.26), (0.9, 1.0)] {
        let profile = LoadProfile::range(min, max).unwrap();
        let mut sum = 0.0;
        for _ in 0..SAMPLES {
            let load = profile.resolve_at(12, &mut rng);
            assert!((min..=max).contains(&load), "{} outside [{}, {}]", load, min, max);
            sum += load;
        }
        let mean = sum / SAMPLES as f64;
        let midpoint = (min + max) / 2.0;
        assert!(
            (mean - midpoint).abs() <= 0.02 * (max - min).max(0.01),
            "mean {} too far from {}",
            mean,
            midpoint
        );
    }
}

#[test]
fn test_degenerate_range_is_constant() {
    let mut rng = SmallRng::seed_from_u64(1);
    let profile = LoadProfile::range(0.42, 0.42).unwrap();
    assert!((0..100).all(|_| profile.resolve_at(3, &mut rng) == 0.42));
}

#[test]
fn test_fixed_profile_ignores_hour() {
    let mut rng = SmallRng::seed_from_u64(3);
    let profile = LoadProfile::fixed(0.35).unwrap();
    assert!((0..24).all(|hour| profile.resolve_at(hour, &mut rng) == 0.35));
}

#[test]
fn test_wrapping_quiet_band_covers_every_hour_once() {
    let profile = LoadProfile::time_of_day(
        LoadRange::new(0.3, 0.5).unwrap(),
        LoadRange::new(0.24, 0.26).unwrap(),
        21,
        7,
    )
    .unwrap();
    let mut rng = SmallRng::seed_from_u64(11);

    for hour in 0..24 {
        let quiet = hour >= 21 || hour <= 7;
        assert_eq!(profile.is_quiet_hour(hour), quiet, "hour {}", hour);
        let load = profile.resolve_at(hour, &mut rng);
        if quiet {
            assert!((0.24..=0.26).contains(&load));
        } else {
            assert!((0.3..=0.5).contains(&load));
        }
    }
}

#[test]
fn test_quiet_band_is_start_to_midnight_plus_midnight_to_end() {
    let normal = LoadRange::new(0.3, 0.5).unwrap();
    let quiet = LoadRange::new(0.1, 0.1).unwrap();
    let mut rng = SmallRng::seed_from_u64(5);

    for (start, end) in [(12, 13), (23, 0), (18, 6), (0, 0)] {
        let profile = LoadProfile::time_of_day(normal, quiet, start, end).unwrap();
        for hour in 0..24 {
            let expected = hour >= start || hour <= end;
            assert_eq!(profile.is_quiet_hour(hour), expected, "{}-{} at {}", start, end, hour);
            if expected {
                assert_eq!(profile.resolve_at(hour, &mut rng), 0.1);
            }
        }
    }
}

#[test]
fn test_out_of_range_bounds_rejected() {
    assert!(LoadProfile::range(-0.1, 0.5).is_err());
    assert!(LoadProfile::range(0.6, 0.5).is_err());
    assert!(LoadProfile::range(0.2, 1.01).is_err());
    assert!(LoadProfile::fixed(f64::NAN).is_err());
    assert!(LoadProfile::time_of_day(
        LoadRange::new(0.3, 0.5).unwrap(),
        LoadRange::new(0.2, 0.3).unwrap(),
        24,
        7
    )
    .is_err());
}
