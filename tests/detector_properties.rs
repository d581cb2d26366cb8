use std::time::Duration;

use heapwatch::anomaly::{CpuLoadDetector, Detector, LeakDetector};
use heapwatch::report::{Trend, classify_trend, generate_report};
use heapwatch::system::history::History;
use heapwatch::system::snapshot::{LoadAverage, MemoryUsage, Snapshot, SystemLoad};
use proptest::prelude::*;

fn snapshot(i: usize, heap_used: u64) -> Snapshot {
    Snapshot {
        timestamp: Duration::from_millis(i as u64 + 1),
        memory: MemoryUsage {
            heap_used,
            ..Default::default()
        },
        cpu: Default::default(),
        system: Default::default(),
    }
}

/// Feeds `values` one at a time and records whether the detector fired
/// after each push.
fn leak_firings(values: &[u64]) -> Vec<bool> {
    let detector = LeakDetector::default();
    let mut history = History::new(1000);
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            history.push(snapshot(i, v)).unwrap();
            let latest = history.latest().unwrap().clone();
            detector.check(&latest, &history).is_some()
        })
        .collect()
}

fn strictly_increasing(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u64>> {
    (0u64..1_000_000, prop::collection::vec(1u64..10_000, len)).prop_map(|(start, deltas)| {
        deltas
            .iter()
            .scan(start, |acc, d| {
                *acc += d;
                Some(*acc)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn short_histories_never_fire(values in prop::collection::vec(any::<u32>(), 0..10)) {
        let values: Vec<u64> = values.into_iter().map(u64::from).collect();
        prop_assert!(leak_firings(&values).iter().all(|fired| !fired));
    }

    #[test]
    fn steady_growth_fires_from_tenth_sample(values in strictly_increasing(10..40)) {
        let firings = leak_firings(&values);
        for (i, fired) in firings.iter().enumerate() {
            prop_assert_eq!(*fired, i >= 9, "sample {} of {:?}", i + 1, values);
        }
    }

    #[test]
    fn non_increasing_never_fires(values in prop::collection::vec(any::<u32>(), 0..40)) {
        let mut values = values;
        values.sort_unstable_by(|a, b| b.cmp(a));
        let values: Vec<u64> = values.into_iter().map(u64::from).collect();
        prop_assert!(leak_firings(&values).iter().all(|fired| !fired));
    }

    #[test]
    fn trend_follows_monotonic_direction(values in strictly_increasing(2..50)) {
        let up: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        let down: Vec<f64> = up.iter().rev().copied().collect();
        prop_assert_eq!(classify_trend(&up), Trend::Increasing);
        prop_assert_eq!(classify_trend(&down), Trend::Decreasing);
    }

    #[test]
    fn constant_series_is_stable(value in any::<u32>(), len in 0usize..50) {
        let values = vec![value as f64; len];
        prop_assert_eq!(classify_trend(&values), Trend::Stable);
    }

    #[test]
    fn report_bounds_hold(values in prop::collection::vec(any::<u32>(), 1..100)) {
        let mut history = History::new(1000);
        for (i, &v) in values.iter().enumerate() {
            history.push(snapshot(i, u64::from(v))).unwrap();
        }
        let report = generate_report(&history).unwrap();
        prop_assert_eq!(report.samples, values.len());
        prop_assert!(report.memory.min as f64 <= report.memory.average + 1e-6);
        prop_assert!(report.memory.average <= report.memory.max as f64 + 1e-6);
        prop_assert_eq!(
            report.memory.growth,
            i64::from(*values.last().unwrap()) - i64::from(values[0])
        );
        prop_assert_eq!(&report, &generate_report(&history).unwrap());
    }

    #[test]
    fn cpu_detector_matches_threshold(load in 0.0f64..64.0, cores in 1usize..64) {
        let detector = CpuLoadDetector::default();
        let latest = Snapshot {
            system: SystemLoad {
                load_average: LoadAverage::clamped(load, 0.0, 0.0),
                logical_cores: cores,
                ..Default::default()
            },
            ..snapshot(0, 0)
        };
        let fired = detector.check(&latest, &History::default()).is_some();
        prop_assert_eq!(fired, load > cores as f64 * 0.8);
    }
}

#[test]
fn cpu_detector_reference_points() {
    let detector = CpuLoadDetector::default();
    let at = |load: f64| Snapshot {
        system: SystemLoad {
            load_average: LoadAverage::clamped(load, 0.0, 0.0),
            logical_cores: 4,
            ..Default::default()
        },
        ..snapshot(0, 0)
    };
    assert!(detector.check(&at(3.3), &History::default()).is_some());
    assert!(detector.check(&at(3.0), &History::default()).is_none());
}

#[test]
fn reference_trends() {
    assert_eq!(classify_trend(&[100.0, 200.0, 300.0]), Trend::Increasing);
    assert_eq!(classify_trend(&[300.0, 200.0, 100.0]), Trend::Decreasing);
    assert_eq!(classify_trend(&[100.0, 100.0, 100.0]), Trend::Stable);
}
