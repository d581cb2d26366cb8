use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use heapwatch::anomaly::{DetectorSet, LeakDetector};
use heapwatch::report::generate_report;
use heapwatch::system::history::History;
use heapwatch::system::snapshot::{CpuTimes, LoadAverage, MemoryUsage, Snapshot, SystemLoad};

fn make_history(n: usize) -> History {
    let mut history = History::new(n);
    for i in 0..n {
        let i = i as u64;
        // Sawtooth on top of slow growth, like a collector-driven heap.
        let heap_used = 64 * 1024 * 1024 + i * 4096 + (i % 17) * 65_536;
        history
            .push(Snapshot {
                timestamp: Duration::from_millis(i * 1000 + 1),
                memory: MemoryUsage {
                    rss: heap_used + 16 * 1024 * 1024,
                    heap_total: heap_used * 2,
                    heap_used,
                    external: 1024 * 1024,
                },
                cpu: CpuTimes {
                    user_us: i * 1_500,
                    system_us: i * 300,
                },
                system: SystemLoad {
                    load_average: LoadAverage::clamped(1.5, 1.2, 1.0),
                    free_memory: 4 << 30,
                    total_memory: 16 << 30,
                    uptime_secs: 86_400 + i,
                    logical_cores: 8,
                },
            })
            .expect("timestamps increase");
    }
    history
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_report_600_3600_10000");

    for size in [600usize, 3600, 10_000] {
        let history = make_history(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &history, |b, history| {
            b.iter(|| black_box(generate_report(black_box(history))));
        });
    }
    group.finish();
}

fn bench_detectors(c: &mut Criterion) {
    let mut group = c.benchmark_group("detectors_window_10_100");
    let history = make_history(3600);
    let latest = history.latest().cloned().expect("non-empty history");

    for window in [10usize, 100] {
        let mut set = DetectorSet::default();
        set.push(LeakDetector::new(window, 0.7));
        group.bench_with_input(BenchmarkId::from_parameter(window), &set, |b, set| {
            b.iter(|| black_box(set.evaluate(black_box(&latest), black_box(&history))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_report, bench_detectors);
criterion_main!(benches);
