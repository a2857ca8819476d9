use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use keygate::{
    ManualClock, MaxStoreSize, ReclaimBatch, Tracker, TrackerOptions, WindowSeconds,
};

fn filled(key_space: usize, reclaim_batch: usize) -> (Tracker<String, ManualClock>, ManualClock) {
    let clock = ManualClock::new(0);
    let tracker = Tracker::with_clock(
        TrackerOptions {
            window_seconds: WindowSeconds::try_from(60).unwrap(),
            max_store_size: MaxStoreSize::unbounded(),
            reclaim_batch: ReclaimBatch::try_from(reclaim_batch).unwrap(),
            ..TrackerOptions::default()
        },
        clock.clone(),
    );

    for i in 0..key_space {
        // Half the keys go stale once the clock moves past the window.
        clock.set(if i % 2 == 0 { 0 } else { 100 });
        tracker.try_admit(format!("user_{i}").as_str());
    }
    clock.set(100);

    (tracker, clock)
}

fn bench_reclaim_nothing_stale(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker/reclaim_nothing_stale");
    group.sample_size(50);

    for reclaim_batch in [1_usize, 20, 1_000] {
        group.bench_function(format!("keys=10000/batch={reclaim_batch}"), |b| {
            let (tracker, clock) = filled(10_000, reclaim_batch);
            clock.set(0);

            b.iter(|| {
                black_box(tracker.reclaim());
            });
        });
    }

    group.finish();
}

fn bench_reclaim_half_stale(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker/reclaim_half_stale");
    group.sample_size(20);

    for reclaim_batch in [1_usize, 20, 1_000] {
        group.bench_function(format!("keys=10000/batch={reclaim_batch}"), |b| {
            b.iter_batched(
                || filled(10_000, reclaim_batch),
                |(tracker, _clock)| black_box(tracker.reclaim()),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reclaim_nothing_stale,
    bench_reclaim_half_stale
);
criterion_main!(benches);
