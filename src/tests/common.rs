use std::time::{Duration, Instant};

use crate::{
    ManualClock, MaxCount, MaxStoreSize, ReclaimBatch, Tracker, TrackerOptions, WindowSeconds,
};

pub(super) fn tracker(
    max_count: u64,
    window_seconds: u64,
    max_store_size: usize,
) -> (Tracker<String, ManualClock>, ManualClock) {
    tracker_with_batch(max_count, window_seconds, max_store_size, 20)
}

pub(super) fn tracker_with_batch(
    max_count: u64,
    window_seconds: u64,
    max_store_size: usize,
    reclaim_batch: usize,
) -> (Tracker<String, ManualClock>, ManualClock) {
    let clock = ManualClock::new(0);
    let tracker = Tracker::with_clock(
        TrackerOptions {
            max_count: MaxCount::try_from(max_count).unwrap(),
            window_seconds: WindowSeconds::try_from(window_seconds).unwrap(),
            max_store_size: MaxStoreSize::from(max_store_size),
            reclaim_batch: ReclaimBatch::try_from(reclaim_batch).unwrap(),
            ..TrackerOptions::default()
        },
        clock.clone(),
    );

    (tracker, clock)
}

/// Poll `cond` until it holds, panicking with `what` after two seconds.
pub(super) fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    loop {
        if cond() {
            return;
        }
        if start.elapsed() > Duration::from_secs(2) {
            panic!("timed out waiting for {what}");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
