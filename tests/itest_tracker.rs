use std::time::{Duration, Instant};

use keygate::{
    ManualClock, MaxCount, MaxStoreSize, ReclaimOutcome, Tracker, TrackerOptions, WindowSeconds,
};

fn options(max_count: u64, window_seconds: u64, max_store_size: usize) -> TrackerOptions {
    TrackerOptions {
        max_count: MaxCount::try_from(max_count).unwrap(),
        window_seconds: WindowSeconds::try_from(window_seconds).unwrap(),
        max_store_size: MaxStoreSize::from(max_store_size),
        ..TrackerOptions::default()
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        if start.elapsed() > Duration::from_secs(2) {
            panic!("condition not reached in time");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[test]
fn test_system_clock_tracker_enforces_ceiling() {
    let tracker: Tracker<String> = Tracker::new(options(3, 3600, 0));

    for _ in 0..3 {
        assert!(tracker.try_admit("user_123"));
    }
    assert!(!tracker.try_admit("user_123"));
    assert!(tracker.try_admit("user_456"));

    // Nothing is an hour old.
    assert!(matches!(
        tracker.reclaim(),
        ReclaimOutcome::Completed {
            scanned: 2,
            removed: 0
        }
    ));
}

#[test]
fn test_idle_forgiveness_then_reclaim_resets() {
    let clock = ManualClock::new(1_000);
    let tracker: Tracker<String, _> = Tracker::with_clock(options(2, 60, 0), clock.clone());

    assert!(tracker.try_admit("a"));
    clock.advance(1);
    assert!(tracker.try_admit("a"));
    clock.advance(1);
    assert!(!tracker.try_admit("a"));

    clock.advance(59);
    assert!(tracker.try_admit("a"));
    assert_eq!(tracker.record("a").map(|r| r.count), Some(3));

    clock.advance(60);
    tracker.reclaim();
    assert!(tracker.try_admit("a"));
    assert_eq!(tracker.record("a").map(|r| r.count), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_triggered_reclaim_completes_from_async_context() {
    let clock = ManualClock::new(0);
    let tracker: Tracker<u32, _> = Tracker::with_clock(options(5, 30, 4), clock.clone());

    for key in 0..3u32 {
        assert!(tracker.try_admit(&key));
    }

    clock.advance(30);
    assert!(tracker.try_admit(&99u32));

    wait_until(|| tracker.len() == 1 && !tracker.is_reclaiming()).await;
    assert!(tracker.record(&99u32).is_some());
}
