use crate::{
    CapacityHint, MaxCount, MaxStoreSize, ReclaimBatch, Tracker, TrackerError, TrackerOptions,
    WindowSeconds,
};

#[test]
fn test_max_count_try_from_validates_positive() {
    let m = MaxCount::try_from(1u64).unwrap();
    assert_eq!(*m, 1u64);

    assert_eq!(
        MaxCount::try_from(0u64).unwrap_err().to_string(),
        "Max count must be greater than 0"
    );
    assert!(matches!(
        MaxCount::try_from(0u64),
        Err(TrackerError::InvalidMaxCount(_))
    ));
}

#[test]
fn test_window_seconds_try_from_validates_min_1() {
    let w = WindowSeconds::try_from(1u64).unwrap();
    assert_eq!(*w, 1u64);

    assert_eq!(
        WindowSeconds::try_from(0u64).unwrap_err().to_string(),
        "Window must be at least 1 second"
    );
}

#[test]
fn test_capacity_hint_and_reclaim_batch_try_from_validate_nonzero() {
    assert_eq!(*CapacityHint::try_from(8usize).unwrap(), 8);
    assert_eq!(
        CapacityHint::try_from(0usize).unwrap_err().to_string(),
        "Capacity hint must be greater than 0"
    );

    assert_eq!(*ReclaimBatch::try_from(1usize).unwrap(), 1);
    assert_eq!(
        ReclaimBatch::try_from(0usize).unwrap_err().to_string(),
        "Reclaim batch must be greater than 0"
    );
}

#[test]
fn test_defaults_match_documented_values() {
    let options = TrackerOptions::default();

    assert_eq!(*options.max_count, 30);
    assert_eq!(*options.window_seconds, 3600);
    assert_eq!(*options.capacity_hint, 2048);
    assert_eq!(*options.max_store_size, 16384);
    assert_eq!(*options.reclaim_batch, 20);
    assert!(!options.max_store_size.is_unbounded());
}

#[test]
fn test_from_raw_replaces_non_positive_values_with_defaults() {
    assert_eq!(
        TrackerOptions::from_raw(0, 0, 0, -1, 0),
        TrackerOptions::default()
    );
    assert_eq!(
        TrackerOptions::from_raw(-5, -5, -5, -5, -5),
        TrackerOptions::default()
    );
}

#[test]
fn test_from_raw_keeps_positive_values() {
    let options = TrackerOptions::from_raw(2, 60, 16, 100, 5);

    assert_eq!(*options.max_count, 2);
    assert_eq!(*options.window_seconds, 60);
    assert_eq!(*options.capacity_hint, 16);
    assert_eq!(*options.max_store_size, 100);
    assert_eq!(*options.reclaim_batch, 5);
}

#[test]
fn test_zero_max_store_size_is_unbounded_not_defaulted() {
    let size = MaxStoreSize::from_raw(0);
    assert!(size.is_unbounded());
    assert_eq!(size, MaxStoreSize::unbounded());
    assert!(!size.is_reached_by(usize::MAX));

    let bounded = MaxStoreSize::from(3);
    assert!(!bounded.is_reached_by(2));
    assert!(bounded.is_reached_by(3));
    assert!(bounded.is_reached_by(4));
}

#[test]
fn test_tracker_from_raw_never_fails() {
    let tracker: Tracker<u64> = Tracker::from_raw(i64::MIN, i64::MIN, i64::MIN, i64::MIN, i64::MIN);

    assert_eq!(*tracker.options(), TrackerOptions::default());
    assert!(tracker.is_empty());
}
