use crate::{CapacityHint, MaxCount, MaxStoreSize, ReclaimBatch, WindowSeconds};

/// Configuration for a [`Tracker`](crate::Tracker).
///
/// Every field has a default, so callers usually override only what they need:
///
/// ```
/// use keygate::{MaxCount, TrackerOptions, WindowSeconds};
///
/// let options = TrackerOptions {
///     max_count: MaxCount::try_from(5).unwrap(),
///     window_seconds: WindowSeconds::try_from(60).unwrap(),
///     ..TrackerOptions::default()
/// };
/// assert_eq!(*options.reclaim_batch, 20);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Admitted actions allowed before a key is denied.
    pub max_count: MaxCount,
    /// Idle time after which a key is forgiven and becomes eligible for reclamation.
    pub window_seconds: WindowSeconds,
    /// Initial store capacity.
    pub capacity_hint: CapacityHint,
    /// Store size that triggers background reclamation. `0` disables the trigger.
    pub max_store_size: MaxStoreSize,
    /// Entries processed between yields during a reclamation pass.
    pub reclaim_batch: ReclaimBatch,
}

impl TrackerOptions {
    /// Build options from raw integers, replacing out-of-range values with defaults.
    ///
    /// Values `<= 0` fall back to the defaults, except `max_store_size`, where only negative
    /// values do and `0` selects the unbounded mode.
    pub fn from_raw(
        max_count: i64,
        window_seconds: i64,
        capacity_hint: i64,
        max_store_size: i64,
        reclaim_batch: i64,
    ) -> Self {
        Self {
            max_count: MaxCount::from_raw(max_count),
            window_seconds: WindowSeconds::from_raw(window_seconds),
            capacity_hint: CapacityHint::from_raw(capacity_hint),
            max_store_size: MaxStoreSize::from_raw(max_store_size),
            reclaim_batch: ReclaimBatch::from_raw(reclaim_batch),
        }
    }
}
