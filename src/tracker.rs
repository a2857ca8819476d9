use std::{
    borrow::Borrow,
    hash::Hash,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{ActivityRecord, Clock, SystemClock, TrackerOptions, reclaim::ReclaimLoopHandle};

/// Key-scoped admission controller.
///
/// Each key carries an [`ActivityRecord`]: the time of its last admitted action and the
/// number of actions admitted since the record was created. [`try_admit`](Self::try_admit)
/// denies a key only while it is both at or over `max_count` and active within the last
/// `window_seconds`.
///
/// # Counting rule
///
/// - Every admit refreshes `last_update` and increments `count`
/// - A key idle for a full window is admitted again, but its count keeps growing
/// - Only deleting the record (reclamation) starts the key over at 1
///
/// A key that keeps hitting its ceiling therefore stays denied until it goes quiet for a
/// whole window, and after that it gets exactly one action per quiet window until the
/// record is reclaimed.
///
/// # Thread Safety
///
/// - The store is a [`DashMap`](dashmap::DashMap); lookups take shard read locks, mutations
///   take shard write locks
/// - The deny path never takes a write lock and never mutates
/// - Cloning a `Tracker` is cheap and shares the same state
///
/// # Reclamation
///
/// When an admit leaves the store at or above `max_store_size`, a background pass deletes
/// every record idle for at least the window. See [`reclaim`](Self::reclaim) and
/// [`run_reclaim_loop`](Self::run_reclaim_loop).
///
/// # Examples
///
/// ```
/// use keygate::{ManualClock, MaxCount, Tracker, TrackerOptions, WindowSeconds};
///
/// let clock = ManualClock::new(0);
/// let tracker: Tracker<String, _> = Tracker::with_clock(
///     TrackerOptions {
///         max_count: MaxCount::try_from(2).unwrap(),
///         window_seconds: WindowSeconds::try_from(60).unwrap(),
///         ..TrackerOptions::default()
///     },
///     clock.clone(),
/// );
///
/// assert!(tracker.try_admit("a"));
/// clock.set(1);
/// assert!(tracker.try_admit("a"));
/// clock.set(2);
/// assert!(!tracker.try_admit("a"));
///
/// clock.set(61);
/// assert!(tracker.try_admit("a"));
/// assert_eq!(tracker.record("a").map(|r| r.count), Some(3));
/// ```
pub struct Tracker<K, C = SystemClock> {
    pub(crate) inner: Arc<TrackerInner<K, C>>,
}

pub(crate) struct TrackerInner<K, C> {
    pub(crate) store: DashMap<K, ActivityRecord>,
    pub(crate) options: TrackerOptions,
    pub(crate) clock: C,
    pub(crate) reclaiming: AtomicBool,
    pub(crate) reclaim_loop: Mutex<Option<ReclaimLoopHandle>>,
}

impl<K, C> Clone for Tracker<K, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Tracker<K, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Create a tracker timed by the system clock.
    pub fn new(options: TrackerOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }

    /// Create a tracker from raw integers; see [`TrackerOptions::from_raw`].
    ///
    /// Never fails: out-of-range values fall back to their defaults.
    pub fn from_raw(
        max_count: i64,
        window_seconds: i64,
        capacity_hint: i64,
        max_store_size: i64,
        reclaim_batch: i64,
    ) -> Self {
        Self::new(TrackerOptions::from_raw(
            max_count,
            window_seconds,
            capacity_hint,
            max_store_size,
            reclaim_batch,
        ))
    }
}

impl<K> Default for Tracker<K, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(TrackerOptions::default())
    }
}

impl<K, C> Tracker<K, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Create a tracker timed by `clock`.
    pub fn with_clock(options: TrackerOptions, clock: C) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                store: DashMap::with_capacity(*options.capacity_hint),
                options,
                clock,
                reclaiming: AtomicBool::new(false),
                reclaim_loop: Mutex::new(None),
            }),
        }
    }

    /// Decide whether the next action for `key` is admitted.
    ///
    /// # Behavior
    ///
    /// 1. Unknown key: record `{ last_update: now, count: 1 }` and admit
    /// 2. Known key active within the window with `count >= max_count`: deny, no state change
    /// 3. Otherwise: record `{ last_update: now, count: count + 1 }` and admit
    ///
    /// After an admit, if the store holds at least `max_store_size` records (and the
    /// ceiling is not `0`), a background reclamation pass is started. This call never waits
    /// for it.
    ///
    /// # Concurrency
    ///
    /// The decision is re-checked under the key's write lock before mutating, so concurrent
    /// admits on one key never lose increments and never admit past the ceiling.
    pub fn try_admit<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        let inner = &self.inner;
        let now = inner.clock.now_secs();

        let denied = inner
            .store
            .get(key)
            .is_some_and(|record| inner.denies(&record, now));
        if denied {
            tracing::trace!(now, "keygate.admit.denied");
            return false;
        }

        let admitted = match inner.store.get_mut(key) {
            Some(mut record) => inner.admit_existing(&mut record, now),
            None => match inner.store.entry(key.to_owned()) {
                Entry::Occupied(mut entry) => inner.admit_existing(entry.get_mut(), now),
                Entry::Vacant(entry) => {
                    entry.insert(ActivityRecord::first(now));
                    true
                }
            },
        };

        if !admitted {
            tracing::trace!(now, "keygate.admit.denied");
            return false;
        }

        if inner.options.max_store_size.is_reached_by(inner.store.len()) {
            inner.trigger_reclaim();
        }

        true
    } // end method try_admit

    /// Current record for `key`, if any.
    pub fn record<Q>(&self, key: &Q) -> Option<ActivityRecord>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.get(key).map(|record| *record)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Whether a reclamation pass currently holds the in-progress flag.
    pub fn is_reclaiming(&self) -> bool {
        self.inner.reclaiming.load(Ordering::Acquire)
    }

    /// Options this tracker was built with, after normalization.
    pub fn options(&self) -> &TrackerOptions {
        &self.inner.options
    }

    /// The tracker's time source.
    pub fn clock(&self) -> &C {
        &self.inner.clock
    }
} // end of impl

impl<K, C> TrackerInner<K, C>
where
    C: Clock,
{
    fn denies(&self, record: &ActivityRecord, now: u64) -> bool {
        record.idle_secs(now) < *self.options.window_seconds
            && record.count >= *self.options.max_count
    }

    fn admit_existing(&self, record: &mut ActivityRecord, now: u64) -> bool {
        if self.denies(record, now) {
            return false;
        }

        *record = record.admitted(now);
        true
    }
}

impl<K, C> std::fmt::Debug for Tracker<K, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("options", &self.inner.options)
            .field("reclaiming", &self.inner.reclaiming.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
