use std::{
    hash::Hash,
    sync::{
        Arc, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, Thread},
    time::{Duration, Instant},
};

use crate::{
    Clock, ReclaimOutcome, Tracker,
    runtime::{spawn_detached, spawn_thread},
    tracker::TrackerInner,
};

const DEFAULT_RECLAIM_INTERVAL_MS: u64 = 60_000;

/// Stop signal for a running reclaim loop thread.
pub(crate) struct ReclaimLoopHandle {
    pub(crate) stop: Arc<AtomicBool>,
    thread: Thread,
}

impl ReclaimLoopHandle {
    fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.thread.unpark();
    }
}

/// Ownership of the in-progress flag. Dropping it clears the flag, including when a
/// spawned pass is dropped without running.
struct ReclaimClaim<K, C> {
    inner: Arc<TrackerInner<K, C>>,
}

impl<K, C> ReclaimClaim<K, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    C: Clock,
{
    fn run(self) -> ReclaimOutcome {
        self.inner.reclaim_pass()
    }
}

impl<K, C> Drop for ReclaimClaim<K, C> {
    fn drop(&mut self) {
        self.inner.reclaiming.store(false, Ordering::Release);
    }
}

// The loop only upgrades its weak reference once per interval, so it has to be told.
impl<K, C> Drop for TrackerInner<K, C> {
    fn drop(&mut self) {
        let handle = self
            .reclaim_loop
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.stop();
        }
    }
}

impl<K, C> Tracker<K, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    C: Clock,
{
    /// Delete every record idle for at least the window.
    ///
    /// Returns [`ReclaimOutcome::AlreadyRunning`] without doing anything if another pass
    /// (direct, triggered by an admit, or from the reclaim loop) is in progress.
    ///
    /// # Behavior
    ///
    /// 1. Snapshot the current keys
    /// 2. Walk the snapshot `reclaim_batch` keys at a time, yielding the thread between batches
    /// 3. Delete a key only if, under its write lock and at that moment, it has been idle
    ///    for at least `window_seconds`
    ///
    /// The pass is not a snapshot of the records: keys inserted after step 1 are not
    /// visited, and a key refreshed by a concurrent admit before its turn survives.
    pub fn reclaim(&self) -> ReclaimOutcome {
        match self.inner.claim_reclaim() {
            Some(claim) => claim.run(),
            None => ReclaimOutcome::AlreadyRunning,
        }
    }

    /// Start a background thread that calls [`reclaim`](Self::reclaim) every minute.
    ///
    /// See [`run_reclaim_loop_with_interval`](Self::run_reclaim_loop_with_interval).
    pub fn run_reclaim_loop(&self) {
        self.run_reclaim_loop_with_interval(DEFAULT_RECLAIM_INTERVAL_MS);
    }

    /// Start a background thread that calls [`reclaim`](Self::reclaim) every `interval_ms`.
    ///
    /// The first pass runs immediately. Calling this while a loop is already running does
    /// nothing, including not changing the interval. The thread holds only a weak
    /// reference, so it ends once every clone of the tracker is dropped.
    pub fn run_reclaim_loop_with_interval(&self, interval_ms: u64) {
        let mut slot = self
            .inner
            .reclaim_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if slot.is_some() {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let weak = Arc::downgrade(&self.inner);
        let interval = Duration::from_millis(interval_ms.max(1));

        let thread_stop = Arc::clone(&stop);
        match spawn_thread("keygate-reclaim-loop", move || {
            reclaim_loop(weak, interval, thread_stop)
        }) {
            Ok(handle) => {
                tracing::debug!(interval_ms, "keygate.reclaim_loop.started");
                *slot = Some(ReclaimLoopHandle {
                    stop,
                    thread: handle.thread().clone(),
                });
            }
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to spawn reclaim loop thread");
            }
        }
    } // end method run_reclaim_loop_with_interval

    /// Stop the reclaim loop, if running. Idempotent; the loop may be started again.
    pub fn stop_reclaim_loop(&self) {
        let handle = self
            .inner
            .reclaim_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            handle.stop();
            tracing::debug!("keygate.reclaim_loop.stopped");
        }
    }
}

impl<K, C> TrackerInner<K, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    C: Clock,
{
    fn claim_reclaim(self: &Arc<Self>) -> Option<ReclaimClaim<K, C>> {
        self.reclaiming
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        Some(ReclaimClaim {
            inner: Arc::clone(self),
        })
    }

    /// Start a pass in the background unless one is already running.
    pub(crate) fn trigger_reclaim(self: &Arc<Self>) {
        let Some(claim) = self.claim_reclaim() else {
            return;
        };

        tracing::debug!(
            len = self.store.len(),
            max_store_size = *self.options.max_store_size,
            "keygate.reclaim.triggered"
        );

        if let Err(err) = spawn_detached("keygate-reclaim", move || {
            claim.run();
        }) {
            tracing::warn!(error = ?err, "Failed to spawn reclamation pass");
        }
    }

    fn reclaim_pass(&self) -> ReclaimOutcome {
        let window = *self.options.window_seconds;
        let keys: Vec<K> = self.store.iter().map(|entry| entry.key().clone()).collect();

        let mut removed = 0;
        for batch in keys.chunks(*self.options.reclaim_batch) {
            for key in batch {
                let now = self.clock.now_secs();
                if self
                    .store
                    .remove_if(key, |_, record| record.idle_secs(now) >= window)
                    .is_some()
                {
                    removed += 1;
                }
            }

            thread::yield_now();
        }

        tracing::debug!(
            scanned = keys.len(),
            removed,
            remaining = self.store.len(),
            "keygate.reclaim.completed"
        );

        ReclaimOutcome::Completed {
            scanned: keys.len(),
            removed,
        }
    } // end method reclaim_pass
}

fn reclaim_loop<K, C>(weak: Weak<TrackerInner<K, C>>, interval: Duration, stop: Arc<AtomicBool>)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    C: Clock,
{
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }

        let Some(inner) = weak.upgrade() else {
            return;
        };

        if let Some(claim) = inner.claim_reclaim() {
            claim.run();
        }
        drop(inner);

        let deadline = Instant::now() + interval;
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            thread::park_timeout(remaining);
        }
    }
}
