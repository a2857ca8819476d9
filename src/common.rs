use std::ops::Deref;

use crate::TrackerError;

/// Activity state tracked for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityRecord {
    /// Clock seconds of the last admitted action for this key.
    pub last_update: u64,
    /// Admitted actions since the record was created.
    ///
    /// Never reset by the window; only deleting the record starts a key over at 1.
    pub count: u64,
}

impl ActivityRecord {
    pub(crate) fn first(now: u64) -> Self {
        Self {
            last_update: now,
            count: 1,
        }
    }

    pub(crate) fn admitted(&self, now: u64) -> Self {
        Self {
            last_update: now,
            count: self.count.saturating_add(1),
        }
    }

    /// Seconds since the last admitted action, saturating at zero if the clock went backwards.
    pub(crate) fn idle_secs(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_update)
    }
}

/// Result of a [`Tracker::reclaim`](crate::Tracker::reclaim) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// This call ran a full pass.
    Completed {
        /// Keys visited by the pass.
        scanned: usize,
        /// Records deleted because they were idle for at least the window.
        removed: usize,
    },
    /// Another pass held the in-progress flag; nothing was done.
    AlreadyRunning,
}

macro_rules! deref_newtype {
    ($name:ident, $inner:ty) => {
        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

/// Admitted-action ceiling within the window.
///
/// A key whose record reached this count is denied until it has been idle for a full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaxCount(u64);

impl MaxCount {
    /// Normalize a raw value: anything `<= 0` becomes the default of 30.
    pub fn from_raw(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(value) if value > 0 => Self(value),
            _ => Self::default(),
        }
    }
}

impl Default for MaxCount {
    /// Returns a max count of 30.
    fn default() -> Self {
        Self(30)
    }
}

deref_newtype!(MaxCount, u64);

impl TryFrom<u64> for MaxCount {
    type Error = TrackerError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(TrackerError::InvalidMaxCount(
                "Max count must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Inactivity threshold in seconds.
///
/// Gates both the deny decision (a key idle this long is admitted unconditionally) and
/// reclamation eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WindowSeconds(u64);

impl WindowSeconds {
    /// Normalize a raw value: anything `<= 0` becomes the default of 3600.
    pub fn from_raw(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(value) if value > 0 => Self(value),
            _ => Self::default(),
        }
    }
}

impl Default for WindowSeconds {
    /// Returns a window of one hour.
    fn default() -> Self {
        Self(3600)
    }
}

deref_newtype!(WindowSeconds, u64);

impl TryFrom<u64> for WindowSeconds {
    type Error = TrackerError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(TrackerError::InvalidWindowSeconds(
                "Window must be at least 1 second".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Number of records the store pre-allocates room for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CapacityHint(usize);

impl CapacityHint {
    /// Normalize a raw value: anything `<= 0` becomes the default of 2048.
    pub fn from_raw(value: i64) -> Self {
        match usize::try_from(value) {
            Ok(value) if value > 0 => Self(value),
            _ => Self::default(),
        }
    }
}

impl Default for CapacityHint {
    /// Returns a capacity hint of 2048.
    fn default() -> Self {
        Self(2048)
    }
}

deref_newtype!(CapacityHint, usize);

impl TryFrom<usize> for CapacityHint {
    type Error = TrackerError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(TrackerError::InvalidCapacityHint(
                "Capacity hint must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Store size at which an admit triggers a background reclamation pass.
///
/// `0` is the unbounded mode: the store may grow without limit and admits never trigger
/// reclamation. Explicit [`Tracker::reclaim`](crate::Tracker::reclaim) calls and the
/// reclaim loop still work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MaxStoreSize(usize);

impl MaxStoreSize {
    /// Normalize a raw value: negative becomes the default of 16384, `0` stays unbounded.
    pub fn from_raw(value: i64) -> Self {
        match usize::try_from(value) {
            Ok(value) => Self(value),
            Err(_) => Self::default(),
        }
    }

    /// No ceiling; admits never trigger reclamation.
    pub fn unbounded() -> Self {
        Self(0)
    }

    /// Whether this is the unbounded mode.
    pub fn is_unbounded(&self) -> bool {
        self.0 == 0
    }

    pub(crate) fn is_reached_by(&self, len: usize) -> bool {
        !self.is_unbounded() && len >= self.0
    }
}

impl Default for MaxStoreSize {
    /// Returns a ceiling of 16384 records.
    fn default() -> Self {
        Self(16384)
    }
}

deref_newtype!(MaxStoreSize, usize);

impl From<usize> for MaxStoreSize {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Number of entries a reclamation pass processes per exclusive acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReclaimBatch(usize);

impl ReclaimBatch {
    /// Normalize a raw value: anything `<= 0` becomes the default of 20.
    pub fn from_raw(value: i64) -> Self {
        match usize::try_from(value) {
            Ok(value) if value > 0 => Self(value),
            _ => Self::default(),
        }
    }
}

impl Default for ReclaimBatch {
    /// Returns a batch of 20 entries.
    fn default() -> Self {
        Self(20)
    }
}

deref_newtype!(ReclaimBatch, usize);

impl TryFrom<usize> for ReclaimBatch {
    type Error = TrackerError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(TrackerError::InvalidReclaimBatch(
                "Reclaim batch must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}
