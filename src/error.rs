/// Error type for this crate.
///
/// Only returned by the strict `TryFrom` constructors of the option newtypes. Admission and
/// reclamation never fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    /// Max count is zero.
    #[error("{0}")]
    InvalidMaxCount(String),
    /// Window is zero seconds.
    #[error("{0}")]
    InvalidWindowSeconds(String),
    /// Capacity hint is zero.
    #[error("{0}")]
    InvalidCapacityHint(String),
    /// Reclaim batch is zero.
    #[error("{0}")]
    InvalidReclaimBatch(String),
}
