use thiserror::Error;

/// Raised from [`crate::KeyedMutex::locked`] only in fail-fast mode, when no
/// permit is immediately available.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeyedMutexError {
    #[error("no permit available and fail-fast mode is enabled")]
    CapacityExceeded,
}
