//! Error taxonomy for the rate limiter.

use thiserror::Error;

/// Raised synchronously from [`crate::builder::RateLimiterBuilder`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rate must be greater than zero")]
    NonPositiveRate,
    #[error("timeout must be greater than zero")]
    NonPositiveTimeout,
    #[error("a second-level rate (TimeUnit::Second) is required")]
    MissingSecondRate,
}

/// Raised from [`crate::engine::RateLimiter::acquire`] and its variants.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The caller's deadline elapsed before an admission slot became available.
    #[error("acquire timed out before an admission slot became available")]
    Timeout,
    /// The caller's [`crate::engine::CancellationToken`] was cancelled while waiting.
    #[error("acquire was cancelled")]
    Cancelled,
}
