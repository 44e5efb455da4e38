//! Validating configuration builder for the rate limiter.

use std::time::Duration;

use crate::engine::RateLimiter;
use crate::error::ConfigError;
use crate::window::TimeUnit;

/// Validating builder for [`RateLimiter`].
///
/// ```
/// use throttle::{RateLimiterBuilder, TimeUnit};
///
/// let limiter = RateLimiterBuilder::new()
///     .with_rate(100, TimeUnit::Second)
///     .unwrap()
///     .with_timeout(30, TimeUnit::Second)
///     .unwrap()
///     .build()
///     .unwrap();
/// limiter.acquire().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct RateLimiterBuilder {
    rates: [Option<u32>; 3],
    timeout: Option<Duration>,
}

impl RateLimiterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the throughput cap for one window. Calling this again for
    /// the same `unit` overwrites the previous rate.
    pub fn with_rate(mut self, rate: u32, unit: TimeUnit) -> Result<Self, ConfigError> {
        if rate == 0 {
            return Err(ConfigError::NonPositiveRate);
        }
        self.rates[unit.index()] = Some(rate);
        Ok(self)
    }

    /// Configure the default timeout applied when a caller doesn't supply
    /// its own. If never called, `acquire` blocks until admitted (no
    /// deadline).
    pub fn with_timeout(mut self, value: u64, unit: TimeUnit) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::NonPositiveTimeout);
        }
        self.timeout = Some(unit.scaled(value));
        Ok(self)
    }

    /// Validate and assemble the configured [`RateLimiter`].
    ///
    /// Requires at least a `TimeUnit::Second` rate: the second window is the
    /// one the engine's wait loop always wakes up against, so it must be
    /// constrained for the limiter to mean anything.
    pub fn build(self) -> Result<RateLimiter, ConfigError> {
        let second = self.rates[TimeUnit::Second.index()].ok_or(ConfigError::MissingSecondRate)?;
        let caps = [
            second,
            self.rates[TimeUnit::Minute.index()].unwrap_or(0),
            self.rates[TimeUnit::Hour.index()].unwrap_or(0),
        ];
        tracing::debug!(?caps, timeout = ?self.timeout, "building rate limiter");
        Ok(RateLimiter::new(caps, self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_rate() {
        let err = RateLimiterBuilder::new()
            .with_rate(0, TimeUnit::Second)
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveRate);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = RateLimiterBuilder::new()
            .with_timeout(0, TimeUnit::Second)
            .unwrap_err();
        assert_eq!(err, ConfigError::NonPositiveTimeout);
    }

    #[test]
    fn requires_a_second_rate() {
        let err = RateLimiterBuilder::new()
            .with_rate(10, TimeUnit::Minute)
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingSecondRate);
    }

    #[test]
    fn builds_with_only_second_rate() {
        let limiter = RateLimiterBuilder::new()
            .with_rate(5, TimeUnit::Second)
            .unwrap()
            .build();
        assert!(limiter.is_ok());
    }

    #[test]
    fn hierarchical_rates_are_all_applied() {
        let limiter = RateLimiterBuilder::new()
            .with_rate(5, TimeUnit::Second)
            .unwrap()
            .with_rate(60, TimeUnit::Minute)
            .unwrap()
            .with_timeout(29, TimeUnit::Second)
            .unwrap()
            .build()
            .unwrap();
        // Smoke check: a single acquire succeeds immediately under a fresh budget.
        assert!(limiter.acquire().is_ok());
    }
}
