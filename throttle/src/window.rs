//! Window granularities the limiter tracks throughput over.

use std::time::Duration;

/// A throughput window granularity, in ascending order.
///
/// The discriminants double as indices into the three-element arrays
/// [`crate::cycle_tracker::CycleTracker`] keeps per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second = 0,
    Minute = 1,
    Hour = 2,
}

impl TimeUnit {
    /// All three windows, in index order.
    pub const ALL: [TimeUnit; 3] = [TimeUnit::Second, TimeUnit::Minute, TimeUnit::Hour];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Wall-clock length of one cycle of this window.
    pub const fn duration(self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
        }
    }

    /// `value` occurrences of this unit, expressed as a [`Duration`].
    ///
    /// Used by [`crate::builder::RateLimiterBuilder::with_timeout`], which
    /// accepts a timeout expressed in the same three window units rather
    /// than an arbitrary sub-second resolution.
    pub const fn scaled(self, value: u64) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(value),
            TimeUnit::Minute => Duration::from_secs(value.saturating_mul(60)),
            TimeUnit::Hour => Duration::from_secs(value.saturating_mul(3600)),
        }
    }
}
