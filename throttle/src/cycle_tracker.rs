//! Per-window throughput counters with rollover.

use parking_lot::Mutex;
use std::time::Instant;

use crate::window::TimeUnit;

struct Inner {
    /// `cap[w] == 0` means window `w` is not constrained.
    caps: [u32; 3],
    used: [u32; 3],
    /// One `lapsed` epoch *per window* rather than a single shared stamp,
    /// so rolling the second window over can never prematurely reset the
    /// minute or hour window.
    lapsed: [Instant; 3],
}

/// Per-window request counters, replicated across SECOND/MINUTE/HOUR.
pub struct CycleTracker {
    inner: Mutex<Inner>,
}

impl CycleTracker {
    pub fn new(caps: [u32; 3]) -> Self {
        let now = Instant::now();
        Self {
            inner: Mutex::new(Inner {
                caps,
                used: [0; 3],
                lapsed: [now; 3],
            }),
        }
    }

    /// Reset any window whose cycle has fully elapsed as of `now`. Idempotent
    /// and monotonic: calling this with a non-advancing clock is a no-op.
    pub fn roll(&self, now: Instant) {
        let mut inner = self.inner.lock();
        for unit in TimeUnit::ALL {
            let w = unit.index();
            if inner.caps[w] == 0 {
                continue;
            }
            if now.saturating_duration_since(inner.lapsed[w]) >= unit.duration() {
                inner.used[w] = 0;
                inner.lapsed[w] = now;
            }
        }

        #[cfg(feature = "debug-trace")]
        tracing::trace!(
            used = ?inner.used,
            caps = ?inner.caps,
            "cycle tracker rolled"
        );
    }

    /// The admission gate: true iff every configured window still has
    /// capacity, in which case every configured window's counter is
    /// incremented atomically with the check ("check all, then increment
    /// all"). No counter is touched if this returns `false`.
    pub fn available(&self) -> bool {
        let mut inner = self.inner.lock();
        for unit in TimeUnit::ALL {
            let w = unit.index();
            if inner.caps[w] > 0 && inner.used[w] >= inner.caps[w] {
                return false;
            }
        }
        for unit in TimeUnit::ALL {
            let w = unit.index();
            if inner.caps[w] > 0 {
                inner.used[w] += 1;
            }
        }
        true
    }

    /// Admissions still permitted right now, taken as the minimum remaining
    /// budget across all *configured* windows — the tightest constraint
    /// binds.
    pub fn leftover(&self) -> u32 {
        let inner = self.inner.lock();
        TimeUnit::ALL
            .iter()
            .map(|u| u.index())
            .filter(|&w| inner.caps[w] > 0)
            .map(|w| inner.caps[w] - inner.used[w].min(inner.caps[w]))
            .min()
            .unwrap_or(u32::MAX)
    }

    /// The next wall-clock instant at which the SECOND window rolls over —
    /// the engine never sleeps longer than this, so a rollover is never
    /// missed.
    pub fn next_second_boundary(&self) -> Instant {
        let inner = self.inner.lock();
        let w = TimeUnit::Second.index();
        inner.lapsed[w] + TimeUnit::Second.duration()
    }
}
