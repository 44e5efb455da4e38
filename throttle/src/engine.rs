//! The blocking `acquire` protocol.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::cycle_tracker::CycleTracker;
use crate::error::AcquireError;
use crate::priority_registry::{PriorityRegistry, LOWEST};

/// The engine's monitor: a (mutex, condvar) pair the caller sleeps on
/// between eligibility checks. Admission decisions themselves take no lock
/// here — correctness instead rests on `PriorityRegistry` and
/// `CycleTracker` each preserving their own invariants under their own
/// internal locks.
struct Monitor {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl Monitor {
    fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Sleep for at most `dur`, or until woken by [`Monitor::notify_all`].
    /// Spurious wakeups are permitted and harmless: the caller always
    /// re-checks eligibility on the next loop iteration.
    fn wait(&self, dur: Duration) {
        let mut guard = self.mutex.lock();
        self.condvar.wait_for(&mut guard, dur);
    }

    fn notify_all(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// An explicit, shareable cancellation handle for one in-flight (or
/// not-yet-started) [`RateLimiter::acquire_cancellable`] call.
///
/// Rust has no built-in way to asynchronously interrupt a blocked thread,
/// so cancellation here is an explicit handle the caller obtains up front
/// and can share with whichever thread should be able to cancel it.
/// `cancel()` both sets the flag and wakes the engine's monitor, so a
/// sleeping caller observes the cancellation promptly rather than after its
/// current sleep naturally elapses.
pub struct CancellationToken<'a> {
    limiter: &'a RateLimiter,
    cancelled: AtomicBool,
}

impl<'a> CancellationToken<'a> {
    /// Mark this token cancelled and wake the engine's monitor so any caller
    /// currently blocked in `acquire_cancellable` with this token observes
    /// it on its next wakeup.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.limiter.monitor.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The admission engine. Construct via
/// [`crate::builder::RateLimiterBuilder`].
pub struct RateLimiter {
    registry: PriorityRegistry,
    tracker: CycleTracker,
    default_timeout: Option<Duration>,
    monitor: Monitor,
}

impl RateLimiter {
    pub(crate) fn new(caps: [u32; 3], default_timeout: Option<Duration>) -> Self {
        Self {
            registry: PriorityRegistry::new(),
            tracker: CycleTracker::new(caps),
            default_timeout,
            monitor: Monitor::new(),
        }
    }

    /// `acquire(LOWEST, default_timeout)`.
    pub fn acquire(&self) -> Result<(), AcquireError> {
        self.acquire_internal(LOWEST, self.default_timeout, None)
    }

    /// `acquire(priority, default_timeout)`.
    pub fn acquire_with_priority(&self, priority: u32) -> Result<(), AcquireError> {
        self.acquire_internal(priority, self.default_timeout, None)
    }

    /// `acquire(LOWEST, timeout)`.
    pub fn acquire_with_timeout(&self, timeout: Duration) -> Result<(), AcquireError> {
        self.acquire_internal(LOWEST, Some(timeout), None)
    }

    /// `acquire(priority, timeout)`.
    pub fn acquire_with(&self, priority: u32, timeout: Duration) -> Result<(), AcquireError> {
        self.acquire_internal(priority, Some(timeout), None)
    }

    /// Obtain a handle that can cancel an in-flight `acquire_cancellable`
    /// call for this engine.
    pub fn cancellation_token(&self) -> CancellationToken<'_> {
        CancellationToken {
            limiter: self,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Like [`RateLimiter::acquire_with`], but cooperatively cancellable via
    /// `token`. `timeout: None` blocks until admitted or cancelled.
    pub fn acquire_cancellable(
        &self,
        priority: u32,
        timeout: Option<Duration>,
        token: &CancellationToken<'_>,
    ) -> Result<(), AcquireError> {
        self.acquire_internal(priority, timeout, Some(token))
    }

    fn acquire_internal(
        &self,
        priority: u32,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken<'_>>,
    ) -> Result<(), AcquireError> {
        let priority = priority.max(LOWEST);
        let t0 = Instant::now();
        self.registry.register(priority);

        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    self.registry.remove_one(priority);
                    tracing::debug!(priority, "acquire cancelled");
                    return Err(AcquireError::Cancelled);
                }
            }

            let now = Instant::now();
            self.tracker.roll(now);

            let leftover = self.tracker.leftover();
            let eligible =
                self.registry.top_is_lowest() || self.registry.is_among_first(priority, leftover);

            if eligible && self.tracker.available() {
                self.registry.remove_one(priority);
                self.monitor.notify_all();
                tracing::debug!(
                    priority,
                    waited_ms = now.duration_since(t0).as_millis() as u64,
                    "acquire admitted"
                );
                return Ok(());
            }

            if let Some(timeout) = timeout {
                if now.duration_since(t0) >= timeout {
                    self.registry.remove_one(priority);
                    tracing::warn!(priority, "acquire timed out");
                    return Err(AcquireError::Timeout);
                }
            }

            let mut wait = self
                .tracker
                .next_second_boundary()
                .saturating_duration_since(now)
                .max(Duration::from_millis(1));
            if let Some(timeout) = timeout {
                let remaining = timeout
                    .saturating_sub(now.duration_since(t0))
                    .max(Duration::from_millis(1));
                wait = wait.min(remaining);
            }

            self.monitor.wait(wait);
        }
    }
}
