//! Per-key mutual exclusion with bounded in-flight capacity.
//!
//! Bundled alongside `throttle`'s admission engine as a secondary
//! collaborator sharing the same concurrency-primitive theme, but it has no
//! dependency on the rate limiter itself — it can be used standalone.

mod error;
mod semaphore;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub use error::KeyedMutexError;
use semaphore::Semaphore;

struct Entry {
    /// Reentrant so a thread that already holds `key`'s lock can call
    /// `locked` again for the same key without deadlocking itself.
    lock: ReentrantMutex<()>,
    /// Count of current holders + queued waiters for this key. An entry is
    /// evicted once this reaches zero on release, so the map doesn't grow
    /// without bound.
    refs: AtomicUsize,
}

thread_local! {
    /// Per-thread nesting depth, keyed by `Entry` address, for keys this
    /// thread currently holds. A bounded `KeyedMutex`'s capacity semaphore
    /// counts concurrently *held* keys, not re-entrant calls onto one a
    /// thread already holds — without this, a thread nested inside its own
    /// `locked(key, ..)` call would try to take a second permit for the key
    /// it's already holding and deadlock itself once capacity is exhausted.
    /// Only the outermost call for a given entry acquires/releases a permit.
    static HELD_DEPTH: RefCell<HashMap<usize, usize>> = RefCell::new(HashMap::new());
}

/// Builder for [`KeyedMutex`].
#[derive(Debug, Clone)]
pub struct KeyedMutexBuilder {
    capacity: usize,
    fair: bool,
    fail_fast: bool,
}

impl KeyedMutexBuilder {
    pub fn new() -> Self {
        Self {
            capacity: usize::MAX,
            fair: false,
            fail_fast: false,
        }
    }

    /// Maximum number of simultaneously held locks across all keys.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Route the capacity semaphore through a FIFO queue instead of letting
    /// any woken waiter race for the next permit.
    pub fn fair(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    /// When the capacity is exhausted, fail with
    /// [`KeyedMutexError::CapacityExceeded`] instead of blocking.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn build<K: Eq + Hash>(self) -> KeyedMutex<K> {
        KeyedMutex {
            entries: DashMap::new(),
            semaphore: Semaphore::new(self.capacity, self.fair),
            fail_fast: self.fail_fast,
        }
    }
}

impl Default for KeyedMutexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A mapping from application-supplied keys to per-key reentrant locks,
/// bounded by a total in-flight capacity.
pub struct KeyedMutex<K> {
    entries: DashMap<K, Arc<Entry>>,
    semaphore: Semaphore,
    fail_fast: bool,
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    /// An unbounded, non-fair, blocking keyed mutex. Use
    /// [`KeyedMutexBuilder`] to configure capacity/fairness/fail-fast mode.
    pub fn new() -> Self {
        KeyedMutexBuilder::new().build()
    }

    /// Acquire `key`'s lock (creating it on first use), run `action`, then
    /// release — evicting the key's entry afterward if nobody else is
    /// holding or waiting on it.
    ///
    /// A thread that already holds `key`'s lock (a nested call from inside
    /// its own `action`) reuses that hold instead of taking a second permit
    /// from the capacity semaphore, so reentrant use stays safe even under a
    /// bounded `capacity`.
    pub fn locked<F, R>(&self, key: K, action: F) -> Result<R, KeyedMutexError>
    where
        F: FnOnce() -> R,
    {
        let entry = {
            let entry = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(Entry {
                        lock: ReentrantMutex::new(()),
                        refs: AtomicUsize::new(0),
                    })
                });
            entry.refs.fetch_add(1, Ordering::SeqCst);
            Arc::clone(&entry)
        };

        let ptr = Arc::as_ptr(&entry) as usize;
        let nested = HELD_DEPTH.with(|held| {
            let mut held = held.borrow_mut();
            let depth = held.entry(ptr).or_insert(0);
            let nested = *depth > 0;
            *depth += 1;
            nested
        });

        if !nested {
            let permit = if self.fail_fast {
                self.semaphore.try_acquire()
            } else {
                self.semaphore.acquire();
                Ok(())
            };
            if let Err(err) = permit {
                HELD_DEPTH.with(|held| {
                    held.borrow_mut().remove(&ptr);
                });
                if entry.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
                    self.entries.remove_if(&key, |_, e| {
                        Arc::ptr_eq(e, &entry) && e.refs.load(Ordering::SeqCst) == 0
                    });
                }
                return Err(err);
            }
        }

        let result = {
            let _guard = entry.lock.lock();
            action()
        };

        let last_hold = HELD_DEPTH.with(|held| {
            let mut held = held.borrow_mut();
            let depth = held.get_mut(&ptr).expect("depth tracked for a held entry");
            *depth -= 1;
            let last = *depth == 0;
            if last {
                held.remove(&ptr);
            }
            last
        });

        if entry.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Nobody else was holding or waiting on this key when we
            // released it. Re-check under the map's own lock before
            // evicting: another caller may have raced in between our
            // fetch_sub and this removal.
            self.entries
                .remove_if(&key, |_, e| Arc::ptr_eq(e, &entry) && e.refs.load(Ordering::SeqCst) == 0);
        }

        if last_hold {
            self.semaphore.release();
        }
        tracing::trace!(tracked_keys = self.entries.len(), "keyed lock released");
        Ok(result)
    }

    /// Number of keys currently tracked (held or recently released but not
    /// yet evicted). Exposed for tests asserting eviction.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self::new()
    }
}
