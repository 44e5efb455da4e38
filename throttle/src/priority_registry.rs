//! The pending-priority multiset backing admission ordering.
//!
//! Buckets are kept in a `Vec` sorted strictly by descending priority rather
//! than a linked list of buckets: a sorted `Vec` gets the same
//! O(distinct priorities) walk without hand-rolled `Box` chains, and the
//! common case has very few distinct priorities pending at once.

use parking_lot::Mutex;

/// The default priority used when a caller doesn't specify one.
pub const LOWEST: u32 = 1;

struct Bucket {
    priority: u32,
    count: u32,
}

/// Ordered multiset of pending priorities, thread-safe.
pub struct PriorityRegistry {
    buckets: Mutex<Vec<Bucket>>,
}

impl PriorityRegistry {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(Vec::new()),
        }
    }

    /// Insert one occurrence of `priority`, preserving descending order.
    pub fn register(&self, priority: u32) {
        let mut buckets = self.buckets.lock();
        match buckets.binary_search_by(|b| b.priority.cmp(&priority).reverse()) {
            Ok(idx) => buckets[idx].count += 1,
            Err(idx) => buckets.insert(idx, Bucket { priority, count: 1 }),
        }
    }

    /// True iff at least one occurrence of `priority` lies within the first
    /// `budget` occurrences, walking from the head and decrementing `budget`
    /// by each bucket's count.
    pub fn is_among_first(&self, priority: u32, budget: u32) -> bool {
        let mut remaining = budget;
        for bucket in self.buckets.lock().iter() {
            if bucket.priority == priority {
                return remaining > 0;
            }
            if remaining <= bucket.count {
                return false;
            }
            remaining -= bucket.count;
        }
        false
    }

    /// Remove one occurrence of `priority` (the head-most bucket with that
    /// priority), dropping the bucket once empty. Returns whether a
    /// removal occurred.
    pub fn remove_one(&self, priority: u32) -> bool {
        let mut buckets = self.buckets.lock();
        let Ok(idx) = buckets.binary_search_by(|b| b.priority.cmp(&priority).reverse()) else {
            return false;
        };
        buckets[idx].count -= 1;
        if buckets[idx].count == 0 {
            buckets.remove(idx);
        }
        true
    }

    /// True iff the highest-priority pending bucket has priority [`LOWEST`],
    /// i.e. there is no higher-priority contender currently registered.
    /// Vacuously true when nothing is registered.
    pub fn top_is_lowest(&self) -> bool {
        self.buckets
            .lock()
            .first()
            .map_or(true, |b| b.priority == LOWEST)
    }

    /// Total outstanding registrations, summed across all buckets.
    /// Exposed for tests asserting no registration ever leaks.
    pub fn total_count(&self) -> u32 {
        self.buckets.lock().iter().map(|b| b.count).sum()
    }
}

impl Default for PriorityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_remove_restores_state() {
        let reg = PriorityRegistry::new();
        assert_eq!(reg.total_count(), 0);
        reg.register(5);
        assert_eq!(reg.total_count(), 1);
        assert!(reg.remove_one(5));
        assert_eq!(reg.total_count(), 0);
    }

    #[test]
    fn descending_order_maintained() {
        let reg = PriorityRegistry::new();
        reg.register(3);
        reg.register(7);
        reg.register(5);
        reg.register(7);
        let buckets = reg.buckets.lock();
        let priorities: Vec<u32> = buckets.iter().map(|b| b.priority).collect();
        assert_eq!(priorities, vec![7, 5, 3]);
        assert_eq!(buckets.iter().find(|b| b.priority == 7).unwrap().count, 2);
    }

    #[test]
    fn is_among_first_true_for_large_n() {
        let reg = PriorityRegistry::new();
        reg.register(1);
        reg.register(2);
        reg.register(2);
        // For any N >= total_count, is_among_first is equivalent to "present".
        assert!(reg.is_among_first(1, 10));
        assert!(reg.is_among_first(2, 10));
        assert!(!reg.is_among_first(99, 10));
    }

    #[test]
    fn is_among_first_respects_budget() {
        let reg = PriorityRegistry::new();
        reg.register(9); // one occurrence at the head
        reg.register(5); // one occurrence behind it
        // Budget of 1 only covers the priority-9 occurrence.
        assert!(reg.is_among_first(9, 1));
        assert!(!reg.is_among_first(5, 1));
        // Budget of 2 reaches the priority-5 occurrence too.
        assert!(reg.is_among_first(5, 2));
    }

    #[test]
    fn top_is_lowest_reflects_head_bucket() {
        let reg = PriorityRegistry::new();
        assert!(reg.top_is_lowest()); // empty registry is vacuously true
        reg.register(LOWEST);
        assert!(reg.top_is_lowest());
        reg.register(42);
        assert!(!reg.top_is_lowest());
        reg.remove_one(42);
        assert!(reg.top_is_lowest());
    }

    #[test]
    fn remove_one_on_absent_priority_is_noop() {
        let reg = PriorityRegistry::new();
        reg.register(4);
        assert!(!reg.remove_one(5));
        assert_eq!(reg.total_count(), 1);
    }

    #[test]
    fn fifo_order_is_registration_order_within_a_bucket() {
        // PriorityRegistry only tracks counts, not per-call identity; FIFO
        // ordering within a priority class is a property of the caller
        // population (each remove_one takes from the head-most bucket,
        // which holds every same-priority caller indistinguishably), not
        // something the registry itself needs to track per-caller state for.
        let reg = PriorityRegistry::new();
        reg.register(2);
        reg.register(2);
        reg.register(2);
        assert_eq!(reg.total_count(), 3);
        assert!(reg.remove_one(2));
        assert!(reg.remove_one(2));
        assert_eq!(reg.total_count(), 1);
    }
}
