//! Per-user active-upload counter (spec.md §4.10 step 6/9, §5: "per-user
//! integer incremented/decremented in matched pairs").
//!
//! [`ActiveUploadCounter::increment`] returns a guard whose `Drop`
//! decrements exactly once, so every exit path from the admission
//! pipeline — success, processor failure, an early return, a panic
//! unwind — restores the counter to its pre-request value.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use pagespace_core::UserId;

/// Process-local map of user id to in-flight upload count.
#[derive(Default)]
pub struct ActiveUploadCounter {
    counts: DashMap<UserId, Arc<AtomicI64>>,
}

/// A held increment. Decrements its user's counter on drop.
pub struct CounterGuard {
    counter: Arc<AtomicI64>,
}

impl Drop for CounterGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ActiveUploadCounter {
    /// Construct an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `user_id`'s active-upload count and return a guard that
    /// decrements it again when dropped.
    pub fn increment(&self, user_id: UserId) -> CounterGuard {
        let counter = self.counts.entry(user_id).or_insert_with(|| Arc::new(AtomicI64::new(0))).clone();
        counter.fetch_add(1, Ordering::SeqCst);
        CounterGuard { counter }
    }

    /// Current count for a user (0 if never seen).
    #[must_use]
    pub fn count(&self, user_id: UserId) -> i64 {
        self.counts.get(&user_id).map_or(0, |c| c.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_then_drop_restores_zero() {
        let counter = ActiveUploadCounter::new();
        let user = UserId::new();
        assert_eq!(counter.count(user), 0);
        {
            let _guard = counter.increment(user);
            assert_eq!(counter.count(user), 1);
        }
        assert_eq!(counter.count(user), 0);
    }

    #[test]
    fn released_on_early_return_via_question_mark() {
        let counter = ActiveUploadCounter::new();
        let user = UserId::new();

        fn fallible(counter: &ActiveUploadCounter, user: UserId) -> Result<(), ()> {
            let _guard = counter.increment(user);
            Err(())
        }

        let _ = fallible(&counter, user);
        assert_eq!(counter.count(user), 0);
    }

    #[test]
    fn tracks_multiple_concurrent_holders_for_same_user() {
        let counter = ActiveUploadCounter::new();
        let user = UserId::new();
        let first = counter.increment(user);
        let second = counter.increment(user);
        assert_eq!(counter.count(user), 2);
        drop(first);
        assert_eq!(counter.count(user), 1);
        drop(second);
        assert_eq!(counter.count(user), 0);
    }
}
