//! Per-tier upload semaphore (spec.md §4.10 step 4, §5: "per-tier bounded
//! counter. Acquisition is non-blocking and returns an opaque slot handle
//! or nil; release is idempotent by handle.").
//!
//! `tokio::sync::Semaphore::try_acquire_owned` already gives us exactly
//! that contract: a non-blocking acquire, and a permit whose `Drop`
//! releases the slot exactly once, satisfying the guaranteed-release rule
//! without any bespoke bookkeeping.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The fixed tier enumeration; each tier bounds how many uploads one user
/// may have in flight at once. Not named by the distilled spec — chosen
/// to mirror the three-tier shape common to the rest of this system's
/// provider/plan distinctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserTier {
    /// Default tier.
    Free,
    /// Paid individual tier.
    Pro,
    /// Paid team tier.
    Team,
}

impl UserTier {
    /// Maximum concurrent uploads this tier's semaphore permits.
    #[must_use]
    pub const fn max_concurrent_uploads(self) -> usize {
        match self {
            Self::Free => 2,
            Self::Pro => 5,
            Self::Team => 10,
        }
    }
}

/// An acquired upload slot. Dropping it releases the slot back to its
/// tier's semaphore.
pub struct UploadSlot {
    _permit: OwnedSemaphorePermit,
}

/// One bounded semaphore per tier, constructed once at startup.
pub struct UploadSemaphores {
    free: Arc<Semaphore>,
    pro: Arc<Semaphore>,
    team: Arc<Semaphore>,
}

impl UploadSemaphores {
    /// Build the fixed set of per-tier semaphores.
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Arc::new(Semaphore::new(UserTier::Free.max_concurrent_uploads())),
            pro: Arc::new(Semaphore::new(UserTier::Pro.max_concurrent_uploads())),
            team: Arc::new(Semaphore::new(UserTier::Team.max_concurrent_uploads())),
        }
    }

    fn semaphore_for(&self, tier: UserTier) -> &Arc<Semaphore> {
        match tier {
            UserTier::Free => &self.free,
            UserTier::Pro => &self.pro,
            UserTier::Team => &self.team,
        }
    }

    /// Non-blocking acquire. `None` means no slot is currently available
    /// for this tier (spec.md §4.10 step 4: return 429).
    #[must_use]
    pub fn try_acquire(&self, tier: UserTier) -> Option<UploadSlot> {
        self.semaphore_for(tier)
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| UploadSlot { _permit: permit })
    }

    /// Slots currently available for a tier, for admin/metrics views.
    #[must_use]
    pub fn available(&self, tier: UserTier) -> usize {
        self.semaphore_for(tier).available_permits()
    }
}

impl Default for UploadSemaphores {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_bounds_concurrent_slots() {
        let semaphores = UploadSemaphores::new();
        let mut slots = Vec::new();
        for _ in 0..UserTier::Free.max_concurrent_uploads() {
            slots.push(semaphores.try_acquire(UserTier::Free).expect("slot available"));
        }
        assert!(semaphores.try_acquire(UserTier::Free).is_none());

        drop(slots.pop());
        assert!(semaphores.try_acquire(UserTier::Free).is_some());
    }

    #[test]
    fn tiers_are_independent() {
        let semaphores = UploadSemaphores::new();
        let _free_slots: Vec<_> = (0..UserTier::Free.max_concurrent_uploads())
            .map(|_| semaphores.try_acquire(UserTier::Free).unwrap())
            .collect();
        assert!(semaphores.try_acquire(UserTier::Free).is_none());
        assert!(semaphores.try_acquire(UserTier::Pro).is_some());
    }

    #[test]
    fn release_is_available_again_after_drop() {
        let semaphores = UploadSemaphores::new();
        let before = semaphores.available(UserTier::Team);
        let slot = semaphores.try_acquire(UserTier::Team).unwrap();
        assert_eq!(semaphores.available(UserTier::Team), before - 1);
        drop(slot);
        assert_eq!(semaphores.available(UserTier::Team), before);
    }
}
