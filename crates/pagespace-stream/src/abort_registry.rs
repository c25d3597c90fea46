//! Abort Registry (C10, spec.md §4.8).
//!
//! A process-local map from stream id to its cancellation handle and
//! owning user, with a lazily-started sweeper that evicts stale entries.
//! The "global in-module Map" from the source is replaced here with a
//! small type with an explicit lifecycle (spec.md §9 design note):
//! constructed once, shared by `Arc`, its sweeper started on first
//! insert rather than at construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use pagespace_core::{StreamId, UserId};
use tokio_util::sync::CancellationToken;

/// Entries older than this are evicted by the sweeper, regardless of
/// whether their stream ever finished cleanly (spec.md §4.8).
pub const STALE_ENTRY_TTL: Duration = Duration::from_secs(10 * 60);

/// How often the sweeper wakes to check for stale entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    cancel: CancellationToken,
    created_at: Instant,
    user_id: UserId,
}

/// Outcome of an [`AbortRegistry::abort`] call, matching spec.md §4.8's
/// three exact result shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortOutcome {
    /// Whether the stream was actually cancelled by this call.
    pub aborted: bool,
    /// Human-readable reason, surfaced verbatim to the client.
    pub reason: &'static str,
}

/// The process-local registry of in-flight streams.
pub struct AbortRegistry {
    entries: Arc<DashMap<StreamId, Entry>>,
    sweeper_started: AtomicBool,
}

impl AbortRegistry {
    /// Construct an empty registry. The sweeper does not run until the
    /// first [`AbortRegistry::create`] call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            sweeper_started: AtomicBool::new(false),
        }
    }

    /// Register a new in-flight stream, generating a fresh id if `stream_id`
    /// is `None`. Returns the id and the cancellation token the
    /// orchestrator must thread through the provider call.
    pub fn create(&self, user_id: UserId, stream_id: Option<StreamId>) -> (StreamId, CancellationToken) {
        self.ensure_sweeper_started();

        let id = stream_id.unwrap_or_default();
        let cancel = CancellationToken::new();
        self.entries.insert(
            id.clone(),
            Entry {
                cancel: cancel.clone(),
                created_at: Instant::now(),
                user_id,
            },
        );
        (id, cancel)
    }

    /// `abort(streamId, requesterUserId)` per spec.md §4.8: an IDOR guard
    /// that never reveals whether a stream exists to someone who doesn't
    /// own it.
    #[must_use]
    pub fn abort(&self, stream_id: &StreamId, requester_user_id: UserId) -> AbortOutcome {
        let Some(entry) = self.entries.get(stream_id) else {
            return AbortOutcome {
                aborted: false,
                reason: "Stream not found or already completed",
            };
        };

        if entry.user_id != requester_user_id {
            return AbortOutcome {
                aborted: false,
                reason: "Unauthorized to abort this stream",
            };
        }

        entry.cancel.cancel();
        drop(entry);
        self.entries.remove(stream_id);

        AbortOutcome {
            aborted: true,
            reason: "Stream aborted by user request",
        }
    }

    /// `remove(streamId)`: silent no-op if absent. Invoked from the
    /// stream's on-finish hook regardless of how it ended.
    pub fn remove(&self, stream_id: &StreamId) {
        self.entries.remove(stream_id);
    }

    /// `isActive(streamId)`.
    #[must_use]
    pub fn is_active(&self, stream_id: &StreamId) -> bool {
        self.entries.contains_key(stream_id)
    }

    /// `activeCount()`.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    fn ensure_sweeper_started(&self) {
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                let now = Instant::now();
                entries.retain(|_, entry| now.duration_since(entry.created_at) < STALE_ENTRY_TTL);
            }
        });
    }
}

impl Default for AbortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_without_id_generates_one() {
        let registry = AbortRegistry::new();
        let (id, _token) = registry.create(UserId::new(), None);
        assert!(registry.is_active(&id));
    }

    #[test]
    fn abort_by_owner_cancels_and_removes() {
        let registry = AbortRegistry::new();
        let user = UserId::new();
        let (id, token) = registry.create(user, None);
        let outcome = registry.abort(&id, user);
        assert!(outcome.aborted);
        assert_eq!(outcome.reason, "Stream aborted by user request");
        assert!(token.is_cancelled());
        assert!(!registry.is_active(&id));
    }

    #[test]
    fn abort_by_non_owner_is_idor_safe() {
        let registry = AbortRegistry::new();
        let owner = UserId::new();
        let attacker = UserId::new();
        let (id, token) = registry.create(owner, None);
        let outcome = registry.abort(&id, attacker);
        assert!(!outcome.aborted);
        assert_eq!(outcome.reason, "Unauthorized to abort this stream");
        assert!(!token.is_cancelled());
        assert!(registry.is_active(&id));
    }

    #[test]
    fn abort_is_idempotent() {
        let registry = AbortRegistry::new();
        let user = UserId::new();
        let (id, _token) = registry.create(user, None);
        let first = registry.abort(&id, user);
        assert!(first.aborted);
        let second = registry.abort(&id, user);
        assert!(!second.aborted);
        assert_eq!(second.reason, "Stream not found or already completed");
    }

    #[test]
    fn abort_on_unknown_stream_reports_not_found() {
        let registry = AbortRegistry::new();
        let outcome = registry.abort(&StreamId::new(), UserId::new());
        assert!(!outcome.aborted);
        assert_eq!(outcome.reason, "Stream not found or already completed");
    }

    #[test]
    fn remove_is_silent_no_op_if_absent() {
        let registry = AbortRegistry::new();
        registry.remove(&StreamId::new());
    }

    #[test]
    fn active_count_tracks_registry_size() {
        let registry = AbortRegistry::new();
        assert_eq!(registry.active_count(), 0);
        let (id, _) = registry.create(UserId::new(), None);
        assert_eq!(registry.active_count(), 1);
        registry.remove(&id);
        assert_eq!(registry.active_count(), 0);
    }
}
