//! Error types for the cache crate. Currently infallible; kept as a crate
//! so callers have a stable place to match on future failure modes (e.g.
//! a backing store for a distributed variant) without a breaking change.

/// Result alias for this crate.
pub type CacheResult<T> = Result<T, CacheError>;

/// Placeholder error enum; no fallible operation exists yet.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {}
