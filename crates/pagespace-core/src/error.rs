//! Base error type shared by crates that have no HTTP-facing concerns of
//! their own (config loading, timezone math, id parsing). Crates with a
//! request/response surface (`pagespace-auth`, `pagespace-server`, ...)
//! define their own `thiserror` enum and convert into it where it helps.

/// Result alias for [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the foundation layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Configuration failed to load or a required key was missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// An IANA timezone id did not resolve to a known timezone.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    /// A value failed basic structural validation.
    #[error("validation error: {0}")]
    Validation(String),
}
