//! Error types for provider resolution, capability lookup, prompt
//! assembly, and attachment validation.

/// Result alias for this crate.
pub type AiResult<T> = Result<T, AiError>;

/// Provider-resolution and streaming failures (spec.md §4.4, §7).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AiError {
    /// Caller-side misconfiguration: missing API key, unknown provider,
    /// missing base URL for a local server provider. Maps to 400.
    #[error("{0}")]
    Misconfigured(String),

    /// The provider call itself failed after resolution succeeded (network
    /// error, non-2xx from the upstream API). Maps to 500.
    #[error("Failed to initialize AI provider")]
    ProviderInitFailed,

    /// An attachment failed validation (C9). Maps to 400 with the
    /// contained human-readable reason.
    #[error("{0}")]
    InvalidAttachment(String),
}
