//! Error types for stream orchestration.

/// Result alias for this crate.
pub type StreamResult<T> = Result<T, StreamError>;

/// Failures from assembling or driving a streaming chat request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StreamError {
    /// The user message failed attachment validation (C9). Maps to 400.
    #[error(transparent)]
    InvalidAttachment(#[from] pagespace_ai::AiError),
    /// Provider resolution or the provider call itself failed.
    #[error("provider error: {0}")]
    Provider(String),
}
