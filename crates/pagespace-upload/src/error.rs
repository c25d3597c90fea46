//! Error types for upload admission.

/// Result alias for this crate.
pub type UploadResult<T> = Result<T, UploadError>;

/// Failures from the upload admission pipeline (spec.md §4.10), each
/// mapped by the server crate to the HTTP status named in its doc.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UploadError {
    /// The memory monitor refused admission. Maps to 503.
    #[error("upload rejected: {0}")]
    MemoryRejected(String),
    /// `user.usedBytes + file.size > user.quotaBytes`. Maps to 413.
    #[error("storage quota exceeded")]
    QuotaExceeded {
        /// Bytes already used.
        used_bytes: u64,
        /// The user's total quota.
        quota_bytes: u64,
    },
    /// No upload-semaphore slot was available for the user's tier. Maps
    /// to 429.
    #[error("too many concurrent uploads")]
    NoSlotAvailable,
    /// The file processor call failed. Maps to 500; the caller must still
    /// insert a `FILE` page with `processingStatus = failed` before
    /// surfacing this error.
    #[error("processor failed: {0}")]
    ProcessorFailed(String),
}
