//! The file processor client contract (spec.md §4.10 step 6).
//!
//! The processor is an out-of-process service reached over a short-lived
//! `files:write` service token; this crate only depends on the trait, the
//! concrete HTTP client lives in the server crate.

use async_trait::async_trait;

/// The processor's response on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFile {
    /// Content-addressed hash of the stored bytes.
    pub content_hash: String,
    /// `true` if a page with this hash already existed for the drive.
    pub deduplicated: bool,
    /// Size in bytes as measured by the processor.
    pub size: u64,
    /// Background job ids queued for this file (thumbnailing, OCR, etc).
    pub jobs: Vec<String>,
}

/// One file submitted for processing.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    /// Sanitized filename.
    pub filename: String,
    /// MIME type as reported by the client.
    pub media_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Dispatches a file to the out-of-process processor.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Submit a file, authenticated with a short-lived `files:write`
    /// service token scoped to `drive_id`.
    async fn process(&self, drive_id: pagespace_core::DriveId, payload: UploadPayload) -> Result<ProcessedFile, String>;
}

/// Refuses or admits an upload based on current process memory pressure.
#[async_trait]
pub trait MemoryMonitor: Send + Sync {
    /// `Err(reason)` refuses admission; `Ok(())` admits it.
    async fn admit(&self, payload_size: u64) -> Result<(), String>;
}

/// A user's storage quota as of the moment of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Bytes already used.
    pub used_bytes: u64,
    /// Total bytes allotted.
    pub quota_bytes: u64,
}

/// Resolves a user's current storage usage and quota.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Look up the user's current quota status.
    async fn status(&self, user_id: pagespace_core::UserId) -> Result<QuotaStatus, String>;

    /// Record that `additional_bytes` were newly written for this user
    /// (spec.md §4.10 step 9). A no-op for deduplicated content whose
    /// bytes were already accounted for.
    async fn record_usage(&self, user_id: pagespace_core::UserId, additional_bytes: u64) -> Result<(), String>;
}
