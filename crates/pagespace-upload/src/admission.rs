//! Upload admission pipeline (C12, spec.md §4.10).
//!
//! Ties together memory admission, quota admission, the per-tier
//! semaphore, filename sanitization, processor dispatch, position
//! computation, and `FILE` page insertion. Every external dependency
//! (memory monitor, quota service, processor, page repository) is an
//! injected trait so this crate stays free of any concrete datastore or
//! HTTP client.

use async_trait::async_trait;
use pagespace_core::{DriveId, PageId, UserId};

use crate::counter::ActiveUploadCounter;
use crate::error::{UploadError, UploadResult};
use crate::filename::sanitize_filename;
use crate::position::{compute_position, InsertPosition, PositionContext, SiblingPosition};
use crate::processor::{MemoryMonitor, ProcessedFile, ProcessorClient, QuotaService, UploadPayload};
use crate::semaphore::{UploadSemaphores, UserTier};

/// Processing status assigned to the inserted `FILE` page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// The file was a duplicate of existing content.
    Completed,
    /// An image needing visual-preview generation.
    Visual,
    /// Queued for ordinary background processing.
    Pending,
    /// Processor dispatch failed.
    Failed,
}

/// Parameters for one upload request (spec.md §4.10 step 1).
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Authenticated uploader.
    pub user_id: UserId,
    /// Uploader's tier, for semaphore sizing.
    pub tier: UserTier,
    /// Target drive.
    pub drive_id: DriveId,
    /// Optional parent page.
    pub parent_id: Option<PageId>,
    /// Optional display title; falls back to the sanitized filename.
    pub title: Option<String>,
    /// Where to place the new sibling.
    pub position: InsertPosition,
    /// The sibling the position is relative to, if any.
    pub after_node_id: Option<PageId>,
    /// Raw filename as submitted by the client.
    pub filename: String,
    /// MIME type as reported by the client.
    pub media_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// A newly inserted `FILE` page, ready to be persisted by the caller's
/// page repository.
#[derive(Debug, Clone)]
pub struct NewFilePage {
    /// Drive the page belongs to.
    pub drive_id: DriveId,
    /// Parent page, if any.
    pub parent_id: Option<PageId>,
    /// Display title.
    pub title: String,
    /// Computed fractional sibling position.
    pub position: f64,
    /// Size in bytes as measured by the processor, or the raw payload
    /// length if the processor was never reached.
    pub file_size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Original, sanitized filename.
    pub original_file_name: String,
    /// Content hash, used as the storage path. Empty on processor failure.
    pub file_path: String,
    /// Resulting processing status.
    pub processing_status: ProcessingStatus,
}

/// Resolves sibling positions and persists the final `FILE` page.
///
/// Implemented by the server crate against its page repository. Kept
/// separate from [`ProcessorClient`] because position lookups and page
/// insertion are ordinary datastore reads/writes, not processor calls.
#[async_trait]
pub trait PageWriter: Send + Sync {
    /// Resolve the sibling positions needed to place a new page
    /// relative to `after_node_id` (or the tail, if `None`).
    async fn siblings_for_position(
        &self,
        drive_id: DriveId,
        parent_id: Option<PageId>,
        after_node_id: Option<PageId>,
    ) -> Result<PositionContext, String>;

    /// Insert the finished `FILE` page and return its id.
    async fn insert_file_page(&self, page: NewFilePage) -> Result<PageId, String>;
}

fn is_image(media_type: &str) -> bool {
    media_type.starts_with("image/")
}

/// Run the full admission pipeline for one upload.
///
/// # Errors
/// [`UploadError::MemoryRejected`], [`UploadError::QuotaExceeded`],
/// [`UploadError::NoSlotAvailable`], or [`UploadError::ProcessorFailed`]
/// per the step that refused or failed the upload.
#[allow(clippy::too_many_arguments)]
pub async fn admit_upload(
    request: UploadRequest,
    memory: &dyn MemoryMonitor,
    quota: &dyn QuotaService,
    semaphores: &UploadSemaphores,
    active_uploads: &ActiveUploadCounter,
    processor: &dyn ProcessorClient,
    pages: &dyn PageWriter,
) -> UploadResult<PageId> {
    let payload_size = request.bytes.len() as u64;

    memory.admit(payload_size).await.map_err(UploadError::MemoryRejected)?;

    let quota_status = quota.status(request.user_id).await.map_err(UploadError::MemoryRejected)?;
    if quota_status.used_bytes + payload_size > quota_status.quota_bytes {
        return Err(UploadError::QuotaExceeded {
            used_bytes: quota_status.used_bytes,
            quota_bytes: quota_status.quota_bytes,
        });
    }

    let _slot = semaphores.try_acquire(request.tier).ok_or(UploadError::NoSlotAvailable)?;

    let sanitized_filename = sanitize_filename(&request.filename);
    let _counter_guard = active_uploads.increment(request.user_id);

    let payload = UploadPayload {
        filename: sanitized_filename.clone(),
        media_type: request.media_type.clone(),
        bytes: request.bytes,
    };

    let processed = match processor.process(request.drive_id, payload).await {
        Ok(processed) => processed,
        Err(reason) => {
            let failed_page = NewFilePage {
                drive_id: request.drive_id,
                parent_id: request.parent_id,
                title: request.title.clone().unwrap_or_else(|| sanitized_filename.clone()),
                position: fallback_tail_position(&request, pages).await,
                file_size: payload_size,
                mime_type: request.media_type.clone(),
                original_file_name: sanitized_filename,
                file_path: String::new(),
                processing_status: ProcessingStatus::Failed,
            };
            let _ = pages.insert_file_page(failed_page).await;
            return Err(UploadError::ProcessorFailed(reason));
        }
    };

    let position_ctx = pages
        .siblings_for_position(request.drive_id, request.parent_id, request.after_node_id)
        .await
        .map_err(UploadError::ProcessorFailed)?;
    let computed_position = compute_position(request.position, &position_ctx);

    let processing_status = processing_status_for(&processed, &request.media_type);

    if !processed.deduplicated {
        let _ = quota.record_usage(request.user_id, processed.size).await;
    }

    let page = NewFilePage {
        drive_id: request.drive_id,
        parent_id: request.parent_id,
        title: request.title.unwrap_or_else(|| sanitized_filename.clone()),
        position: computed_position,
        file_size: processed.size,
        mime_type: request.media_type,
        original_file_name: sanitized_filename,
        file_path: processed.content_hash,
        processing_status,
    };

    pages.insert_file_page(page).await.map_err(UploadError::ProcessorFailed)
}

fn processing_status_for(processed: &ProcessedFile, media_type: &str) -> ProcessingStatus {
    if processed.deduplicated {
        ProcessingStatus::Completed
    } else if is_image(media_type) {
        ProcessingStatus::Visual
    } else {
        ProcessingStatus::Pending
    }
}

async fn fallback_tail_position(request: &UploadRequest, pages: &dyn PageWriter) -> f64 {
    match pages.siblings_for_position(request.drive_id, request.parent_id, None).await {
        Ok(ctx) => compute_position(InsertPosition::Tail, &ctx),
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    struct AlwaysAdmit;
    #[async_trait]
    impl MemoryMonitor for AlwaysAdmit {
        async fn admit(&self, _payload_size: u64) -> Result<(), String> {
            Ok(())
        }
    }

    struct AlwaysRefuse;
    #[async_trait]
    impl MemoryMonitor for AlwaysRefuse {
        async fn admit(&self, _payload_size: u64) -> Result<(), String> {
            Err("memory pressure too high".to_string())
        }
    }

    struct FixedQuota {
        used_bytes: u64,
        quota_bytes: u64,
    }
    #[async_trait]
    impl QuotaService for FixedQuota {
        async fn status(&self, _user_id: UserId) -> Result<crate::processor::QuotaStatus, String> {
            Ok(crate::processor::QuotaStatus { used_bytes: self.used_bytes, quota_bytes: self.quota_bytes })
        }

        async fn record_usage(&self, _user_id: UserId, _additional_bytes: u64) -> Result<(), String> {
            Ok(())
        }
    }

    struct EchoProcessor;
    #[async_trait]
    impl ProcessorClient for EchoProcessor {
        async fn process(&self, _drive_id: DriveId, payload: UploadPayload) -> Result<ProcessedFile, String> {
            Ok(ProcessedFile {
                content_hash: format!("hash-{}", payload.filename),
                deduplicated: false,
                size: payload.bytes.len() as u64,
                jobs: Vec::new(),
            })
        }
    }

    struct FailingProcessor;
    #[async_trait]
    impl ProcessorClient for FailingProcessor {
        async fn process(&self, _drive_id: DriveId, _payload: UploadPayload) -> Result<ProcessedFile, String> {
            Err("processor unreachable".to_string())
        }
    }

    struct InMemoryPages {
        inserted: std::sync::Mutex<Vec<NewFilePage>>,
        insert_calls: AtomicUsize,
    }

    impl InMemoryPages {
        fn new() -> Self {
            Self { inserted: std::sync::Mutex::new(Vec::new()), insert_calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl PageWriter for InMemoryPages {
        async fn siblings_for_position(
            &self,
            _drive_id: DriveId,
            _parent_id: Option<PageId>,
            _after_node_id: Option<PageId>,
        ) -> Result<PositionContext, String> {
            Ok(PositionContext { target: None, neighbor: None, last: Some(SiblingPosition { position: 3.0 }) })
        }

        async fn insert_file_page(&self, page: NewFilePage) -> Result<PageId, String> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            self.inserted.lock().unwrap().push(page);
            Ok(PageId::new())
        }
    }

    fn base_request(bytes: Vec<u8>) -> UploadRequest {
        UploadRequest {
            user_id: UserId::new(),
            tier: UserTier::Free,
            drive_id: DriveId::new(),
            parent_id: None,
            title: None,
            position: InsertPosition::Tail,
            after_node_id: None,
            filename: "report.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            bytes,
        }
    }

    #[tokio::test]
    async fn happy_path_inserts_pending_page_at_tail() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let request = base_request(vec![1, 2, 3]);
        let user_id = request.user_id;

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(active.count(user_id), 0, "counter guard must release after success");
        assert_eq!(semaphores.available(UserTier::Free), UserTier::Free.max_concurrent_uploads());

        let inserted = pages.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].processing_status, ProcessingStatus::Pending);
        assert_eq!(inserted[0].position, 4.0);
    }

    #[tokio::test]
    async fn memory_refusal_returns_error_before_touching_quota_or_counter() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let request = base_request(vec![1]);

        let result = admit_upload(
            request,
            &AlwaysRefuse,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(matches!(result, Err(UploadError::MemoryRejected(_))));
        assert_eq!(pages.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn quota_exceeded_returns_error_without_acquiring_semaphore() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let request = base_request(vec![0; 2_000]);

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 999_000, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(matches!(result, Err(UploadError::QuotaExceeded { .. })));
        assert_eq!(semaphores.available(UserTier::Free), UserTier::Free.max_concurrent_uploads());
    }

    #[tokio::test]
    async fn no_semaphore_slot_returns_429_equivalent_error() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let held: Vec<_> =
            (0..UserTier::Free.max_concurrent_uploads()).map(|_| semaphores.try_acquire(UserTier::Free).unwrap()).collect();
        let pages = InMemoryPages::new();
        let request = base_request(vec![1]);

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(matches!(result, Err(UploadError::NoSlotAvailable)));
        drop(held);
    }

    #[tokio::test]
    async fn processor_failure_inserts_failed_page_releases_slot_and_counter() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let request = base_request(vec![1, 2, 3, 4]);
        let user_id = request.user_id;

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &FailingProcessor,
            &pages,
        )
        .await;

        assert!(matches!(result, Err(UploadError::ProcessorFailed(_))));
        assert_eq!(active.count(user_id), 0, "counter guard must release even on processor failure");
        assert_eq!(semaphores.available(UserTier::Free), UserTier::Free.max_concurrent_uploads());

        let inserted = pages.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].processing_status, ProcessingStatus::Failed);
        assert_eq!(inserted[0].file_path, "");
    }

    #[tokio::test]
    async fn deduplicated_upload_is_marked_completed() {
        struct DedupProcessor;
        #[async_trait]
        impl ProcessorClient for DedupProcessor {
            async fn process(&self, _drive_id: DriveId, payload: UploadPayload) -> Result<ProcessedFile, String> {
                Ok(ProcessedFile {
                    content_hash: "existing-hash".to_string(),
                    deduplicated: true,
                    size: payload.bytes.len() as u64,
                    jobs: Vec::new(),
                })
            }
        }

        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let mut request = base_request(vec![1, 2]);
        request.media_type = "image/png".to_string();

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &DedupProcessor,
            &pages,
        )
        .await;

        assert!(result.is_ok());
        let inserted = pages.inserted.lock().unwrap();
        assert_eq!(inserted[0].processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn non_deduplicated_image_is_marked_visual() {
        let active = ActiveUploadCounter::new();
        let semaphores = UploadSemaphores::new();
        let pages = InMemoryPages::new();
        let mut request = base_request(vec![1, 2]);
        request.media_type = "image/jpeg".to_string();

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(result.is_ok());
        let inserted = pages.inserted.lock().unwrap();
        assert_eq!(inserted[0].processing_status, ProcessingStatus::Visual);
    }

    #[tokio::test]
    async fn tier_exhaustion_is_independent_per_tier() {
        let active = ActiveUploadCounter::new();
        let semaphores = Arc::new(UploadSemaphores::new());
        let _free_slots: Vec<_> =
            (0..UserTier::Free.max_concurrent_uploads()).map(|_| semaphores.try_acquire(UserTier::Free).unwrap()).collect();
        let pages = InMemoryPages::new();
        let mut request = base_request(vec![1]);
        request.tier = UserTier::Pro;

        let result = admit_upload(
            request,
            &AlwaysAdmit,
            &FixedQuota { used_bytes: 0, quota_bytes: 1_000_000 },
            &semaphores,
            &active,
            &EchoProcessor,
            &pages,
        )
        .await;

        assert!(result.is_ok());
    }
}
