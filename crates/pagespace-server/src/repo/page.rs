//! Page repository: resolves a page's owning drive (C3), writes new
//! `FILE` pages (C12), and resolves sibling positions for upload
//! placement.

use async_trait::async_trait;
use pagespace_auth::scope::PageDriveResolver;
use pagespace_auth::ScopeError;
use pagespace_core::{DriveId, PageId};
use pagespace_upload::{NewFilePage, PageWriter, PositionContext, ProcessingStatus, SiblingPosition};

/// `sqlx`-backed implementation of the page-drive and page-write
/// boundaries consumed by `pagespace-auth` and `pagespace-upload`.
#[derive(Debug, Clone)]
pub struct PgPageRepository {
    pool: sqlx::PgPool,
}

impl PgPageRepository {
    /// Construct a repository over `pool`.
    #[must_use]
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageDriveResolver for PgPageRepository {
    async fn drive_for_page(&self, page_id: PageId) -> Result<Option<DriveId>, ScopeError> {
        let row: Option<(uuid::Uuid,)> = sqlx::query_as("SELECT drive_id FROM pages WHERE id = $1")
            .bind(page_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "page-drive lookup failed");
                ScopeError::PageNotFound
            })?;
        Ok(row.map(|(drive_id,)| DriveId(drive_id)))
    }
}

fn processing_status_str(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Completed => "completed",
        ProcessingStatus::Visual => "visual",
        ProcessingStatus::Pending => "pending",
        ProcessingStatus::Failed => "failed",
    }
}

#[async_trait]
impl PageWriter for PgPageRepository {
    async fn siblings_for_position(
        &self,
        drive_id: DriveId,
        parent_id: Option<PageId>,
        after_node_id: Option<PageId>,
    ) -> Result<PositionContext, String> {
        let rows: Vec<(uuid::Uuid, f64)> = sqlx::query_as(
            r#"
            SELECT id, position FROM pages
            WHERE drive_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND is_trashed = false
            ORDER BY position ASC
            "#,
        )
        .bind(drive_id.0)
        .bind(parent_id.map(|p| p.0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.to_string())?;

        let last = rows.last().map(|(_, position)| SiblingPosition { position: *position });

        let Some(target_id) = after_node_id else {
            return Ok(PositionContext { target: None, neighbor: None, last });
        };

        let Some(target_index) = rows.iter().position(|(id, _)| *id == target_id.0) else {
            return Ok(PositionContext { target: None, neighbor: None, last });
        };

        let target = SiblingPosition { position: rows[target_index].1 };
        let previous = target_index.checked_sub(1).map(|i| SiblingPosition { position: rows[i].1 });
        let next = rows.get(target_index + 1).map(|(_, position)| SiblingPosition { position: *position });

        Ok(PositionContext { target: Some(target), neighbor: previous.or(next), last })
    }

    async fn insert_file_page(&self, page: NewFilePage) -> Result<PageId, String> {
        let new_id = PageId::new();
        sqlx::query(
            r#"
            INSERT INTO pages (
                id, drive_id, parent_id, title, type, position, is_trashed,
                visible_to_global_assistant, file_size, mime_type,
                original_file_name, file_path, processing_status
            ) VALUES ($1, $2, $3, $4, 'FILE', $5, false, true, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(new_id.0)
        .bind(page.drive_id.0)
        .bind(page.parent_id.map(|p| p.0))
        .bind(&page.title)
        .bind(page.position)
        .bind(page.file_size as i64)
        .bind(&page.mime_type)
        .bind(&page.original_file_name)
        .bind(&page.file_path)
        .bind(processing_status_str(page.processing_status))
        .execute(&self.pool)
        .await
        .map_err(|e| e.to_string())?;
        Ok(new_id)
    }
}
