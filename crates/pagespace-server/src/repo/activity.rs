//! Activity log reads backing `GET /api/activities` (spec.md §6).

use chrono::{DateTime, Utc};
use pagespace_core::{DriveId, PageId, UserId};

/// One row of the activity feed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityEntry {
    /// Acting user.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Drive the event occurred in, if any.
    #[serde(rename = "driveId")]
    pub drive_id: Option<DriveId>,
    /// Page the event concerns, if any.
    #[serde(rename = "pageId")]
    pub page_id: Option<PageId>,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Whether this event has been archived.
    #[serde(rename = "isArchived")]
    pub is_archived: bool,
}

/// The scope a `GET /api/activities` request is asking about.
#[derive(Debug, Clone, Copy)]
pub enum ActivityContext {
    /// All activity visible to the requesting user.
    User(UserId),
    /// Activity scoped to one drive.
    Drive(DriveId),
    /// Activity scoped to one page.
    Page(PageId),
}

/// Paginated activity-log reads.
#[derive(Debug, Clone)]
pub struct PgActivityRepository {
    pool: sqlx::PgPool,
}

impl PgActivityRepository {
    /// Construct a repository over `pool`.
    #[must_use]
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one page of activity entries plus the total matching count.
    ///
    /// # Errors
    /// Propagates the underlying `sqlx` error.
    pub async fn list(
        &self,
        context: ActivityContext,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ActivityEntry>, i64), sqlx::Error> {
        #[derive(sqlx::FromRow)]
        struct Row {
            user_id: uuid::Uuid,
            drive_id: Option<uuid::Uuid>,
            page_id: Option<uuid::Uuid>,
            timestamp: DateTime<Utc>,
            is_archived: bool,
        }

        let (rows, total) = match context {
            ActivityContext::User(user_id) => {
                let rows = sqlx::query_as::<_, Row>(
                    "SELECT user_id, drive_id, page_id, timestamp, is_archived FROM activity_logs \
                     WHERE user_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3",
                )
                .bind(user_id.0)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: (i64,) = sqlx::query_as("SELECT count(*) FROM activity_logs WHERE user_id = $1")
                    .bind(user_id.0)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total.0)
            }
            ActivityContext::Drive(drive_id) => {
                let rows = sqlx::query_as::<_, Row>(
                    "SELECT user_id, drive_id, page_id, timestamp, is_archived FROM activity_logs \
                     WHERE drive_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3",
                )
                .bind(drive_id.0)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: (i64,) = sqlx::query_as("SELECT count(*) FROM activity_logs WHERE drive_id = $1")
                    .bind(drive_id.0)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total.0)
            }
            ActivityContext::Page(page_id) => {
                let rows = sqlx::query_as::<_, Row>(
                    "SELECT user_id, drive_id, page_id, timestamp, is_archived FROM activity_logs \
                     WHERE page_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3",
                )
                .bind(page_id.0)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
                let total: (i64,) = sqlx::query_as("SELECT count(*) FROM activity_logs WHERE page_id = $1")
                    .bind(page_id.0)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total.0)
            }
        };

        let entries = rows
            .into_iter()
            .map(|r| ActivityEntry {
                user_id: UserId(r.user_id),
                drive_id: r.drive_id.map(DriveId),
                page_id: r.page_id.map(PageId),
                timestamp: r.timestamp,
                is_archived: r.is_archived,
            })
            .collect();

        Ok((entries, total))
    }
}
