//! Persists chat turns (C11's `MessageSink`), scoped to one conversation
//! page. Constructed fresh per request rather than shared, since each
//! chat turn binds to a specific `pageId`/`driveId`.

use async_trait::async_trait;
use pagespace_core::{DriveId, PageId, UserId};
use pagespace_stream::{Envelope, MessageSink};

/// Persists a chat turn's user and assistant messages to the
/// `chat_messages` table.
#[derive(Clone)]
pub struct PgMessageSink {
    pool: sqlx::PgPool,
    page_id: PageId,
    drive_id: DriveId,
}

impl PgMessageSink {
    /// Construct a sink bound to one conversation.
    #[must_use]
    pub fn new(pool: sqlx::PgPool, page_id: PageId, drive_id: DriveId) -> Self {
        Self { pool, page_id, drive_id }
    }

    async fn insert(&self, user_id: UserId, role: &str, envelope: &Envelope) {
        let content = match serde_json::to_value(envelope) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize message envelope");
                return;
            }
        };
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO chat_messages (id, page_id, drive_id, user_id, role, content, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, true, now())
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(self.page_id.0)
        .bind(self.drive_id.0)
        .bind(user_id.0)
        .bind(role)
        .bind(content)
        .execute(&self.pool)
        .await
        {
            tracing::error!(error = %e, role, "failed to persist chat message");
        }
    }
}

#[async_trait]
impl MessageSink for PgMessageSink {
    async fn persist_user_message(&self, user_id: UserId, envelope: &Envelope) {
        self.insert(user_id, "user", envelope).await;
    }

    async fn persist_assistant_message(&self, user_id: UserId, envelope: &Envelope) {
        self.insert(user_id, "assistant", envelope).await;
    }
}
