//! MCP machine-token storage and validation (spec.md §4.1.4, §3 `MCP Token`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pagespace_core::{DriveId, UserId};
use tokio::sync::RwLock;

use crate::error::AuthResult;
use crate::principal::Role;

/// Claims a validated MCP token resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpTokenClaims {
    /// Token row id, used for `lastUsed` bookkeeping.
    pub token_id: String,
    /// Owning user.
    pub user_id: UserId,
    /// Role as of validation time.
    pub user_role: Role,
    /// Token version captured at validation time.
    pub token_version: i64,
    /// Admin role version captured at validation time.
    pub admin_role_version: i64,
    /// Non-empty only for scoped tokens, and only drives that still exist
    /// (spec.md §3: a scoped token whose every drive has been deleted must
    /// be rejected even though the user is valid — this set being empty
    /// *after* that filter is what triggers the fail-closed rejection,
    /// distinct from "empty because never scoped").
    pub allowed_drive_ids: HashSet<DriveId>,
}

/// Storage and validation for MCP machine tokens.
#[async_trait]
pub trait McpTokenStore: Send + Sync {
    /// Validate a raw `mcp_*` token value.
    ///
    /// Returns `Ok(None)` when the token is unknown, revoked, the owning
    /// user is missing, `tokenVersion` mismatches, or the token is scoped
    /// but every scoped drive has been deleted (spec.md §3 fail-closed
    /// rule). On success, updates `lastUsed` as a side effect.
    async fn validate(&self, raw_token: &str) -> AuthResult<Option<McpTokenClaims>>;
}

/// In-memory store for tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMcpTokenStore {
    tokens: Arc<RwLock<HashMap<String, (McpTokenClaims, bool /* is_scoped */)>>>,
    live_drives: Arc<RwLock<HashSet<DriveId>>>,
}

impl InMemoryMcpTokenStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token keyed by its hashed value, for test setup.
    pub async fn insert(&self, hashed_token: String, claims: McpTokenClaims) {
        let is_scoped = !claims.allowed_drive_ids.is_empty();
        self.tokens
            .write()
            .await
            .insert(hashed_token, (claims, is_scoped));
    }

    /// Register a token that is scoped but whose scope set may legitimately
    /// be empty right now (used to exercise the fail-closed path without the
    /// claims constructor implying "unscoped").
    pub async fn insert_scoped(&self, hashed_token: String, claims: McpTokenClaims) {
        self.tokens.write().await.insert(hashed_token, (claims, true));
    }

    /// Mark a drive as existing (so scope filtering keeps it).
    pub async fn add_live_drive(&self, drive_id: DriveId) {
        self.live_drives.write().await.insert(drive_id);
    }

    /// Mark a drive as deleted (removes it from every token's effective
    /// scope on the next validation).
    pub async fn remove_live_drive(&self, drive_id: DriveId) {
        self.live_drives.write().await.remove(&drive_id);
    }
}

#[async_trait]
impl McpTokenStore for InMemoryMcpTokenStore {
    async fn validate(&self, raw_token: &str) -> AuthResult<Option<McpTokenClaims>> {
        let tokens = self.tokens.read().await;
        let Some((claims, is_scoped)) = tokens.get(raw_token) else {
            return Ok(None);
        };

        if *is_scoped {
            let live = self.live_drives.read().await;
            let effective: HashSet<DriveId> = claims
                .allowed_drive_ids
                .iter()
                .filter(|d| live.contains(d))
                .copied()
                .collect();
            if effective.is_empty() {
                return Ok(None);
            }
            return Ok(Some(McpTokenClaims {
                allowed_drive_ids: effective,
                ..claims.clone()
            }));
        }

        Ok(Some(claims.clone()))
    }
}

/// A [`McpTokenStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgMcpTokenStore {
    pool: sqlx::PgPool,
    hash_key: [u8; 32],
}

impl PgMcpTokenStore {
    /// Construct a store backed by `pool`, hashing tokens with `hash_key`.
    #[must_use]
    pub fn new(pool: sqlx::PgPool, hash_key: [u8; 32]) -> Self {
        Self { pool, hash_key }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    token_id: String,
    user_id: uuid::Uuid,
    user_role: String,
    token_version: i64,
    admin_role_version: i64,
    is_scoped: bool,
}

#[async_trait]
impl McpTokenStore for PgMcpTokenStore {
    async fn validate(&self, raw_token: &str) -> AuthResult<Option<McpTokenClaims>> {
        let hashed = crate::token::hash_token(&self.hash_key, raw_token);

        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT
                t.id AS token_id,
                u.id AS user_id,
                u.role AS user_role,
                u.token_version AS token_version,
                u.admin_role_version AS admin_role_version,
                t.is_scoped AS is_scoped
            FROM mcp_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_hash = $1
              AND t.revoked_at IS NULL
              AND t.token_version = u.token_version
            "#,
        )
        .bind(&hashed)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "mcp token lookup failed");
            crate::error::AuthError::InvalidMcpToken
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let allowed_drive_ids = if row.is_scoped {
            let ids: Vec<(uuid::Uuid,)> = sqlx::query_as(
                r#"
                SELECT d.id
                FROM mcp_token_drive_scopes s
                JOIN drives d ON d.id = s.drive_id
                WHERE s.token_id = $1 AND d.is_trashed = false
                "#,
            )
            .bind(&row.token_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "mcp token scope lookup failed");
                crate::error::AuthError::InvalidMcpToken
            })?;

            let set: HashSet<DriveId> = ids.into_iter().map(|(id,)| DriveId(id)).collect();
            if set.is_empty() {
                // isScoped with no live scoped drives left: fail closed.
                return Ok(None);
            }
            set
        } else {
            HashSet::new()
        };

        // Best-effort lastUsed bump; never fails the request.
        let _ = sqlx::query("UPDATE mcp_tokens SET last_used = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(&row.token_id)
            .execute(&self.pool)
            .await;

        let role = if row.user_role == "admin" {
            Role::Admin
        } else {
            Role::User
        };

        Ok(Some(McpTokenClaims {
            token_id: row.token_id,
            user_id: UserId(row.user_id),
            user_role: role,
            token_version: row.token_version,
            admin_role_version: row.admin_role_version,
            allowed_drive_ids,
        }))
    }
}
