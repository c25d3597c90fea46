//! The application's shared state, constructed once at startup and cloned
//! (cheaply, behind `Arc`s) into every request.

use std::sync::Arc;

use pagespace_ai::driver::ChatDriver;
use pagespace_ai::provider_factory::{PlatformDefaults, ProviderSettingsStore};
use pagespace_auth::{Authenticator, CsrfGuard};
use pagespace_cache::{AgentCache, TreeCache};
use pagespace_core::AppConfig;
use pagespace_stream::AbortRegistry;
use pagespace_upload::{ActiveUploadCounter, MemoryMonitor, PageWriter, ProcessorClient, QuotaService, UploadSemaphores};

use crate::repo::{PgActivityRepository, PgPageRepository};

/// Everything a request handler needs, grouped by concern.
#[derive(Clone)]
pub struct AppState {
    /// Resolved startup configuration.
    pub config: Arc<AppConfig>,
    /// C1.
    pub authenticator: Arc<Authenticator>,
    /// C2's CSRF half (origin checking is stateless and needs no struct).
    pub csrf: Arc<CsrfGuard>,
    /// C10.
    pub abort_registry: Arc<AbortRegistry>,
    /// C13 page tree cache.
    pub tree_cache: Arc<TreeCache>,
    /// C13 agent awareness cache.
    pub agent_cache: Arc<AgentCache>,
    /// Per-tier upload concurrency (C12 step 4).
    pub upload_semaphores: Arc<UploadSemaphores>,
    /// Per-user active-upload counter (C12 step 6/9).
    pub active_uploads: Arc<ActiveUploadCounter>,
    /// C12's injected collaborators.
    pub memory_monitor: Arc<dyn MemoryMonitor>,
    /// C12's injected collaborators.
    pub quota_service: Arc<dyn QuotaService>,
    /// C12's injected collaborators.
    pub processor: Arc<dyn ProcessorClient>,
    /// The `sqlx`-backed repository serving `PageDriveResolver` and
    /// `PageWriter`.
    pub pages: Arc<PgPageRepository>,
    /// Raw pool, kept alongside `pages` so route handlers can construct a
    /// conversation-scoped `PgMessageSink` per chat turn (C11's
    /// `MessageSink` has no slot for a page/drive id, so it cannot be a
    /// single shared instance).
    pub db_pool: sqlx::PgPool,
    /// C3's page-drive resolver, implemented by [`PgPageRepository`].
    pub page_drive_resolver: Arc<dyn pagespace_auth::scope::PageDriveResolver>,
    /// C12's page-write boundary, implemented by [`PgPageRepository`].
    pub page_writer: Arc<dyn PageWriter>,
    /// C4/C11's provider connection, one concrete driver dispatching by
    /// `ResolvedProvider::provider`.
    pub chat_driver: Arc<dyn ChatDriver>,
    /// C4's per-user key/base-URL store.
    pub provider_settings: Arc<dyn ProviderSettingsStore>,
    /// C4's platform-wide default keys.
    pub platform_defaults: Arc<PlatformDefaults>,
    /// Activity feed reads backing `GET /api/activities`.
    pub activity_repository: Arc<PgActivityRepository>,
}
