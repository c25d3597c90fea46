//! Gateway binary entry point: load configuration, wire every component's
//! concrete collaborator into [`AppState`], and serve the axum router.

use std::sync::Arc;

use pagespace_ai::provider_factory::{PlatformDefaults, ProviderSettingsStore};
use pagespace_auth::authenticator::Authenticator;
use pagespace_auth::mcp_token::PgMcpTokenStore;
use pagespace_auth::origin_csrf::CsrfGuard;
use pagespace_auth::session::PgSessionStore;
use pagespace_cache::{AgentCache, TreeCache};
use pagespace_core::AppConfig;
use pagespace_server::chat_driver::{HttpChatDriver, LocalBaseUrls};
use pagespace_server::repo::processor::{mint_service_token, HttpProcessorClient};
use pagespace_server::repo::{PgActivityRepository, PgPageRepository, PgProviderSettingsStore, PgQuotaService, ThresholdMemoryMonitor};
use pagespace_server::state::AppState;
use pagespace_server::router;
use pagespace_stream::AbortRegistry;
use pagespace_upload::{ActiveUploadCounter, MemoryMonitor, ProcessorClient, QuotaService, UploadSemaphores};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Derive the 32-byte BLAKE3 key `pagespace-auth` hashes bearer tokens
/// with from the configured secret.
fn token_hash_key(secret: &str) -> [u8; 32] {
    *blake3::hash(secret.as_bytes()).as_bytes()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagespace_server=info,tower_http=info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = AppConfig::load()?;
    tracing::info!(bind_addr = %config.server.bind_addr, "starting pagespace-server");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;

    let hash_key = token_hash_key(&config.security.token_hash_secret);
    let session_store = Arc::new(PgSessionStore::new(pool.clone(), hash_key));
    let mcp_token_store = Arc::new(PgMcpTokenStore::new(pool.clone(), hash_key));
    let authenticator = Arc::new(Authenticator::new(session_store, mcp_token_store));
    let csrf = Arc::new(CsrfGuard::new(&SecretString::new(config.security.csrf_hmac_secret.clone().into())));

    let pages = Arc::new(PgPageRepository::new(pool.clone()));
    let page_drive_resolver: Arc<dyn pagespace_auth::scope::PageDriveResolver> = pages.clone();
    let page_writer: Arc<dyn pagespace_upload::PageWriter> = pages.clone();

    let provider_settings: Arc<dyn ProviderSettingsStore> = Arc::new(PgProviderSettingsStore::new(pool.clone()));
    let platform_defaults = Arc::new(PlatformDefaults {
        default_glm_api_key: config.providers.default_glm_api_key.clone().map(|k| SecretString::new(k.into())),
        default_google_api_key: config.providers.default_google_api_key.clone().map(|k| SecretString::new(k.into())),
    });

    let quota_service: Arc<dyn QuotaService> = Arc::new(PgQuotaService::new(pool.clone()));
    let memory_monitor: Arc<dyn MemoryMonitor> = Arc::new(ThresholdMemoryMonitor::new(current_process_memory_bytes, MEMORY_ADMISSION_LIMIT_BYTES));

    let processor_secret = SecretString::new(config.upload.processor_service_secret.clone().into());
    let processor_url = config.upload.processor_url.clone();
    let processor: Arc<dyn ProcessorClient> = Arc::new(HttpProcessorClient::new(
        reqwest::Client::new(),
        processor_url,
        move |_drive_id| mint_service_token(&processor_secret),
    ));

    let chat_driver: Arc<dyn pagespace_ai::driver::ChatDriver> = Arc::new(HttpChatDriver::new(reqwest::Client::new(), LocalBaseUrls::well_known()));

    let activity_repository = Arc::new(PgActivityRepository::new(pool.clone()));

    let state = AppState {
        config: Arc::new(config),
        authenticator,
        csrf,
        abort_registry: Arc::new(AbortRegistry::new()),
        tree_cache: Arc::new(TreeCache::new()),
        agent_cache: Arc::new(AgentCache::new()),
        upload_semaphores: Arc::new(UploadSemaphores::new()),
        active_uploads: Arc::new(ActiveUploadCounter::new()),
        memory_monitor,
        quota_service,
        processor,
        pages,
        db_pool: pool,
        page_drive_resolver,
        page_writer,
        chat_driver,
        provider_settings,
        platform_defaults,
        activity_repository,
    };

    let bind_addr = state.config.server.bind_addr.clone();
    let app = router::build(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Admission ceiling for [`ThresholdMemoryMonitor`] (spec.md §4.12 step 1).
/// No process-wide memory sampler is wired up yet, so this is a generous
/// placeholder that never refuses on its own; operators running under
/// real memory pressure should replace `current_process_memory_bytes`
/// with an actual sampler before relying on this gate.
const MEMORY_ADMISSION_LIMIT_BYTES: u64 = u64::MAX;

fn current_process_memory_bytes() -> u64 {
    0
}
