//! Typed startup configuration.
//!
//! Replaces the `process.env` access sprinkled through the original
//! implementation with one struct resolved once, at process start, per the
//! DESIGN NOTES instruction in the specification this crate implements.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Origin validation strictness for [`crate::config::SecurityConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginValidationMode {
    /// Log a warning on mismatch but allow the request through.
    Warn,
    /// Reject the request with `403 ORIGIN_INVALID` on mismatch (default).
    Block,
}

impl Default for OriginValidationMode {
    fn default() -> Self {
        Self::Block
    }
}

/// Origin/CSRF and cookie configuration (backs C2).
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Canonical web app origin, e.g. `https://app.pagespace.dev`.
    pub web_app_url: Option<String>,
    /// Additional origins allowed in addition to `web_app_url`.
    #[serde(default)]
    pub additional_allowed_origins: Vec<String>,
    /// `warn` or `block` (default `block`).
    #[serde(default)]
    pub origin_validation_mode: OriginValidationMode,
    /// `Domain=` attribute for the session cookie, if any.
    pub cookie_domain: Option<String>,
    /// Shared secret required on cron-triggered maintenance endpoints.
    pub cron_secret: Option<String>,
    /// Secret key used to derive the CSRF HMAC. Never logged.
    pub csrf_hmac_secret: String,
    /// Secret the server derives its BLAKE3 token-hashing key from
    /// (`pagespace_auth::token::hash_token`). Never logged.
    pub token_hash_secret: String,
    /// Whether the process is running in production (enables `Secure` cookies).
    #[serde(default)]
    pub production: bool,
}

/// Upload and file-processor configuration (backs C12).
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the external file processor.
    pub processor_url: String,
    /// Secret the gateway signs short-lived `files:write` service tokens
    /// with when calling the processor (backs C12 step 6). Never logged.
    pub processor_service_secret: String,
    /// Local filesystem root the processor is allowed to write under.
    pub file_storage_path: String,
    /// Maximum concurrent uploads per free-tier user.
    #[serde(default = "UploadConfig::default_free_tier_limit")]
    pub free_tier_concurrent_uploads: usize,
    /// Maximum concurrent uploads per paid-tier user.
    #[serde(default = "UploadConfig::default_paid_tier_limit")]
    pub paid_tier_concurrent_uploads: usize,
}

impl UploadConfig {
    const fn default_free_tier_limit() -> usize {
        2
    }

    const fn default_paid_tier_limit() -> usize {
        10
    }
}

/// Default/fallback API keys for the `pagespace` pseudo-provider (backs C4).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderDefaultsConfig {
    /// Platform-held GLM key, if configured.
    pub default_glm_api_key: Option<String>,
    /// Platform-held Google key, if configured.
    pub default_google_api_key: Option<String>,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` connection string.
    pub url: String,
    /// Maximum pool connections.
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    const fn default_max_connections() -> u32 {
        10
    }
}

/// HTTP bind configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the axum listener to.
    #[serde(default = "ServerConfig::default_bind")]
    pub bind_addr: String,
    /// Per-request timeout applied by the timeout middleware (not the
    /// streaming endpoint, which is exempted).
    #[serde(default = "ServerConfig::default_request_timeout", with = "humantime_secs")]
    pub request_timeout: Duration,
}

impl ServerConfig {
    fn default_bind() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_request_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// The fully resolved application configuration.
///
/// Construct once at process start via [`AppConfig::load`] and share the
/// resulting value (wrapped in `Arc`) through every component.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Origin/CSRF/cookie settings.
    pub security: SecurityConfig,
    /// Upload admission settings.
    pub upload: UploadConfig,
    /// Default provider API keys.
    #[serde(default)]
    pub providers: ProviderDefaultsConfig,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// HTTP server settings.
    #[serde(default = "AppConfig::default_server")]
    pub server: ServerConfig,
}

impl AppConfig {
    fn default_server() -> ServerConfig {
        ServerConfig {
            bind_addr: ServerConfig::default_bind(),
            request_timeout: ServerConfig::default_request_timeout(),
        }
    }

    /// Load configuration from (in increasing priority) a `config/default`
    /// file if present, then environment variables prefixed `PAGESPACE__`
    /// with `__` as the nesting separator (e.g. `PAGESPACE__SECURITY__WEB_APP_URL`).
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] if a required key is missing or a value
    /// fails to deserialize into its target type.
    pub fn load() -> CoreResult<Self> {
        let raw = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("PAGESPACE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        raw.try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}
