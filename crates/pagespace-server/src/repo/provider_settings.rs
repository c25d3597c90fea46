//! Per-user provider key/base-URL storage backing C4's
//! `ProviderSettingsStore` (spec.md §4.4).

use async_trait::async_trait;
use pagespace_ai::provider_factory::{Provider, ProviderSettingsStore};
use pagespace_core::UserId;
use secrecy::{ExposeSecret, SecretString};

fn provider_slug(provider: Provider) -> &'static str {
    match provider {
        Provider::Pagespace => "pagespace",
        Provider::OpenRouter | Provider::OpenRouterFree => "openrouter",
        Provider::Google => "google",
        Provider::OpenAi => "openai",
        Provider::Anthropic => "anthropic",
        Provider::Xai => "xai",
        Provider::Ollama => "ollama",
        Provider::LmStudio => "lmstudio",
        Provider::Glm => "glm",
        Provider::MiniMax => "minimax",
    }
}

/// `sqlx`-backed per-user provider settings.
#[derive(Debug, Clone)]
pub struct PgProviderSettingsStore {
    pool: sqlx::PgPool,
}

impl PgProviderSettingsStore {
    /// Construct a store over `pool`.
    #[must_use]
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProviderSettingsStore for PgProviderSettingsStore {
    async fn api_key(&self, user_id: UserId, provider: Provider) -> Option<SecretString> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT api_key FROM user_provider_settings WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id.0)
        .bind(provider_slug(provider))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to read provider api key");
            None
        });
        row.map(|(key,)| SecretString::new(key.into()))
    }

    async fn base_url(&self, user_id: UserId, provider: Provider) -> Option<String> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT base_url FROM user_provider_settings WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id.0)
        .bind(provider_slug(provider))
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to read provider base url");
            None
        });
        row.map(|(url,)| url)
    }

    async fn persist_api_key(&self, user_id: UserId, provider: Provider, key: &SecretString) {
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO user_provider_settings (user_id, provider, api_key)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, provider) DO UPDATE SET api_key = excluded.api_key
            "#,
        )
        .bind(user_id.0)
        .bind(provider_slug(provider))
        .bind(key.expose_secret())
        .execute(&self.pool)
        .await
        {
            tracing::error!(error = %e, "failed to persist provider api key");
        }
    }
}
