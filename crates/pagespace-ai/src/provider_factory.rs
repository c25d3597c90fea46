//! Provider Factory (C4, spec.md §4.4).
//!
//! Resolves a user's effective `(provider, model)` pair and the
//! credentials/base URL needed to drive it, from the fixed provider
//! enumeration and the per-user provider-setting records.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{AiError, AiResult};

/// The fixed provider enumeration (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Platform-managed default, backed by GLM or Google.
    Pagespace,
    /// OpenRouter, full model catalog.
    OpenRouter,
    /// OpenRouter, free-tier models only. Same backend and key store as
    /// [`Provider::OpenRouter`]; the two differ only in which model names
    /// the caller may select.
    OpenRouterFree,
    /// Google Gemini.
    Google,
    /// OpenAI.
    OpenAi,
    /// Anthropic.
    Anthropic,
    /// xAI Grok.
    Xai,
    /// Local Ollama server.
    Ollama,
    /// Local LM Studio server.
    LmStudio,
    /// Zhipu GLM.
    Glm,
    /// MiniMax, via an Anthropic-compatible endpoint.
    MiniMax,
}

impl Provider {
    /// Parse the provider enumeration's wire names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "pagespace" => Self::Pagespace,
            "openrouter" => Self::OpenRouter,
            "openrouter_free" => Self::OpenRouterFree,
            "google" => Self::Google,
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "xai" => Self::Xai,
            "ollama" => Self::Ollama,
            "lmstudio" => Self::LmStudio,
            "glm" => Self::Glm,
            "minimax" => Self::MiniMax,
            _ => return None,
        })
    }

    /// `true` for providers whose key store and distinguishing behavior is
    /// shared with [`Provider::OpenRouter`].
    #[must_use]
    pub const fn is_openrouter_family(self) -> bool {
        matches!(self, Self::OpenRouter | Self::OpenRouterFree)
    }

    /// `true` for local-server providers that need a base URL but no API
    /// key.
    #[must_use]
    pub const fn is_local_server(self) -> bool {
        matches!(self, Self::Ollama | Self::LmStudio)
    }
}

/// What the caller selected explicitly on this request, before defaults
/// are applied.
#[derive(Debug, Clone, Default)]
pub struct RequestedSelection {
    /// `selectedProvider`, if the caller named one.
    pub selected_provider: Option<String>,
    /// `selectedModel`, if the caller named one.
    pub selected_model: Option<String>,
    /// A provider API key supplied directly in the request body, to be
    /// persisted before use.
    pub supplied_api_key: Option<SecretString>,
}

/// The subset of a user's persisted provider state this factory reads.
#[derive(Debug, Clone, Default)]
pub struct UserProviderDefaults {
    /// `user.currentAiProvider`.
    pub current_ai_provider: Option<String>,
    /// `user.currentAiModel`.
    pub current_ai_model: Option<String>,
}

/// Per-provider key/base-URL material resolved for a user.
#[async_trait]
pub trait ProviderSettingsStore: Send + Sync {
    /// The user's stored API key for `provider`, if any.
    async fn api_key(&self, user_id: pagespace_core::UserId, provider: Provider) -> Option<SecretString>;
    /// The user's stored base URL for a local-server provider, if any.
    async fn base_url(&self, user_id: pagespace_core::UserId, provider: Provider) -> Option<String>;
    /// Persist a request-supplied API key before use (spec.md §4.4: "If a
    /// key was supplied in the request body, persist it via the settings
    /// store before use").
    async fn persist_api_key(&self, user_id: pagespace_core::UserId, provider: Provider, key: &SecretString);
}

/// Platform-wide default keys, configured once at startup.
#[derive(Debug, Clone, Default)]
pub struct PlatformDefaults {
    /// Default GLM key backing the `pagespace` provider.
    pub default_glm_api_key: Option<SecretString>,
    /// Default Google key backing the `pagespace` provider.
    pub default_google_api_key: Option<SecretString>,
}

/// A fully resolved provider call: which provider/model to drive, and the
/// credential or base URL it needs.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    /// The resolved provider.
    pub provider: Provider,
    /// The resolved model name.
    pub model: String,
    /// The resolved credential, for providers that need one.
    pub credential: ProviderCredential,
}

/// Either an API key or a base URL, depending on the provider kind.
#[derive(Debug, Clone)]
pub enum ProviderCredential {
    /// API-key-authenticated provider.
    ApiKey(SecretString),
    /// Local server provider, reached by base URL with no key.
    BaseUrl(String),
}

fn default_model_for(provider: Provider) -> &'static str {
    match provider {
        Provider::Pagespace => "glm-4.6",
        Provider::OpenRouter | Provider::OpenRouterFree => "openrouter/auto",
        Provider::Google => "gemini-2.5-flash",
        Provider::OpenAi => "gpt-4o",
        Provider::Anthropic => "claude-sonnet-4-5",
        Provider::Xai => "grok-4",
        Provider::Ollama => "llama3.2",
        Provider::LmStudio => "local-model",
        Provider::Glm => "glm-4.6",
        Provider::MiniMax => "minimax-m2",
    }
}

/// Resolve the user's effective `(provider, model)` and credential,
/// following the resolution rules in spec.md §4.4.
///
/// # Errors
/// [`AiError::Misconfigured`] for an unknown provider name, or a missing
/// API key / base URL per the provider's requirement.
pub async fn resolve_provider(
    selection: &RequestedSelection,
    user_defaults: &UserProviderDefaults,
    settings: &dyn ProviderSettingsStore,
    platform: &PlatformDefaults,
    user_id: pagespace_core::UserId,
) -> AiResult<ResolvedProvider> {
    let provider_name = selection
        .selected_provider
        .as_deref()
        .or(user_defaults.current_ai_provider.as_deref())
        .unwrap_or("pagespace");

    let provider = Provider::parse(provider_name)
        .ok_or_else(|| AiError::Misconfigured(format!("Unknown AI provider: {provider_name}")))?;

    let model = selection
        .selected_model
        .clone()
        .or_else(|| user_defaults.current_ai_model.clone())
        .unwrap_or_else(|| default_model_for(provider).to_string());

    if let Some(supplied) = &selection.supplied_api_key {
        settings.persist_api_key(user_id, provider, supplied).await;
    }

    let credential = resolve_credential(provider, selection, settings, platform, user_id).await?;

    Ok(ResolvedProvider {
        provider,
        model,
        credential,
    })
}

async fn resolve_credential(
    provider: Provider,
    selection: &RequestedSelection,
    settings: &dyn ProviderSettingsStore,
    platform: &PlatformDefaults,
    user_id: pagespace_core::UserId,
) -> AiResult<ProviderCredential> {
    if provider.is_local_server() {
        let base_url = settings
            .base_url(user_id, provider)
            .ok_or_else(|| AiError::Misconfigured("Base URL not configured for local provider".into()))?;
        return Ok(ProviderCredential::BaseUrl(base_url));
    }

    if let Some(key) = &selection.supplied_api_key {
        return Ok(ProviderCredential::ApiKey(key.clone()));
    }

    if let Some(key) = settings.api_key(user_id, provider).await {
        return Ok(ProviderCredential::ApiKey(key));
    }

    if matches!(provider, Provider::Pagespace) {
        if let Some(key) = &platform.default_glm_api_key {
            return Ok(ProviderCredential::ApiKey(key.clone()));
        }
        if let Some(key) = &platform.default_google_api_key {
            return Ok(ProviderCredential::ApiKey(key.clone()));
        }
        if let Some(key) = settings.api_key(user_id, Provider::Google).await {
            return Ok(ProviderCredential::ApiKey(key));
        }
        return Err(AiError::Misconfigured("No default API key configured".into()));
    }

    if provider.is_openrouter_family() {
        return Err(AiError::Misconfigured("OpenRouter API key not configured".into()));
    }

    Err(AiError::Misconfigured(format!(
        "API key not configured for provider {provider:?}"
    )))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use pagespace_core::UserId;
    use secrecy::ExposeSecret;

    use super::*;

    #[derive(Default)]
    struct FakeSettingsStore {
        keys: Mutex<HashMap<(UserId, &'static str), SecretString>>,
        base_urls: Mutex<HashMap<(UserId, &'static str), String>>,
        persisted: Mutex<Vec<(UserId, &'static str)>>,
    }

    fn provider_key(p: Provider) -> &'static str {
        match p {
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

    #[async_trait]
    impl ProviderSettingsStore for FakeSettingsStore {
        async fn api_key(&self, user_id: UserId, provider: Provider) -> Option<SecretString> {
            self.keys.lock().unwrap().get(&(user_id, provider_key(provider))).cloned()
        }

        async fn base_url(&self, user_id: UserId, provider: Provider) -> Option<String> {
            self.base_urls
                .lock()
                .unwrap()
                .get(&(user_id, provider_key(provider)))
                .cloned()
        }

        async fn persist_api_key(&self, user_id: UserId, provider: Provider, key: &SecretString) {
            self.keys
                .lock()
                .unwrap()
                .insert((user_id, provider_key(provider)), key.clone());
            self.persisted.lock().unwrap().push((user_id, provider_key(provider)));
        }
    }

    #[tokio::test]
    async fn defaults_to_pagespace_with_platform_key() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults {
            default_glm_api_key: Some(SecretString::new("glm-key".into())),
            default_google_api_key: None,
        };
        let resolved = resolve_provider(
            &RequestedSelection::default(),
            &UserProviderDefaults::default(),
            &settings,
            &platform,
            UserId::new(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.provider, Provider::Pagespace);
        match resolved.credential {
            ProviderCredential::ApiKey(k) => assert_eq!(k.expose_secret(), "glm-key"),
            ProviderCredential::BaseUrl(_) => panic!("expected api key"),
        }
    }

    #[tokio::test]
    async fn pagespace_without_any_key_is_400_class_error() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults::default();
        let err = resolve_provider(
            &RequestedSelection::default(),
            &UserProviderDefaults::default(),
            &settings,
            &platform,
            UserId::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiError::Misconfigured(m) if m == "No default API key configured"));
    }

    #[tokio::test]
    async fn openrouter_without_key_has_specific_message() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults::default();
        let selection = RequestedSelection {
            selected_provider: Some("openrouter".into()),
            ..Default::default()
        };
        let err = resolve_provider(
            &selection,
            &UserProviderDefaults::default(),
            &settings,
            &platform,
            UserId::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiError::Misconfigured(m) if m == "OpenRouter API key not configured"));
    }

    #[tokio::test]
    async fn supplied_key_is_persisted_before_use() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults::default();
        let user_id = UserId::new();
        let selection = RequestedSelection {
            selected_provider: Some("openai".into()),
            supplied_api_key: Some(SecretString::new("sk-supplied".into())),
            ..Default::default()
        };
        let resolved = resolve_provider(&selection, &UserProviderDefaults::default(), &settings, &platform, user_id)
            .await
            .unwrap();
        assert!(matches!(resolved.credential, ProviderCredential::ApiKey(_)));
        assert_eq!(settings.persisted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn local_server_provider_requires_base_url() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults::default();
        let selection = RequestedSelection {
            selected_provider: Some("ollama".into()),
            ..Default::default()
        };
        let err = resolve_provider(
            &selection,
            &UserProviderDefaults::default(),
            &settings,
            &platform,
            UserId::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn unknown_provider_name_is_misconfigured() {
        let settings = FakeSettingsStore::default();
        let platform = PlatformDefaults::default();
        let selection = RequestedSelection {
            selected_provider: Some("not-a-real-provider".into()),
            ..Default::default()
        };
        let err = resolve_provider(
            &selection,
            &UserProviderDefaults::default(),
            &settings,
            &platform,
            UserId::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AiError::Misconfigured(_)));
    }
}
