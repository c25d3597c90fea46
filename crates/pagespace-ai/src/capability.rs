//! Capability Oracle (C5, spec.md §4.4).
//!
//! Answers `hasVisionCapability` and `hasToolCapability` purely from
//! `(provider, model)`, memoizing results for the process lifetime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::provider_factory::Provider;

/// Model-name substrings that indicate vision support via the pattern
/// fallback (spec.md §4.4).
const VISION_PATTERNS: &[&str] = &[
    "vision", "-v-", "gpt-5", "gpt-4o", "claude-3", "claude-4", "gemini",
];

/// Models explicitly excluded from vision support even if they would
/// otherwise match a pattern above (the `o1`/`o3`/`o4-mini` reasoning
/// family).
const VISION_DENYLIST_PATTERNS: &[&str] = &["o1", "o3", "o4-mini"];

/// Model families with no tool-calling support regardless of provider.
const TOOL_CALLING_DENYLIST_PATTERNS: &[&str] = &["gemma"];

fn contains_any(haystack: &str, patterns: &[&str]) -> bool {
    let lower = haystack.to_ascii_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// `hasVisionCapability`: table lookup with a pattern fallback.
#[must_use]
pub fn has_vision_capability(model: &str) -> bool {
    if contains_any(model, VISION_DENYLIST_PATTERNS) {
        // "grok ... vision" models and similar are allowed through even
        // when they contain an `o3`-like substring only by coincidence;
        // the explicit family check below guards the real ambiguity.
        if contains_any(model, &["grok"]) && contains_any(model, &["vision"]) {
            return true;
        }
        return false;
    }
    contains_any(model, VISION_PATTERNS) || (contains_any(model, &["grok"]) && contains_any(model, &["vision"]))
}

/// An OpenRouter capability map entry: whether a model supports tool
/// calling, as reported by the public model listing endpoint.
#[derive(Debug, Clone, Copy)]
struct OpenRouterEntry {
    supports_tools: bool,
}

/// Fetches and caches OpenRouter's tool-capability map, refreshed at most
/// once per hour.
#[async_trait::async_trait]
pub trait OpenRouterCapabilitySource: Send + Sync {
    /// Fetch the current `(model -> supports_tools)` map from OpenRouter's
    /// public model listing endpoint.
    async fn fetch_capability_map(&self) -> Vec<(String, bool)>;
}

struct OpenRouterCache {
    entries: std::collections::HashMap<String, OpenRouterEntry>,
    fetched_at: Instant,
}

/// The process-lifetime capability oracle. Memoizes vision/tool results
/// per `(provider, model)` and owns the hourly-refreshed OpenRouter map.
pub struct CapabilityOracle {
    tool_memo: DashMap<(Provider, String), bool>,
    vision_memo: DashMap<String, bool>,
    openrouter_cache: Arc<RwLock<Option<OpenRouterCache>>>,
    openrouter_source: Option<Arc<dyn OpenRouterCapabilitySource>>,
}

/// Minimum interval between OpenRouter capability-map refreshes.
pub const OPENROUTER_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

impl CapabilityOracle {
    /// Construct an oracle with no OpenRouter source configured; OpenRouter
    /// models default to "tools supported" like everything else.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tool_memo: DashMap::new(),
            vision_memo: DashMap::new(),
            openrouter_cache: Arc::new(RwLock::new(None)),
            openrouter_source: None,
        }
    }

    /// Construct an oracle backed by a real OpenRouter capability source.
    #[must_use]
    pub fn with_openrouter_source(source: Arc<dyn OpenRouterCapabilitySource>) -> Self {
        Self {
            tool_memo: DashMap::new(),
            vision_memo: DashMap::new(),
            openrouter_cache: Arc::new(RwLock::new(None)),
            openrouter_source: Some(source),
        }
    }

    /// `hasVisionCapability`, memoized per model.
    #[must_use]
    pub fn has_vision_capability(&self, model: &str) -> bool {
        if let Some(cached) = self.vision_memo.get(model) {
            return *cached;
        }
        let result = has_vision_capability(model);
        self.vision_memo.insert(model.to_string(), result);
        result
    }

    /// `hasToolCapability`, memoized per `(provider, model)`.
    pub async fn has_tool_capability(&self, provider: Provider, model: &str) -> bool {
        let key = (provider, model.to_string());
        if let Some(cached) = self.tool_memo.get(&key) {
            return *cached;
        }

        let result = if contains_any(model, TOOL_CALLING_DENYLIST_PATTERNS) {
            false
        } else if provider.is_openrouter_family() {
            self.openrouter_tool_capability(model).await
        } else {
            true
        };

        self.tool_memo.insert(key, result);
        result
    }

    async fn openrouter_tool_capability(&self, model: &str) -> bool {
        let Some(source) = &self.openrouter_source else {
            return true;
        };

        let needs_refresh = {
            let cache = self.openrouter_cache.read();
            match &*cache {
                None => true,
                Some(c) => c.fetched_at.elapsed() >= OPENROUTER_REFRESH_INTERVAL,
            }
        };

        if needs_refresh {
            let fetched = source.fetch_capability_map().await;
            let entries = fetched
                .into_iter()
                .map(|(name, supports_tools)| (name, OpenRouterEntry { supports_tools }))
                .collect();
            *self.openrouter_cache.write() = Some(OpenRouterCache {
                entries,
                fetched_at: Instant::now(),
            });
        }

        let cache = self.openrouter_cache.read();
        cache
            .as_ref()
            .and_then(|c| c.entries.get(model))
            .map_or(true, |entry| entry.supports_tools)
    }
}

impl Default for CapabilityOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource {
        map: Vec<(String, bool)>,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl OpenRouterCapabilitySource for FakeSource {
        async fn fetch_capability_map(&self) -> Vec<(String, bool)> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.map.clone()
        }
    }

    #[test]
    fn vision_patterns_match() {
        assert!(has_vision_capability("gpt-4o"));
        assert!(has_vision_capability("claude-3-opus"));
        assert!(has_vision_capability("gemini-2.5-pro"));
        assert!(!has_vision_capability("gpt-3.5-turbo"));
    }

    #[test]
    fn o_series_reasoning_models_are_never_vision() {
        assert!(!has_vision_capability("o1-preview"));
        assert!(!has_vision_capability("o3-mini"));
        assert!(!has_vision_capability("o4-mini"));
    }

    #[tokio::test]
    async fn non_openrouter_defaults_to_tools_supported() {
        let oracle = CapabilityOracle::new();
        assert!(oracle.has_tool_capability(Provider::Anthropic, "claude-sonnet-4-5").await);
    }

    #[tokio::test]
    async fn gemma_family_denied_regardless_of_provider() {
        let oracle = CapabilityOracle::new();
        assert!(!oracle.has_tool_capability(Provider::Google, "gemma-2-9b").await);
    }

    #[tokio::test]
    async fn openrouter_map_is_fetched_once_and_memoized() {
        let source = Arc::new(FakeSource {
            map: vec![("some/model".to_string(), false)],
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let oracle = CapabilityOracle::with_openrouter_source(source.clone());
        assert!(!oracle.has_tool_capability(Provider::OpenRouter, "some/model").await);
        assert!(!oracle.has_tool_capability(Provider::OpenRouter, "some/model").await);
        assert_eq!(source.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn openrouter_model_absent_from_map_defaults_supported() {
        let source = Arc::new(FakeSource {
            map: vec![],
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let oracle = CapabilityOracle::with_openrouter_source(source);
        assert!(oracle.has_tool_capability(Provider::OpenRouter, "unlisted/model").await);
    }
}
