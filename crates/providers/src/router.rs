//! Provider router: maps a request's `ModelProvider` to a backend and model.

use std::collections::HashMap;
use std::sync::Arc;
use docforge_core::ModelProvider;
use docforge_core::provider::Provider;
use crate::anthropic::AnthropicProvider;
use crate::openai_compat::{OPENAI_BASE_URL, OpenAiCompatProvider};

struct Route {
    provider: Arc<dyn Provider>,
    model: String,
}

/// Routes drafting requests to the selected provider.
pub struct ProviderRouter {
    routes: HashMap<ModelProvider, Route>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register a provider and the model it should be asked for.
    pub fn register(
        &mut self,
        selector: ModelProvider,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) {
        self.routes.insert(
            selector,
            Route {
                provider,
                model: model.into(),
            },
        );
    }

    /// Resolve a selector to its provider and model name.
    pub fn resolve(&self, selector: ModelProvider) -> Option<(Arc<dyn Provider>, String)> {
        self.routes
            .get(&selector)
            .map(|r| (r.provider.clone(), r.model.clone()))
    }

    /// List registered selectors.
    pub fn list(&self) -> Vec<ModelProvider> {
        let mut names: Vec<ModelProvider> = self.routes.keys().copied().collect();
        names.sort_by_key(|p| p.as_str());
        names
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build both providers from configuration.
///
/// Providers without a key are still registered; they fail with
/// `NotConfigured` when asked to complete.
pub fn build_from_config(config: &docforge_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();

    let openai = &config.providers.openai;
    let base_url = openai.api_url.as_deref().unwrap_or(OPENAI_BASE_URL);
    router.register(
        ModelProvider::OpenAi,
        Arc::new(OpenAiCompatProvider::new(
            "openai",
            base_url,
            openai.api_key.clone().unwrap_or_default(),
        )),
        &openai.model,
    );

    let anthropic = &config.providers.anthropic;
    let mut provider = AnthropicProvider::new(anthropic.api_key.clone().unwrap_or_default());
    if let Some(url) = &anthropic.api_url {
        provider = provider.with_base_url(url);
    }
    router.register(ModelProvider::Anthropic, Arc::new(provider), &anthropic.model);

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_register_and_resolve() {
        let mut router = ProviderRouter::new();
        router.register(
            ModelProvider::OpenAi,
            Arc::new(OpenAiCompatProvider::openai("sk-test")),
            "gpt-4o",
        );

        let (provider, model) = router.resolve(ModelProvider::OpenAi).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(model, "gpt-4o");
        assert!(router.resolve(ModelProvider::Anthropic).is_none());
    }

    #[test]
    fn build_from_default_config() {
        let config = docforge_config::AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.list(), vec![ModelProvider::Anthropic, ModelProvider::OpenAi]);

        let (provider, model) = router.resolve(ModelProvider::Anthropic).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn configured_model_is_used() {
        let mut config = docforge_config::AppConfig::default();
        config.providers.openai.model = "gpt-4o-mini".into();
        let router = build_from_config(&config);
        let (_, model) = router.resolve(ModelProvider::OpenAi).unwrap();
        assert_eq!(model, "gpt-4o-mini");
    }
}
