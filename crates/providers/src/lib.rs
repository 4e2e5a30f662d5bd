//! LLM Provider implementations for DocForge.
//!
//! All providers implement the `docforge_core::Provider` trait.
//! The router maps a request's `ModelProvider` to a provider and model.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};

/// Build a reqwest client with the given timeout, falling back to the
/// default client if the builder fails.
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}
