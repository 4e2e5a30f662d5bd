//! Built-in tool implementations for DocForge.
//!
//! Research tools give the research loop access to the outside world:
//! a web search API and Wikipedia. `save_artifact` persists drafts to a
//! scratch directory and is not queried during research.

pub mod save_artifact;
pub mod web_search;
pub mod wiki_lookup;

use docforge_config::AppConfig;
use docforge_core::error::ToolError;
use docforge_core::tool::ToolRegistry;
use std::sync::Arc;

pub use save_artifact::SaveArtifactTool;
pub use web_search::WebSearchTool;
pub use wiki_lookup::WikiLookupTool;

/// Create the default tool registry from configuration.
///
/// Order matters: the research loop queries `web_search` before
/// `wiki_lookup` in every round.
pub fn default_registry(config: &AppConfig) -> ToolRegistry {
    let research = &config.research;
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(WebSearchTool::new(
        &research.search_api_url,
        research.search_api_key.clone(),
        research.search_limit,
    )));
    registry.register(Arc::new(WikiLookupTool::new(&research.wiki_api_url)));
    registry.register(Arc::new(SaveArtifactTool::new(&config.render.scratch_dir)));
    registry
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Map a transport failure to a non-fatal tool error.
pub(crate) fn request_error(tool_name: &str, e: reqwest::Error) -> ToolError {
    ToolError::Unavailable {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    }
}
