//! Wikipedia lookup via the MediaWiki API.
//!
//! Two calls: `list=search` for the top title, then
//! `prop=extracts&exintro&explaintext` for its plain-text intro.

use async_trait::async_trait;
use docforge_core::SnippetSource;
use docforge_core::error::ToolError;
use docforge_core::tool::{Tool, ToolHit};
use tracing::debug;

const NAME: &str = "wiki_lookup";
const ARTICLE_BASE: &str = "https://en.wikipedia.org/wiki/";

pub struct WikiLookupTool {
    client: reqwest::Client,
    api_url: String,
}

impl WikiLookupTool {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: crate::http_client(30),
            api_url: api_url.into(),
        }
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<serde_json::Value, ToolError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .send()
            .await
            .map_err(|e| crate::request_error(NAME, e))?;

        if !response.status().is_success() {
            return Err(ToolError::Unavailable {
                tool_name: NAME.into(),
                reason: format!("wiki API returned {}", response.status()),
            });
        }

        response.json().await.map_err(|e| crate::request_error(NAME, e))
    }

    async fn find_title(&self, query: &str) -> Result<Option<String>, ToolError> {
        let data = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .await?;

        Ok(data["query"]["search"]
            .as_array()
            .and_then(|results| results.first())
            .and_then(|r| r["title"].as_str())
            .map(String::from))
    }

    async fn intro(&self, title: &str) -> Result<Option<String>, ToolError> {
        let data = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;

        // Pages are keyed by page id; there is at most one.
        Ok(data["query"]["pages"]
            .as_object()
            .and_then(|pages| pages.values().next())
            .and_then(|page| page["extract"].as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from))
    }
}

/// Public article URL for a title.
pub fn article_url(title: &str) -> String {
    format!("{ARTICLE_BASE}{}", title.replace(' ', "_"))
}

#[async_trait]
impl Tool for WikiLookupTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up a topic on Wikipedia and return the article introduction."
    }

    fn source(&self) -> Option<SnippetSource> {
        Some(SnippetSource::Wiki)
    }

    async fn invoke(&self, query: &str) -> Result<Vec<ToolHit>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("empty wiki query".into()));
        }

        let Some(title) = self.find_title(query).await? else {
            debug!(tool = NAME, query, "No article found");
            return Ok(Vec::new());
        };

        Ok(self
            .intro(&title)
            .await?
            .map(|extract| vec![ToolHit::new(extract, article_url(&title))])
            .unwrap_or_default())
    }
}
