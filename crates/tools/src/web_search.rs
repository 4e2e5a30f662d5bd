//! Web search tool: POSTs the query to a search API.
//!
//! Request: `{"query": ..., "limit": n}` with a bearer key.
//! Response: `{"items": [{"title", "snippet", "link"}]}`.

use async_trait::async_trait;
use docforge_core::SnippetSource;
use docforge_core::error::ToolError;
use docforge_core::tool::{Tool, ToolHit};
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "web_search";

pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    limit: usize,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, limit: usize) -> Self {
        Self {
            client: crate::http_client(30),
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            limit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

impl SearchItem {
    fn into_hit(self) -> Option<ToolHit> {
        let snippet = self.snippet.trim();
        if snippet.is_empty() {
            return None;
        }
        let title = self.title.trim();
        let text = if title.is_empty() {
            snippet.to_string()
        } else {
            format!("{title}: {snippet}")
        };
        Some(ToolHit::new(text, self.link))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns titled snippets with their URLs."
    }

    fn source(&self) -> Option<SnippetSource> {
        Some(SnippetSource::Search)
    }

    async fn invoke(&self, query: &str) -> Result<Vec<ToolHit>, ToolError> {
        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("empty search query".into()));
        }

        let Some(api_key) = &self.api_key else {
            return Err(ToolError::Unavailable {
                tool_name: NAME.into(),
                reason: "no search API key configured (set SEARCH_API_KEY)".into(),
            });
        };

        debug!(tool = NAME, query, "Searching");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "query": query, "limit": self.limit }))
            .send()
            .await
            .map_err(|e| crate::request_error(NAME, e))?;

        if !response.status().is_success() {
            return Err(ToolError::Unavailable {
                tool_name: NAME.into(),
                reason: format!("search API returned {}", response.status()),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| crate::request_error(NAME, e))?;

        Ok(body
            .items
            .into_iter()
            .filter_map(SearchItem::into_hit)
            .take(self.limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn no_key_is_unavailable() {
        let tool = WebSearchTool::new("http://localhost:1/search", Some("  ".into()), 5);
        let err = tool.invoke("solar power").await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn empty_query_rejected() {
        let tool = WebSearchTool::new("http://localhost:1/search", Some("k".into()), 5);
        let err = tool.invoke("   ").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn maps_items_to_hits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_header("authorization", "Bearer search-key")
            .match_body(Matcher::Json(serde_json::json!({"query": "solar power", "limit": 5})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [
                    {"title": "Solar", "snippet": "Photovoltaics convert light.", "link": "https://a.example/solar"},
                    {"title": "Empty", "snippet": "  ", "link": "https://a.example/empty"},
                    {"snippet": "Untitled fact.", "link": "https://a.example/b"}
                ]}"#,
            )
            .create_async()
            .await;

        let tool = WebSearchTool::new(format!("{}/search", server.url()), Some("search-key".into()), 5);
        let hits = tool.invoke("solar power").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            hits,
            vec![
                ToolHit::new("Solar: Photovoltaics convert light.", "https://a.example/solar"),
                ToolHit::new("Untitled fact.", "https://a.example/b"),
            ]
        );
    }

    #[tokio::test]
    async fn http_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/search").with_status(429).create_async().await;

        let tool = WebSearchTool::new(format!("{}/search", server.url()), Some("k".into()), 5);
        let err = tool.invoke("anything").await.unwrap_err();
        match err {
            ToolError::Unavailable { tool_name, reason } => {
                assert_eq!(tool_name, "web_search");
                assert!(reason.contains("429"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_items_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/search")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let tool = WebSearchTool::new(format!("{}/search", server.url()), Some("k".into()), 5);
        assert!(tool.invoke("nothing").await.unwrap().is_empty());
    }
}
