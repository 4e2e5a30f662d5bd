//! Tool trait: the abstraction over research capabilities.
//!
//! Tools are what give the research loop access to the outside world:
//! web search, wiki lookup, and saving artifacts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::document::SnippetSource;
use crate::error::ToolError;

/// One item returned by a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolHit {
    /// Retrieved (or written) text
    pub text: String,

    /// URL or identifier for traceability
    pub reference: String,
}

impl ToolHit {
    pub fn new(text: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference: reference.into(),
        }
    }
}

/// The core Tool trait.
///
/// Each tool is stateless between invocations and safe to share across
/// concurrently running jobs.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search", "wiki_lookup").
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// The snippet source this tool feeds, or `None` for tools that are
    /// not queried during research.
    fn source(&self) -> Option<SnippetSource>;

    /// Invoke the tool. Hits come back in the tool's own order.
    async fn invoke(&self, query: &str) -> std::result::Result<Vec<ToolHit>, ToolError>;
}

/// A registry of available tools.
///
/// Registration order is preserved; the research loop queries tools in
/// that order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name
    /// in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Tools that produce research snippets, in registration order.
    pub fn research_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .filter(|t| t.source().is_some())
            .cloned()
            .collect()
    }

    /// Invoke a tool by name.
    pub async fn invoke(&self, name: &str, query: &str) -> std::result::Result<Vec<ToolHit>, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(query).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
