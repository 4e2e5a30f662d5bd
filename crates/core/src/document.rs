//! Document domain types: what the caller asks for, what research finds,
//! and what drafting produces.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::GenerationError;

/// Accept `name` only if it is a bare file name: no directory part,
/// no `..`, not absolute. Output always lands in the configured
/// output directory.
pub fn check_file_name(name: &str) -> Result<(), String> {
    let path = Path::new(name);
    let plain = !name.contains(['/', '\\', '\0'])
        && !path.is_absolute()
        && path.file_name().and_then(|n| n.to_str()) == Some(name);
    if plain {
        Ok(())
    } else {
        Err(format!("output_file must be a plain file name, got {name:?}"))
    }
}

/// Which LLM backend drafts the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI chat completions (the default).
    #[default]
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!("unsupported model provider: {other} (expected openai or anthropic)")),
        }
    }
}

/// A request to generate one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRequest {
    /// Main topic of the document
    pub topic: String,

    /// Subtopic or focus area within the main topic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,

    /// Key points to cover, in order
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Which backend drafts the content
    #[serde(default)]
    pub model_provider: ModelProvider,

    /// Whether to run the research loop before drafting
    #[serde(default)]
    pub enable_research: bool,

    /// Output file name (or path) for the rendered artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

impl DocumentRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: None,
            key_points: Vec::new(),
            model_provider: ModelProvider::default(),
            enable_research: false,
            output_file: None,
        }
    }

    pub fn with_subtopic(mut self, subtopic: impl Into<String>) -> Self {
        self.subtopic = Some(subtopic.into());
        self
    }

    pub fn with_key_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_points = points.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_provider(mut self, provider: ModelProvider) -> Self {
        self.model_provider = provider;
        self
    }

    pub fn with_research(mut self, enabled: bool) -> Self {
        self.enable_research = enabled;
        self
    }

    pub fn with_output_file(mut self, file: impl Into<String>) -> Self {
        self.output_file = Some(file.into());
        self
    }

    /// Trim text fields, drop blank key points and blank subtopic, then
    /// check the topic is present.
    pub fn normalized(mut self) -> Result<Self, GenerationError> {
        self.topic = self.topic.trim().to_string();
        self.subtopic = self
            .subtopic
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.key_points = self
            .key_points
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self.output_file = self
            .output_file
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.topic.trim().is_empty() {
            return Err(GenerationError::Validation("topic is required".into()));
        }
        if let Some(name) = &self.output_file {
            check_file_name(name).map_err(GenerationError::Validation)?;
        }
        Ok(())
    }

    /// `topic: subtopic`, or just the topic.
    pub fn display_title(&self) -> String {
        match &self.subtopic {
            Some(sub) => format!("{}: {}", self.topic, sub),
            None => self.topic.clone(),
        }
    }
}

/// Which research tool produced a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetSource {
    Search,
    Wiki,
}

/// A unit of retrieved text plus its source reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSnippet {
    pub source: SnippetSource,
    pub text: String,
    /// URL or identifier for traceability
    pub reference: String,
}

/// One titled section of a drafted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
}

impl Section {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// The structured, ordered document produced by drafting.
///
/// Section order is reading order and is kept as-is through rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub title: String,
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl DocumentOutline {
    /// Append references not already listed, keeping order.
    pub fn add_references<I>(&mut self, refs: I)
    where
        I: IntoIterator<Item = String>,
    {
        for r in refs {
            let r = r.trim().to_string();
            if !r.is_empty() && !self.references.contains(&r) {
                self.references.push(r);
            }
        }
    }
}
