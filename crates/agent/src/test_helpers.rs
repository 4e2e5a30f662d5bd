//! Shared test doubles for agent tests.

use async_trait::async_trait;
use docforge_core::error::{ProviderError, RenderError, ToolError};
use docforge_core::message::Message;
use docforge_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use docforge_core::{DocumentOutline, Renderer, SnippetSource, Tool, ToolHit};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted results.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
    delayed_calls: usize,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            delay: None,
            delayed_calls: usize::MAX,
        }
    }

    /// One successful text response per entry.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(text_response(t))).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only the first call; later calls answer at once.
    pub fn with_first_call_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self.delayed_calls = 1;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        if let Some(delay) = self.delay.filter(|_| call < self.delayed_calls) {
            tokio::time::sleep(delay).await;
        }
        let responses = self.responses.lock().unwrap();
        if call >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }
        responses[call].clone()
    }
}

/// Create a simple text response.
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A well-formed outline as the model would return it.
pub fn outline_json(title: &str, sections: &[(&str, &str)]) -> String {
    let sections: Vec<_> = sections
        .iter()
        .map(|(t, b)| serde_json::json!({"title": t, "body": b}))
        .collect();
    serde_json::json!({"title": title, "sections": sections}).to_string()
}

type Behavior = Box<dyn Fn(&str) -> Result<Vec<ToolHit>, ToolError> + Send + Sync>;

/// A configurable research tool that records its queries.
pub struct MockTool {
    name: &'static str,
    source: Option<SnippetSource>,
    behavior: Behavior,
    delay: Option<Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockTool {
    fn new(name: &'static str, source: SnippetSource, behavior: Behavior) -> Self {
        Self {
            name,
            source: Some(source),
            behavior,
            delay: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Returns one hit: `about <query>`.
    pub fn echo(name: &'static str, source: SnippetSource) -> Self {
        Self::new(
            name,
            source,
            Box::new(move |q: &str| Ok(vec![ToolHit::new(format!("about {q}"), format!("mock://{name}/{q}"))])),
        )
    }

    /// Returns the same hits for every query.
    pub fn fixed(name: &'static str, source: SnippetSource, texts: Vec<&'static str>) -> Self {
        Self::new(
            name,
            source,
            Box::new(move |_: &str| {
                Ok(texts
                    .iter()
                    .enumerate()
                    .map(|(i, t)| ToolHit::new(*t, format!("mock://{name}/{i}")))
                    .collect())
            }),
        )
    }

    /// Always unavailable.
    pub fn failing(name: &'static str, source: SnippetSource) -> Self {
        Self::new(
            name,
            source,
            Box::new(move |_: &str| {
                Err(ToolError::Unavailable {
                    tool_name: name.into(),
                    reason: "service down".into(),
                })
            }),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "mock tool"
    }

    fn source(&self) -> Option<SnippetSource> {
        self.source
    }

    async fn invoke(&self, query: &str) -> Result<Vec<ToolHit>, ToolError> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.behavior)(query)
    }
}

/// Renderer double: records outlines, or fails/panics on demand.
#[derive(Default)]
pub struct MockRenderer {
    fail_with: Option<String>,
    panic: bool,
    rendered: Mutex<Vec<(DocumentOutline, String)>>,
}

impl MockRenderer {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::default()
        }
    }

    pub fn rendered(&self) -> Vec<(DocumentOutline, String)> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(&self, outline: &DocumentOutline, file_name: &str) -> Result<String, RenderError> {
        if self.panic {
            panic!("renderer exploded");
        }
        if let Some(message) = &self.fail_with {
            return Err(RenderError::new(message.clone()));
        }
        self.rendered
            .lock()
            .unwrap()
            .push((outline.clone(), file_name.to_string()));
        Ok(format!("/out/{file_name}"))
    }
}
