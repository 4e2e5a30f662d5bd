//! Research loop: bounded, best-effort snippet gathering.
//!
//! Round 1 asks every research tool about the base query (topic plus
//! subtopic). Later rounds ask about *gaps*: key points (or the subtopic
//! when there are none) whose significant words do not yet all appear in
//! the gathered snippets. The loop stops when the round budget runs out,
//! a round adds nothing new, no gaps remain, or the snippet cap is hit.
//!
//! Tool failures are logged and skipped. The loop never fails.

use chrono::Utc;
use docforge_config::ResearchConfig;
use docforge_core::{
    DocumentRequest, DomainEvent, EventBus, ResearchSnippet, Tool, ToolError, ToolHit,
    ToolRegistry,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Words too common to count as evidence that a point is covered.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "into", "its", "are", "was", "how",
    "what", "why", "about", "their", "over", "between",
];

#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub max_rounds: usize,
    pub max_snippets: usize,
    pub tool_timeout: Duration,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self::from(&ResearchConfig::default())
    }
}

impl From<&ResearchConfig> for ResearchSettings {
    fn from(config: &ResearchConfig) -> Self {
        Self {
            max_rounds: config.max_rounds,
            max_snippets: config.max_snippets,
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
        }
    }
}

/// What a research run produced.
#[derive(Debug, Clone, Default)]
pub struct ResearchOutcome {
    /// Deduplicated snippets in retrieval order
    pub snippets: Vec<ResearchSnippet>,
    /// Rounds that actually queried tools
    pub rounds: usize,
}

pub struct ResearchLoop {
    tools: Arc<ToolRegistry>,
    settings: ResearchSettings,
    events: Option<Arc<EventBus>>,
}

impl ResearchLoop {
    pub fn new(tools: Arc<ToolRegistry>, settings: ResearchSettings) -> Self {
        Self {
            tools,
            settings,
            events: None,
        }
    }

    /// Publish a `ToolExecuted` event per tool call.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn run(&self, request: &DocumentRequest) -> ResearchOutcome {
        let tools = self.tools.research_tools();
        let mut outcome = ResearchOutcome::default();
        if tools.is_empty() || self.settings.max_snippets == 0 {
            debug!("No research tools registered, skipping research");
            return outcome;
        }

        let mut seen: HashSet<String> = HashSet::new();

        'rounds: for round in 1..=self.settings.max_rounds {
            let queries = if round == 1 {
                vec![base_query(request)]
            } else {
                let gaps = gaps(request, &outcome.snippets);
                if gaps.is_empty() {
                    debug!(round, "No gaps left, research complete");
                    break;
                }
                gaps.into_iter()
                    .map(|gap| format!("{} {}", request.topic, gap))
                    .collect()
            };

            outcome.rounds = round;
            debug!(round, queries = ?queries, "Research round");

            let calls = queries
                .iter()
                .flat_map(|q| tools.iter().map(move |tool| (tool.clone(), q.clone())))
                .map(|(tool, query)| self.call(tool, query));
            let results = futures::future::join_all(calls).await;

            let mut added = 0;
            for (source, hits) in results.into_iter().flatten() {
                for hit in hits {
                    let key = normalize(&hit.text);
                    if key.is_empty() || !seen.insert(key) {
                        continue;
                    }
                    outcome.snippets.push(ResearchSnippet {
                        source,
                        text: hit.text.trim().to_string(),
                        reference: hit.reference,
                    });
                    added += 1;
                    if outcome.snippets.len() >= self.settings.max_snippets {
                        debug!(round, "Snippet cap reached");
                        break 'rounds;
                    }
                }
            }

            if added == 0 {
                debug!(round, "Round produced no new snippets, stopping");
                break;
            }
        }

        info!(
            rounds = outcome.rounds,
            snippets = outcome.snippets.len(),
            "Research finished"
        );
        outcome
    }

    /// One tool call with a timeout. `None` on failure.
    async fn call(
        &self,
        tool: Arc<dyn Tool>,
        query: String,
    ) -> Option<(docforge_core::SnippetSource, Vec<ToolHit>)> {
        let source = tool.source()?;
        let start = Instant::now();
        let result = match tokio::time::timeout(self.settings.tool_timeout, tool.invoke(&query)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: tool.name().to_string(),
                timeout_secs: self.settings.tool_timeout.as_secs(),
            }),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        if let Some(events) = &self.events {
            events.publish(DomainEvent::ToolExecuted {
                tool_name: tool.name().to_string(),
                success: result.is_ok(),
                hits: result.as_ref().map(Vec::len).unwrap_or(0),
                duration_ms,
                timestamp: Utc::now(),
            });
        }

        match result {
            Ok(hits) => {
                debug!(tool = tool.name(), query = %query, hits = hits.len(), duration_ms, "Tool returned");
                Some((source, hits))
            }
            Err(e) => {
                warn!(tool = tool.name(), query = %query, error = %e, "Research tool failed, skipping");
                None
            }
        }
    }
}

/// `topic subtopic`, or just the topic.
pub fn base_query(request: &DocumentRequest) -> String {
    match &request.subtopic {
        Some(sub) => format!("{} {}", request.topic, sub),
        None => request.topic.clone(),
    }
}

/// Lowercase, collapse whitespace, trim.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn significant_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Points not yet covered by the gathered snippets, in request order.
pub fn gaps(request: &DocumentRequest, snippets: &[ResearchSnippet]) -> Vec<String> {
    let candidates: Vec<&String> = if request.key_points.is_empty() {
        request.subtopic.iter().collect()
    } else {
        request.key_points.iter().collect()
    };

    let corpus: HashSet<String> = snippets
        .iter()
        .flat_map(|s| significant_words(&s.text))
        .collect();

    candidates
        .into_iter()
        .filter(|point| {
            let words = significant_words(point);
            !words.is_empty() && !words.iter().all(|w| corpus.contains(w))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockTool;
    use docforge_core::SnippetSource;

    fn settings() -> ResearchSettings {
        ResearchSettings {
            max_rounds: 3,
            max_snippets: 20,
            tool_timeout: Duration::from_millis(200),
        }
    }

    fn research(tools: Vec<Arc<dyn Tool>>, settings: ResearchSettings) -> ResearchLoop {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        ResearchLoop::new(Arc::new(registry), settings)
    }

    fn snippet(text: &str) -> ResearchSnippet {
        ResearchSnippet {
            source: SnippetSource::Search,
            text: text.into(),
            reference: "ref".into(),
        }
    }

    #[test]
    fn gaps_use_key_points() {
        let req = DocumentRequest::new("Energy").with_key_points(["Solar panels", "Wind turbines"]);
        let found = vec![snippet("Solar panels convert light into power.")];
        assert_eq!(gaps(&req, &found), vec!["Wind turbines"]);
    }

    #[test]
    fn gaps_fall_back_to_subtopic() {
        let req = DocumentRequest::new("Energy").with_subtopic("Geothermal heat");
        assert_eq!(gaps(&req, &[]), vec!["Geothermal heat"]);
        assert!(gaps(&req, &[snippet("geothermal HEAT pumps")]).is_empty());
        assert!(gaps(&DocumentRequest::new("Energy"), &[]).is_empty());
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Solar\n  POWER  is\tgreat "), "solar power is great");
    }

    #[tokio::test]
    async fn first_round_uses_base_query() {
        let search = Arc::new(MockTool::echo("web_search", SnippetSource::Search));
        let r = research(vec![search.clone()], settings());
        let req = DocumentRequest::new("Renewable Energy").with_subtopic("Solar");

        let outcome = r.run(&req).await;

        assert_eq!(search.queries()[0], "Renewable Energy Solar");
        assert_eq!(outcome.snippets[0].text, "about Renewable Energy Solar");
        assert_eq!(outcome.snippets[0].source, SnippetSource::Search);
    }

    #[tokio::test]
    async fn later_rounds_target_gaps() {
        let search = Arc::new(MockTool::echo("web_search", SnippetSource::Search));
        let r = research(vec![search.clone()], settings());
        let req = DocumentRequest::new("Energy").with_key_points(["Solar", "Wind"]);

        let outcome = r.run(&req).await;

        // Round 2 covers both gaps, round 3 finds none left.
        assert_eq!(search.queries(), vec!["Energy", "Energy Solar", "Energy Wind"]);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.snippets.len(), 3);
    }

    #[tokio::test]
    async fn results_follow_registration_order() {
        let wiki = Arc::new(MockTool::echo("wiki_lookup", SnippetSource::Wiki).with_delay(Duration::from_millis(30)));
        let search = Arc::new(MockTool::echo("web_search", SnippetSource::Search));
        let r = research(vec![wiki.clone(), search.clone()], ResearchSettings { max_rounds: 1, ..settings() });

        let outcome = r.run(&DocumentRequest::new("Rust")).await;
        let sources: Vec<_> = outcome.snippets.iter().map(|s| s.source).collect();
        assert_eq!(sources, vec![SnippetSource::Wiki, SnippetSource::Search]);
    }

    #[tokio::test]
    async fn duplicates_are_dropped() {
        let a = Arc::new(MockTool::fixed("web_search", SnippetSource::Search, vec!["Same  fact.", "Other fact."]));
        let b = Arc::new(MockTool::fixed("wiki_lookup", SnippetSource::Wiki, vec!["same fact."]));
        let r = research(vec![a, b], settings());

        let outcome = r.run(&DocumentRequest::new("Rust")).await;
        let texts: Vec<_> = outcome.snippets.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Same  fact.", "Other fact."]);
    }

    #[tokio::test]
    async fn stops_when_round_adds_nothing() {
        let tool = Arc::new(MockTool::fixed("web_search", SnippetSource::Search, vec!["Only fact."]));
        let r = research(vec![tool.clone()], settings());
        let req = DocumentRequest::new("Energy").with_key_points(["Tidal power"]);

        let outcome = r.run(&req).await;
        assert_eq!(tool.queries().len(), 2);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.snippets.len(), 1);
    }

    #[tokio::test]
    async fn snippet_cap_is_enforced() {
        let tool = Arc::new(MockTool::fixed(
            "web_search",
            SnippetSource::Search,
            vec!["one", "two", "three", "four"],
        ));
        let r = research(vec![tool], ResearchSettings { max_snippets: 3, ..settings() });
        let outcome = r.run(&DocumentRequest::new("Numbers")).await;
        assert_eq!(outcome.snippets.len(), 3);
    }

    #[tokio::test]
    async fn all_tools_failing_yields_empty() {
        let r = research(
            vec![
                Arc::new(MockTool::failing("web_search", SnippetSource::Search)),
                Arc::new(MockTool::failing("wiki_lookup", SnippetSource::Wiki)),
            ],
            settings(),
        );
        let req = DocumentRequest::new("Energy").with_key_points(["Solar"]);
        let outcome = r.run(&req).await;
        assert!(outcome.snippets.is_empty());
        assert_eq!(outcome.rounds, 1);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let r = research(
            vec![
                Arc::new(MockTool::failing("web_search", SnippetSource::Search)),
                Arc::new(MockTool::echo("wiki_lookup", SnippetSource::Wiki)),
            ],
            ResearchSettings { max_rounds: 1, ..settings() },
        );
        let outcome = r.run(&DocumentRequest::new("Energy")).await;
        assert_eq!(outcome.snippets.len(), 1);
        assert_eq!(outcome.snippets[0].source, SnippetSource::Wiki);
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let slow = Arc::new(MockTool::echo("web_search", SnippetSource::Search).with_delay(Duration::from_secs(5)));
        let r = research(
            vec![slow],
            ResearchSettings {
                max_rounds: 1,
                tool_timeout: Duration::from_millis(20),
                ..settings()
            },
        );
        let outcome = r.run(&DocumentRequest::new("Energy")).await;
        assert!(outcome.snippets.is_empty());
    }

    #[tokio::test]
    async fn sourceless_tools_are_not_queried() {
        let save = Arc::new(MockTool::echo("save_artifact", SnippetSource::Search).without_source());
        let r = research(vec![save.clone()], settings());
        let outcome = r.run(&DocumentRequest::new("Energy")).await;
        assert!(outcome.snippets.is_empty());
        assert!(save.queries().is_empty());
    }

    #[tokio::test]
    async fn tool_events_are_published() {
        let bus = Arc::new(EventBus::new(16));
        let mut rx = bus.subscribe();
        let r = research(
            vec![Arc::new(MockTool::failing("web_search", SnippetSource::Search))],
            settings(),
        )
        .with_events(bus.clone());

        r.run(&DocumentRequest::new("Energy")).await;
        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "web_search");
                assert!(!success);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
