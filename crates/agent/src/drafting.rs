//! Drafting step: one structured-generation call that turns a request and
//! its research snippets into a `DocumentOutline`.
//!
//! The model is asked for a JSON object:
//!
//! ```text
//! {"title": str, "sections": [{"title": str, "body": str}], "references": [str]}
//! ```
//!
//! The reply is accepted bare, inside a Markdown code fence, or as the
//! outermost `{...}` span in surrounding prose. When no JSON can be found
//! at all, Markdown `#` headings and short ALL-CAPS lines are used as
//! section breaks instead.

use docforge_core::error::{GenerationError, Result};
use docforge_core::message::Message;
use docforge_core::provider::{Provider, ProviderRequest};
use docforge_core::{DocumentOutline, DocumentRequest, ResearchSnippet, Section};
use serde::Deserialize;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a document writing assistant. Turn the topic, \
subtopic and key points you are given into a formal, well-structured document.\n\n\
Respond with a JSON object of this shape:\n\
{\"title\": string, \"sections\": [{\"title\": string, \"body\": string}], \"references\": [string]}\n\n\
Start with an Introduction section, give every key point its own section, and finish \
with a Conclusion section. Separate paragraphs inside a body with a blank line.";

/// Longest snippet text passed to the model, in characters.
const MAX_SNIPPET_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub struct DraftSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// Build the provider request for one drafting attempt.
pub fn build_request(
    model: &str,
    request: &DocumentRequest,
    snippets: &[ResearchSnippet],
    settings: &DraftSettings,
) -> ProviderRequest {
    let mut prompt = format!("Topic: {}\n", request.topic);
    if let Some(sub) = &request.subtopic {
        prompt.push_str(&format!("Subtopic: {sub}\n"));
    }
    if !request.key_points.is_empty() {
        prompt.push_str("\nKey points to cover:\n");
        for point in &request.key_points {
            prompt.push_str(&format!("- {point}\n"));
        }
    }
    if !snippets.is_empty() {
        prompt.push_str("\nResearch notes:\n");
        for (i, snippet) in snippets.iter().enumerate() {
            let text: String = snippet.text.chars().take(MAX_SNIPPET_CHARS).collect();
            prompt.push_str(&format!("[{}] {} (source: {})\n", i + 1, text, snippet.reference));
        }
        prompt.push_str(
            "\nGround the document in these notes and list the sources you used in \"references\".\n",
        );
    }

    let mut req = ProviderRequest::new(
        model,
        vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
    );
    req.temperature = settings.temperature;
    req.max_tokens = Some(settings.max_tokens);
    req.json_output = true;
    req
}

/// Run one drafting attempt against `provider`.
pub async fn draft(
    provider: &dyn Provider,
    model: &str,
    request: &DocumentRequest,
    snippets: &[ResearchSnippet],
    settings: &DraftSettings,
) -> Result<DocumentOutline> {
    request.validate()?;
    let response = provider
        .complete(build_request(model, request, snippets, settings))
        .await?;
    debug!(
        provider = provider.name(),
        model = %response.model,
        chars = response.message.content.len(),
        "Draft received"
    );
    parse_outline(&response.message.content, request)
}

#[derive(Debug, Deserialize)]
struct RawOutline {
    #[serde(default)]
    title: String,
    #[serde(default)]
    introduction: String,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    conclusion: String,
    #[serde(default)]
    references: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "content")]
    body: String,
}

impl RawOutline {
    fn into_outline(self) -> DocumentOutline {
        let mut sections = Vec::with_capacity(self.sections.len() + 2);
        if !self.introduction.trim().is_empty() {
            sections.push(Section::new("Introduction", self.introduction.trim()));
        }
        sections.extend(
            self.sections
                .into_iter()
                .map(|s| Section::new(s.title.trim(), s.body.trim())),
        );
        if !self.conclusion.trim().is_empty() {
            sections.push(Section::new("Conclusion", self.conclusion.trim()));
        }

        let mut outline = DocumentOutline {
            title: self.title.trim().to_string(),
            sections,
            references: Vec::new(),
        };
        outline.add_references(self.references);
        outline
    }
}

/// Places where a JSON object may hide in a reply, most specific last.
fn json_candidates(raw: &str) -> Vec<&str> {
    let mut candidates = vec![raw];

    if let Some(start) = raw.find("```") {
        let after = &raw[start + 3..];
        // Skip the info string (e.g. "json") on the fence line.
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            candidates.push(body[..end].trim());
        }
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}'))
        && start < end
    {
        candidates.push(&raw[start..=end]);
    }

    candidates
}

fn is_heading(line: &str) -> bool {
    if line.starts_with('#') {
        return true;
    }
    line.chars().count() < 60
        && line.chars().any(char::is_alphabetic)
        && !line.chars().any(char::is_lowercase)
}

/// Split prose into sections on Markdown headings or ALL-CAPS lines.
///
/// A "References" or "Bibliography" section becomes the reference list.
/// A leading `# Title` with nothing under it names the document, and the
/// first paragraph before any heading becomes the Introduction unless the
/// reply has one. Returns `None` when no heading is found.
fn heading_fallback(raw: &str) -> Option<DocumentOutline> {
    let mut title = String::new();
    let mut preamble: Vec<&str> = Vec::new();
    let mut preamble_done = false;
    let mut sections: Vec<Section> = Vec::new();
    let mut references: Vec<String> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;
    let mut seen_heading = false;
    let mut title_candidate = false;

    /// Returns the heading back when it had no body.
    fn flush(
        current: Option<(String, Vec<String>)>,
        sections: &mut Vec<Section>,
        references: &mut Vec<String>,
    ) -> Option<String> {
        let (heading, lines) = current?;
        if lines.is_empty() {
            return Some(heading);
        }
        let lower = heading.to_lowercase();
        if lower.contains("reference") || lower.contains("bibliography") {
            references.extend(lines);
        } else {
            sections.push(Section::new(heading, lines.join("\n")));
        }
        None
    }

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            match current.as_mut() {
                Some((_, lines)) if lines.last().is_some_and(|l| !l.is_empty()) => {
                    lines.push(String::new());
                }
                None if !preamble.is_empty() => preamble_done = true,
                _ => {}
            }
            continue;
        }
        if is_heading(line) {
            if let Some(empty) = flush(current.take(), &mut sections, &mut references)
                && title_candidate
            {
                title = empty;
            }
            title_candidate = !seen_heading
                && preamble.is_empty()
                && line.starts_with('#')
                && !line.starts_with("##");
            seen_heading = true;
            current = Some((line.trim_start_matches('#').trim().to_string(), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line.to_string());
        } else if !preamble_done {
            preamble.push(line);
        }
    }
    if let Some(empty) = flush(current, &mut sections, &mut references)
        && title_candidate
    {
        title = empty;
    }

    if !seen_heading {
        return None;
    }

    // Blank lines mark paragraph breaks; drop trailing ones.
    for section in &mut sections {
        section.body = section.body.trim_end().to_string();
    }

    let has_intro = sections
        .iter()
        .any(|s| s.title.to_lowercase().contains("introduction"));
    if !has_intro && !preamble.is_empty() {
        sections.insert(0, Section::new("Introduction", preamble.join("\n")));
    }
    if sections.is_empty() {
        return None;
    }

    let mut outline = DocumentOutline {
        title,
        sections,
        references: Vec::new(),
    };
    outline.add_references(references);
    Some(outline)
}

/// Parse and validate a model reply into an outline.
pub fn parse_outline(raw: &str, request: &DocumentRequest) -> Result<DocumentOutline> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GenerationError::MalformedOutline("empty response".into()));
    }

    let parsed = json_candidates(raw)
        .into_iter()
        .find_map(|candidate| serde_json::from_str::<RawOutline>(candidate).ok())
        .map(RawOutline::into_outline)
        .or_else(|| {
            debug!("No JSON outline in reply, trying heading fallback");
            heading_fallback(raw)
        });

    let Some(mut outline) = parsed else {
        return Err(GenerationError::MalformedOutline(
            "reply contained neither a JSON outline nor section headings".into(),
        ));
    };

    outline
        .sections
        .retain(|s| !(s.title.trim().is_empty() && s.body.trim().is_empty()));
    if outline.sections.is_empty() {
        return Err(GenerationError::MalformedOutline("outline has no sections".into()));
    }
    if outline.title.trim().is_empty() {
        outline.title = request.display_title();
    }
    Ok(outline)
}
