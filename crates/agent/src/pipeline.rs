//! The per-job generation pipeline.
//!
//! ```text
//! [research] -> draft (with retries) -> render
//! ```
//!
//! Each stage is entered through `JobEntry::advance`, so the job record
//! and the event bus always agree on where a job is. Every failure, panics
//! included, stops at `execute` and marks the job as failed.

use chrono::Utc;
use docforge_config::AppConfig;
use docforge_core::error::{GenerationError, ProviderError, RenderError, Result};
use docforge_core::{
    DocumentOutline, DocumentRequest, DomainEvent, EventBus, JobId, JobStatus, Renderer,
    ResearchSnippet, ToolRegistry,
};
use docforge_providers::ProviderRouter;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::drafting::{self, DraftSettings};
use crate::registry::JobEntry;
use crate::research::{ResearchLoop, ResearchSettings};

/// Tool used to persist intermediate drafts.
const SAVE_TOOL: &str = "save_artifact";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Total drafting attempts, first try included
    pub max_attempts: usize,
    pub drafting_timeout: Duration,
    pub render_timeout: Duration,
    pub draft: DraftSettings,
    /// Keep each validated outline as JSON in the scratch directory
    pub save_drafts: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.drafting.max_attempts.max(1),
            drafting_timeout: Duration::from_secs(config.drafting.timeout_secs),
            render_timeout: Duration::from_secs(config.render.timeout_secs),
            draft: DraftSettings {
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            save_drafts: config.render.save_drafts,
        }
    }
}

pub struct Pipeline {
    providers: Arc<ProviderRouter>,
    tools: Arc<ToolRegistry>,
    renderer: Arc<dyn Renderer>,
    research: ResearchSettings,
    settings: PipelineSettings,
    events: Arc<EventBus>,
}

impl Pipeline {
    pub fn new(
        providers: ProviderRouter,
        tools: ToolRegistry,
        renderer: Arc<dyn Renderer>,
        research: ResearchSettings,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            tools: Arc::new(tools),
            renderer,
            research,
            settings,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Share an existing event bus instead of the pipeline's own.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            docforge_providers::build_from_config(config),
            docforge_tools::default_registry(config),
            Arc::new(docforge_render::PdfRenderer::new(&config.render.output_dir)),
            ResearchSettings::from(&config.research),
            PipelineSettings::from(config),
        )
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Drive one job to a terminal status.
    pub(crate) async fn execute(&self, entry: Arc<JobEntry>, request: DocumentRequest) {
        let outcome = AssertUnwindSafe(self.run_stages(&entry, &request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(file_reference)) => entry.succeed(file_reference).await,
            Ok(Err(e)) => entry.fail(e.to_string()).await,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                entry.fail(format!("Internal error: pipeline panicked: {reason}")).await;
            }
        }
    }

    async fn run_stages(&self, entry: &JobEntry, request: &DocumentRequest) -> Result<String> {
        let snippets = if request.enable_research {
            entry.advance(JobStatus::Researching).await?;
            self.research(&entry.id, request).await
        } else {
            Vec::new()
        };

        entry.advance(JobStatus::Drafting).await?;
        let mut outline = self.draft_with_retries(&entry.id, request, &snippets).await?;
        outline.add_references(snippets.iter().map(|s| s.reference.clone()));

        if self.settings.save_drafts {
            self.save_draft(&entry.id, &outline).await;
        }

        entry.advance(JobStatus::Rendering).await?;
        let file_name = output_file_name(&entry.id, request);
        let rendered = tokio::time::timeout(
            self.settings.render_timeout,
            self.renderer.render(&outline, &file_name),
        )
        .await
        .unwrap_or_else(|_| {
            Err(RenderError::new(format!(
                "rendering timed out after {}s",
                self.settings.render_timeout.as_secs()
            )))
        })?;
        Ok(rendered)
    }

    async fn research(&self, job_id: &JobId, request: &DocumentRequest) -> Vec<ResearchSnippet> {
        let outcome = ResearchLoop::new(self.tools.clone(), self.research.clone())
            .with_events(self.events.clone())
            .run(request)
            .await;
        self.events.publish(DomainEvent::ResearchCompleted {
            job_id: job_id.clone(),
            rounds: outcome.rounds,
            snippets: outcome.snippets.len(),
            timestamp: Utc::now(),
        });
        outcome.snippets
    }

    async fn draft_with_retries(
        &self,
        job_id: &JobId,
        request: &DocumentRequest,
        snippets: &[ResearchSnippet],
    ) -> Result<DocumentOutline> {
        let selector = request.model_provider;
        let (provider, model) = self.providers.resolve(selector).ok_or_else(|| {
            ProviderError::NotConfigured(format!("no provider registered for {selector}"))
        })?;

        let mut attempt = 1;
        loop {
            debug!(job_id = %job_id, attempt, provider = provider.name(), "Drafting");
            let result = tokio::time::timeout(
                self.settings.drafting_timeout,
                drafting::draft(provider.as_ref(), &model, request, snippets, &self.settings.draft),
            )
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout(format!(
                    "drafting exceeded {}s",
                    self.settings.drafting_timeout.as_secs()
                ))
                .into())
            });

            match result {
                Ok(outline) => {
                    info!(
                        job_id = %job_id,
                        attempt,
                        sections = outline.sections.len(),
                        "Outline drafted"
                    );
                    return Ok(outline);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_attempts => {
                    let pause = retry_pause(&e, self.settings.drafting_timeout);
                    warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        wait_ms = pause.as_millis() as u64,
                        "Drafting failed, retrying"
                    );
                    if !pause.is_zero() {
                        tokio::time::sleep(pause).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn save_draft(&self, job_id: &JobId, outline: &DocumentOutline) {
        let json = match serde_json::to_string_pretty(outline) {
            Ok(json) => json,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Could not serialize draft");
                return;
            }
        };
        match self.tools.invoke(SAVE_TOOL, &json).await {
            Ok(hits) => {
                if let Some(hit) = hits.first() {
                    debug!(job_id = %job_id, path = %hit.reference, "Draft saved");
                }
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Could not save draft"),
        }
    }
}

/// How long to wait before the next drafting attempt. Only a rate limit
/// asks for a pause, and never longer than one drafting timeout.
fn retry_pause(error: &GenerationError, cap: Duration) -> Duration {
    match error {
        GenerationError::Provider(ProviderError::RateLimited { retry_after_secs }) => {
            Duration::from_secs(*retry_after_secs).min(cap)
        }
        _ => Duration::ZERO,
    }
}

/// The requested file name, or `document_<timestamp>_<id>.pdf`.
fn output_file_name(job_id: &JobId, request: &DocumentRequest) -> String {
    match &request.output_file {
        Some(name) => name.clone(),
        None => format!(
            "document_{}_{}.pdf",
            Utc::now().format("%Y%m%d_%H%M%S"),
            job_id.short()
        ),
    }
}
