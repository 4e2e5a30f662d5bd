//! Job registry: owns every generation job and spawns its pipeline.
//!
//! The map sits behind a `RwLock`; each entry's record has its own `Mutex`
//! so a status read never sees a half-applied transition. Neither lock is
//! held across a pipeline await.

use chrono::{DateTime, Utc};
use docforge_config::AppConfig;
use docforge_core::error::GenerationError;
use docforge_core::{
    DocumentRequest, DomainEvent, EventBus, GenerationJob, JobId, JobSnapshot, JobStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, error, info};

use crate::pipeline::Pipeline;

/// One registered job: its record plus a completion signal.
pub(crate) struct JobEntry {
    pub(crate) id: JobId,
    job: Mutex<GenerationJob>,
    done: watch::Sender<bool>,
    events: Arc<EventBus>,
}

impl JobEntry {
    pub(crate) fn new(job: GenerationJob, events: Arc<EventBus>) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            id: job.id.clone(),
            job: Mutex::new(job),
            done,
            events,
        }
    }

    /// Move to the next non-terminal stage.
    pub(crate) async fn advance(&self, next: JobStatus) -> Result<(), GenerationError> {
        let snapshot = {
            let mut job = self.job.lock().await;
            job.advance(next)
                .map_err(|e| GenerationError::Internal(e.to_string()))?;
            job.snapshot()
        };
        debug!(job_id = %self.id, status = %next, "Job advanced");
        self.publish(&snapshot);
        Ok(())
    }

    pub(crate) async fn succeed(&self, file_reference: String) {
        let result = {
            let mut job = self.job.lock().await;
            job.succeed(file_reference).map(|_| job.snapshot())
        };
        self.finish(result);
    }

    pub(crate) async fn fail(&self, message: String) {
        let result = {
            let mut job = self.job.lock().await;
            job.fail(message).map(|_| job.snapshot())
        };
        self.finish(result);
    }

    fn finish(&self, result: Result<JobSnapshot, docforge_core::job::InvalidTransition>) {
        match result {
            Ok(snapshot) => {
                match snapshot.status {
                    JobStatus::Succeeded => info!(
                        job_id = %self.id,
                        file = snapshot.file_reference.as_deref().unwrap_or_default(),
                        "Document successfully generated"
                    ),
                    _ => error!(
                        job_id = %self.id,
                        error = snapshot.error.as_deref().unwrap_or_default(),
                        "Error generating document"
                    ),
                }
                self.publish(&snapshot);
            }
            Err(e) => error!(job_id = %self.id, error = %e, "Job already finished"),
        }
        self.done.send_replace(true);
    }

    pub(crate) async fn snapshot(&self) -> JobSnapshot {
        self.job.lock().await.snapshot()
    }

    fn publish(&self, snapshot: &JobSnapshot) {
        self.events.publish(DomainEvent::JobStatusChanged {
            job_id: snapshot.job_id.clone(),
            status: snapshot.status,
            message: snapshot.message.clone(),
            timestamp: snapshot.updated_at,
        });
    }
}

/// In-process registry of generation jobs.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<JobEntry>>>,
    pipeline: Arc<Pipeline>,
}

impl JobRegistry {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Registry over the real providers, tools and PDF renderer.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Pipeline::from_config(config))
    }

    /// Bus carrying every job's status changes.
    pub fn events(&self) -> Arc<EventBus> {
        self.pipeline.events()
    }

    /// Validate `request`, register a pending job and start its pipeline.
    ///
    /// Returns as soon as the job is registered. Invalid requests never
    /// receive an ID.
    pub async fn create(&self, request: DocumentRequest) -> Result<JobId, GenerationError> {
        let request = request.normalized()?;
        let job = GenerationJob::new(request.clone());
        let pending = job.snapshot();
        let entry = Arc::new(JobEntry::new(job, self.pipeline.events()));
        let id = entry.id.clone();

        // No await between insert and spawn: a listed job always has a runner.
        self.jobs.write().await.insert(id.clone(), entry.clone());
        entry.publish(&pending);

        info!(
            job_id = %id,
            topic = %request.topic,
            provider = %request.model_provider,
            research = request.enable_research,
            "Document generation queued"
        );

        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            pipeline.execute(entry, request).await;
        });

        Ok(id)
    }

    /// Current snapshot of a job, or `None` if the ID is unknown.
    pub async fn get_status(&self, id: &JobId) -> Option<JobSnapshot> {
        let entry = self.jobs.read().await.get(id).cloned()?;
        Some(entry.snapshot().await)
    }

    /// Wait until the job reaches a terminal status.
    pub async fn wait(&self, id: &JobId) -> Option<JobSnapshot> {
        let entry = self.jobs.read().await.get(id).cloned()?;
        let mut done = entry.done.subscribe();
        // The sender lives in `entry`, so the channel cannot close here.
        let _ = done.wait_for(|finished| *finished).await;
        Some(entry.snapshot().await)
    }

    /// Every job, oldest first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let entries: Vec<Arc<JobEntry>> = self.jobs.read().await.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            snapshots.push(entry.snapshot().await);
        }
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop finished jobs that completed before `cutoff`. Returns how many
    /// were removed.
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let entries: Vec<Arc<JobEntry>> = self.jobs.read().await.values().cloned().collect();
        let mut expired = Vec::new();
        for entry in entries {
            let job = entry.job.lock().await;
            if job.completed_at().is_some_and(|at| at < cutoff) {
                expired.push(entry.id.clone());
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write().await;
        for id in &expired {
            jobs.remove(id);
        }
        debug!(evicted = expired.len(), "Evicted finished jobs");
        expired.len()
    }

    /// Periodically evict jobs that finished more than `retention` ago.
    pub fn spawn_retention_sweeper(self: Arc<Self>, retention: Duration) -> tokio::task::JoinHandle<()> {
        let period = retention.min(Duration::from_secs(60)).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Ok(age) = chrono::Duration::from_std(retention) else {
                    return;
                };
                let evicted = self.evict_finished_before(Utc::now() - age).await;
                if evicted > 0 {
                    info!(evicted, "Retention sweep removed finished jobs");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineSettings;
    use crate::research::ResearchSettings;
    use crate::test_helpers::{MockRenderer, ScriptedProvider, outline_json};
    use docforge_core::{ModelProvider, ToolRegistry};
    use docforge_providers::ProviderRouter;

    fn registry(responses: &[&str]) -> JobRegistry {
        let mut router = ProviderRouter::new();
        router.register(
            ModelProvider::OpenAi,
            Arc::new(ScriptedProvider::texts(responses)),
            "mock-model",
        );
        JobRegistry::new(Pipeline::new(
            router,
            ToolRegistry::new(),
            Arc::new(MockRenderer::default()),
            ResearchSettings::default(),
            PipelineSettings::default(),
        ))
    }

    fn good() -> String {
        outline_json("Renewable Energy", &[("Introduction", "Energy that renews.")])
    }

    #[tokio::test]
    async fn create_returns_id_and_job_completes() {
        let reg = registry(&[&good()]);
        let id = reg.create(DocumentRequest::new("Renewable Energy")).await.unwrap();

        let snap = reg.wait(&id).await.unwrap();
        assert_eq!(snap.status, JobStatus::Succeeded);
        assert!(snap.file_reference.is_some());
    }

    #[tokio::test]
    async fn empty_topic_never_gets_an_id() {
        let reg = registry(&[]);
        let err = reg.create(DocumentRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn create_dropped_before_insert_leaves_no_job() {
        let reg = registry(&[&good()]);
        let held = reg.jobs.read().await;
        let attempt = tokio::time::timeout(
            Duration::from_millis(20),
            reg.create(DocumentRequest::new("Solar")),
        )
        .await;
        assert!(attempt.is_err());
        drop(held);
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn created_job_publishes_pending_then_runs() {
        let reg = registry(&[&good()]);
        let mut events = reg.events().subscribe();
        let id = reg.create(DocumentRequest::new("Solar")).await.unwrap();

        match events.recv().await.unwrap().as_ref() {
            DomainEvent::JobStatusChanged { job_id, status, .. } => {
                assert_eq!(job_id, &id);
                assert_eq!(*status, JobStatus::Pending);
            }
            other => panic!("unexpected first event: {other:?}"),
        }
        assert_eq!(reg.wait(&id).await.unwrap().status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let reg = registry(&[]);
        let missing = JobId::from("does-not-exist");
        assert!(reg.get_status(&missing).await.is_none());
        assert!(reg.wait(&missing).await.is_none());
    }

    #[tokio::test]
    async fn status_of_fresh_job_starts_pending() {
        let reg = registry(&[&good()]);
        let id = reg.create(DocumentRequest::new("Solar")).await.unwrap();
        let snap = reg.get_status(&id).await.unwrap();
        assert_eq!(snap.history[0], JobStatus::Pending);
        reg.wait(&id).await;
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation() {
        let reg = registry(&[&good(), &good()]);
        let first = reg.create(DocumentRequest::new("First")).await.unwrap();
        let second = reg.create(DocumentRequest::new("Second")).await.unwrap();
        reg.wait(&first).await;
        reg.wait(&second).await;

        let jobs = reg.list().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].topic, "First");
        assert_eq!(jobs[1].topic, "Second");
    }

    #[tokio::test]
    async fn eviction_removes_only_finished_jobs() {
        let reg = registry(&[&good()]);
        let id = reg.create(DocumentRequest::new("Wind")).await.unwrap();
        reg.wait(&id).await;

        assert_eq!(reg.evict_finished_before(Utc::now() - chrono::Duration::hours(1)).await, 0);
        assert_eq!(reg.evict_finished_before(Utc::now() + chrono::Duration::seconds(1)).await, 1);
        assert!(reg.get_status(&id).await.is_none());
    }

    #[tokio::test]
    async fn status_changes_are_published() {
        let reg = registry(&[&good()]);
        let mut rx = reg.events().subscribe();
        let id = reg.create(DocumentRequest::new("Hydro")).await.unwrap();
        reg.wait(&id).await;

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DomainEvent::JobStatusChanged { job_id, status, .. } = event.as_ref() {
                assert_eq!(job_id, &id);
                statuses.push(*status);
            }
        }
        assert_eq!(
            statuses,
            vec![
                JobStatus::Pending,
                JobStatus::Drafting,
                JobStatus::Rendering,
                JobStatus::Succeeded
            ]
        );
    }
}
