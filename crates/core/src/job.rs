//! Generation job state machine.
//!
//! ```text
//! Pending ─┬─> Researching ─> Drafting ─> Rendering ─> Succeeded
//!          └──────────────────^    │           │
//!      (any non-terminal state) ───┴───────────┴────> Failed
//! ```
//!
//! Status only moves forward. `GenerationJob::advance` rejects anything else,
//! so a job can never be resurrected once terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentRequest;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for file names and log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible job status. Serialized names are the polling contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Researching,
    Drafting,
    Rendering,
    #[serde(rename = "success")]
    Succeeded,
    #[serde(rename = "error")]
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Researching => "researching",
            Self::Drafting => "drafting",
            Self::Rendering => "rendering",
            Self::Succeeded => "success",
            Self::Failed => "error",
        }
    }

    /// Whether `self -> next` is an allowed edge.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending, Researching | Drafting) => true,
            (Researching, Drafting) => true,
            (Drafting, Rendering) => true,
            (Rendering, Succeeded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::Pending => "Document generation queued",
            Self::Researching => "Researching topic",
            Self::Drafting => "Drafting document content",
            Self::Rendering => "Rendering PDF document",
            Self::Succeeded => "Document successfully generated",
            Self::Failed => "Error generating document",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected status change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One document-generation request's execution record.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub id: JobId,
    pub request: DocumentRequest,
    status: JobStatus,
    message: String,
    file_reference: Option<String>,
    error: Option<String>,
    history: Vec<JobStatus>,
    pub created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Create a job in `Pending`.
    pub fn new(request: DocumentRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            request,
            status: JobStatus::Pending,
            message: JobStatus::Pending.default_message().into(),
            file_reference: None,
            error: None,
            history: vec![JobStatus::Pending],
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn history(&self) -> &[JobStatus] {
        &self.history
    }

    pub fn file_reference(&self) -> Option<&str> {
        self.file_reference.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Move to a non-terminal stage.
    pub fn advance(&mut self, next: JobStatus) -> Result<(), InvalidTransition> {
        if next.is_terminal() {
            return Err(InvalidTransition { from: self.status, to: next });
        }
        self.transition(next, next.default_message().into())
    }

    /// `Rendering -> Succeeded`, recording the artifact reference.
    pub fn succeed(&mut self, file_reference: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Succeeded, JobStatus::Succeeded.default_message().into())?;
        self.file_reference = Some(file_reference.into());
        Ok(())
    }

    /// Any non-terminal stage -> `Failed`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        let error = error.into();
        let message = format!("{}: {}", JobStatus::Failed.default_message(), error);
        self.transition(JobStatus::Failed, message)?;
        self.error = Some(error);
        Ok(())
    }

    fn transition(&mut self, next: JobStatus, message: String) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition { from: self.status, to: next });
        }
        let now = Utc::now();
        self.status = next;
        self.message = message;
        self.history.push(next);
        self.updated_at = now;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// A consistent copy of the externally visible fields.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            status: self.status,
            message: self.message.clone(),
            file_reference: self.file_reference.clone(),
            error: self.error.clone(),
            topic: self.request.topic.clone(),
            history: self.history.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }
}

/// Serializable status record handed to pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub file_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub topic: String,
    pub history: Vec<JobStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
