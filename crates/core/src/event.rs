//! Domain event system: decoupled progress reporting.
//!
//! The job pipeline publishes events as jobs move through their stages.
//! Observers (the CLI progress printer, tests) subscribe without the
//! pipeline knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::job::{JobId, JobStatus};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A job moved to a new status
    JobStatusChanged {
        job_id: JobId,
        status: JobStatus,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A research tool was invoked
    ToolExecuted {
        tool_name: String,
        success: bool,
        hits: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The research loop finished
    ResearchCompleted {
        job_id: JobId,
        rounds: usize,
        snippets: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
