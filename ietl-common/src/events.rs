//! Event types for the Interview ETL event system
//!
//! Events are broadcast in-process and forwarded to SSE clients. They are
//! notifications only; the job store stays the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Interview ETL event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IetlEvent {
    /// Job accepted and stored in CREATED state
    JobCreated {
        job_id: Uuid,
        transcript_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Job moved between lifecycle states
    JobStateChanged {
        job_id: Uuid,
        old_state: String,
        new_state: String,
        timestamp: DateTime<Utc>,
    },

    /// One transcript finished extraction (success, fallback or empty)
    TranscriptProcessed {
        job_id: Uuid,
        transcript_id: String,
        extraction_method: String,
        record_count: usize,
        processed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Job reached COMPLETED
    JobCompleted {
        job_id: Uuid,
        story_count: usize,
        fallback_count: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Job reached FAILED
    JobFailed {
        job_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A requirement set was (re)generated for a job
    RequirementsDerived {
        job_id: Uuid,
        requirement_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl IetlEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            IetlEvent::JobCreated { .. } => "JobCreated",
            IetlEvent::JobStateChanged { .. } => "JobStateChanged",
            IetlEvent::TranscriptProcessed { .. } => "TranscriptProcessed",
            IetlEvent::JobCompleted { .. } => "JobCompleted",
            IetlEvent::JobFailed { .. } => "JobFailed",
            IetlEvent::RequirementsDerived { .. } => "RequirementsDerived",
        }
    }

    /// Job the event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            IetlEvent::JobCreated { job_id, .. }
            | IetlEvent::JobStateChanged { job_id, .. }
            | IetlEvent::TranscriptProcessed { job_id, .. }
            | IetlEvent::JobCompleted { job_id, .. }
            | IetlEvent::JobFailed { job_id, .. }
            | IetlEvent::RequirementsDerived { job_id, .. } => *job_id,
        }
    }
}

/// Broadcast event bus
///
/// Cheap to clone; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IetlEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IetlEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: IetlEvent) -> Result<usize, broadcast::error::SendError<IetlEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IetlEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
