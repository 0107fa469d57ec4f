//! Job lifecycle state machine
//!
//! A job progresses CREATED → PROCESSING → {COMPLETED, FAILED}. Transitions
//! only move forward; terminal states have no exits.

use crate::models::construct::Construct;
use crate::models::transcript::Transcript;
use crate::models::user_story::{ExtractionMethod, UserStory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Validated and stored, not yet started
    Created,
    /// Extraction running
    Processing,
    /// At least one record extracted
    Completed,
    /// Nothing extracted, or a structural error
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Created,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "CREATED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The only legal edges of the lifecycle graph
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Created, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of an applied transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub job_id: Uuid,
    pub old_state: JobStatus,
    pub new_state: JobStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Rejected transition; the job is left untouched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal transition {from} -> {to} for job {job_id}")]
pub struct TransitionError {
    pub job_id: Uuid,
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Every transcript yielded zero records
    NoExtractableContent,
    /// Worker panic, store failure, or similar
    Internal,
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl JobFailure {
    pub fn no_extractable_content(transcripts: usize) -> Self {
        Self {
            kind: FailureKind::NoExtractableContent,
            reason: format!("no records extracted from {} transcript(s)", transcripts),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            reason: reason.into(),
        }
    }
}

/// Per-transcript outcome, kept for observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptNote {
    pub transcript_id: String,
    pub extraction_method: ExtractionMethod,
    pub record_count: usize,
    /// Why the AI strategy was not used, when it was not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
}

/// One extraction job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub name: Option<String>,
    pub status: JobStatus,
    pub construct: Construct,
    pub transcripts: Vec<Transcript>,
    pub result: Option<Vec<UserStory>>,
    pub error: Option<JobFailure>,
    pub notes: Vec<TranscriptNote>,
    pub progress: JobProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(name: Option<String>, construct: Construct, transcripts: Vec<Transcript>) -> Self {
        let now = Utc::now();
        let total = transcripts.len();
        Self {
            id: Uuid::new_v4(),
            name,
            status: JobStatus::Created,
            construct,
            transcripts,
            result: None,
            error: None,
            notes: Vec::new(),
            progress: JobProgress { processed: 0, total },
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Move to `new_state` if the lifecycle allows it
    pub fn transition_to(&mut self, new_state: JobStatus) -> Result<StateTransition, TransitionError> {
        if !self.status.can_transition_to(new_state) {
            return Err(TransitionError {
                job_id: self.id,
                from: self.status,
                to: new_state,
            });
        }

        let now = Utc::now();
        let transition = StateTransition {
            job_id: self.id,
            old_state: self.status,
            new_state,
            transitioned_at: now,
        };
        self.status = new_state;
        self.updated_at = now;
        if new_state.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(transition)
    }

    /// Record a finished transcript
    pub fn record_note(&mut self, note: TranscriptNote) {
        self.notes.push(note);
        self.progress.processed = self.notes.len();
        self.updated_at = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id,
            name: self.name.clone(),
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
            notes: self.notes.clone(),
            progress: self.progress,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }

    pub fn receipt(&self) -> JobReceipt {
        JobReceipt {
            job_id: self.id,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Snapshot returned by status queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<UserStory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub notes: Vec<TranscriptNote>,
    pub progress: JobProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Returned when a job is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::construct::ConstructInput;

    fn job() -> Job {
        let construct = Construct::try_from(ConstructInput::default_user_stories()).unwrap();
        Job::new(None, construct, vec![Transcript::new("t1", "a.txt", "hello")])
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job();
        let t = job.transition_to(JobStatus::Processing).unwrap();
        assert_eq!(t.old_state, JobStatus::Created);
        assert!(job.completed_at.is_none());

        job.transition_to(JobStatus::Completed).unwrap();
        assert!(job.is_terminal());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_cannot_skip_processing() {
        let mut job = job();
        let err = job.transition_to(JobStatus::Completed).unwrap_err();
        assert_eq!(err.from, JobStatus::Created);
        assert_eq!(job.status, JobStatus::Created);
        assert!(job.transition_to(JobStatus::Failed).is_err());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in [JobStatus::Completed, JobStatus::Failed] {
            for next in JobStatus::ALL {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_no_self_loops() {
        for s in JobStatus::ALL {
            assert!(!s.can_transition_to(s));
        }
    }

    #[test]
    fn test_record_note_tracks_progress() {
        let mut job = job();
        job.record_note(TranscriptNote {
            transcript_id: "t1".into(),
            extraction_method: ExtractionMethod::Fallback,
            record_count: 2,
            degradation: Some("AiUnavailable".into()),
        });
        assert_eq!(job.progress, JobProgress { processed: 1, total: 1 });
    }

    #[test]
    fn test_status_view_serialization() {
        let job = job();
        let json = serde_json::to_value(job.status_view()).unwrap();
        assert_eq!(json["status"], "CREATED");
        assert!(json.get("result").is_none());
        assert_eq!(json["progress"]["total"], 1);
    }
}
