//! Data models

pub mod construct;
pub mod field;
pub mod job;
pub mod requirement;
pub mod transcript;
pub mod user_story;

pub use construct::{Construct, ConstructInput, ConstructRecord, PriorityRule};
pub use field::{classify_field, field_key, FieldKind};
pub use job::{
    FailureKind, Job, JobFailure, JobProgress, JobReceipt, JobStatus, JobStatusView,
    StateTransition, TranscriptNote, TransitionError,
};
pub use requirement::{PriorityLevel, Requirement};
pub use transcript::Transcript;
pub use user_story::{ConfidenceEvidence, ExtractionMethod, UserStory, UserStoryDraft};
