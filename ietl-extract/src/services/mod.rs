//! Services

pub mod confidence_scorer;
pub mod export;
pub mod extraction;
pub mod job_manager;
pub mod requirement_deriver;
pub mod retry_policy;
pub mod schema_validator;

pub use confidence_scorer::ConfidenceScorer;
pub use extraction::{ExtractionEngine, ExtractionFailure, TranscriptExtraction};
pub use job_manager::{JobError, JobManager};
pub use requirement_deriver::{DerivationError, RequirementDeriver};
pub use retry_policy::{Backoff, RetryError, RetryPolicy};
pub use schema_validator::ValidationError;
