//! Job Manager
//!
//! Owns the job lifecycle: validation, extraction, scoring, id assignment and
//! the terminal outcome. `run_job` is the only writer of a job once it exists;
//! each update is stored as a whole record so status reads always see a
//! consistent snapshot.

use crate::db::{JobStore, StoreError};
use crate::models::user_story::story_id;
use crate::models::{
    Construct, ConstructInput, ConstructRecord, ExtractionMethod, FieldKind, Job, JobFailure,
    JobReceipt, JobStatus, JobStatusView, Requirement, StateTransition, Transcript,
    TranscriptNote, TransitionError, UserStory, UserStoryDraft,
};
use crate::services::confidence_scorer::ConfidenceScorer;
use crate::services::extraction::{ExtractionEngine, TranscriptExtraction};
use crate::services::requirement_deriver::{DerivationError, RequirementDeriver};
use crate::services::retry_policy::{Backoff, RetryError, RetryPolicy};
use crate::services::schema_validator::{self, ValidationError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use ietl_common::events::{EventBus, IetlEvent};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Default per-job worker cap
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Retries for the write that records a terminal state
const TERMINAL_WRITE_POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 4,
    attempt_timeout: None,
    backoff: Backoff::Exponential {
        initial: Duration::from_millis(25),
        max: Duration::from_millis(400),
    },
};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("job not found: {0}")]
    NotFound(Uuid),

    #[error("construct not found: {0}")]
    ConstructNotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("job {0} is already being processed")]
    AlreadyRunning(Uuid),

    #[error("job {job_id} still {status} after {attempts} poll(s)")]
    StillProcessing {
        job_id: Uuid,
        status: JobStatus,
        attempts: u32,
    },

    #[error("job {job_id} is {status}, requirements need a completed job")]
    NotCompleted { job_id: Uuid, status: JobStatus },

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Removes the job from the active set when the run ends
struct RunGuard {
    active: Arc<Mutex<HashSet<Uuid>>>,
    job_id: Uuid,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        active.remove(&self.job_id);
    }
}

/// Spawned extraction task, aborted if dropped before it finishes
struct WorkerHandle<T>(JoinHandle<T>);

impl<T> Drop for WorkerHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Job Manager
#[derive(Clone)]
pub struct JobManager {
    store: Arc<dyn JobStore>,
    engine: ExtractionEngine,
    scorer: ConfidenceScorer,
    deriver: RequirementDeriver,
    event_bus: EventBus,
    max_workers: usize,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl JobManager {
    pub fn new(store: Arc<dyn JobStore>, engine: ExtractionEngine, event_bus: EventBus) -> Self {
        Self {
            store,
            engine,
            scorer: ConfidenceScorer::new(),
            deriver: RequirementDeriver::new(),
            event_bus,
            max_workers: DEFAULT_MAX_WORKERS,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Cap on concurrent transcript workers per job (minimum 1)
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn ai_configured(&self) -> bool {
        self.engine.ai_configured()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Validate and store a new job in CREATED
    ///
    /// Nothing is stored when validation fails.
    pub async fn create_job(
        &self,
        name: Option<String>,
        construct: ConstructInput,
        transcripts: Vec<Transcript>,
    ) -> Result<JobReceipt, JobError> {
        schema_validator::validate_transcripts(&transcripts)?;
        let construct = schema_validator::validate(construct)?;
        self.store_new_job(name, construct, transcripts).await
    }

    /// Same as [`create_job`](Self::create_job) with a registered construct
    pub async fn create_job_with_construct_id(
        &self,
        name: Option<String>,
        construct_id: Uuid,
        transcripts: Vec<Transcript>,
    ) -> Result<JobReceipt, JobError> {
        schema_validator::validate_transcripts(&transcripts)?;
        let record = self
            .store
            .get_construct(construct_id)
            .await?
            .ok_or(JobError::ConstructNotFound(construct_id))?;
        self.store_new_job(name, record.construct, transcripts).await
    }

    async fn store_new_job(
        &self,
        name: Option<String>,
        construct: Construct,
        mut transcripts: Vec<Transcript>,
    ) -> Result<JobReceipt, JobError> {
        for transcript in &mut transcripts {
            if transcript.size_bytes == 0 {
                transcript.size_bytes = transcript.text.len() as u64;
            }
        }

        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let job = Job::new(name, construct, transcripts);
        self.store.insert_job(&job).await?;

        tracing::info!(
            job_id = %job.id,
            transcripts = job.transcripts.len(),
            construct = job.construct.name(),
            "Job created"
        );
        self.event_bus.emit_lossy(IetlEvent::JobCreated {
            job_id: job.id,
            transcript_count: job.transcripts.len(),
            timestamp: Utc::now(),
        });

        Ok(job.receipt())
    }

    /// Create a job and run it on a background task
    pub async fn submit(
        &self,
        name: Option<String>,
        construct: ConstructInput,
        transcripts: Vec<Transcript>,
    ) -> Result<JobReceipt, JobError> {
        let receipt = self.create_job(name, construct, transcripts).await?;
        self.spawn_run(receipt.job_id);
        Ok(receipt)
    }

    /// Run an already created job on a background task
    pub fn spawn_run(&self, job_id: Uuid) {
        let manager = self.clone();
        tokio::spawn(async move {
            tracing::debug!(job_id = %job_id, "Background job task started");
            if let Err(e) = manager.run_job(job_id).await {
                tracing::error!(job_id = %job_id, error = %e, "Background job task failed");
            }
        });
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Drive a CREATED job to a terminal state
    pub async fn run_job(&self, job_id: Uuid) -> Result<JobStatusView, JobError> {
        let _guard = self.claim(job_id)?;
        let mut job = self.load(job_id).await?;

        let transition = job.transition_to(JobStatus::Processing)?;
        self.store.put_job(&job).await?;
        self.announce(&transition);

        let started = Instant::now();
        match self.extract_all(&mut job).await {
            Ok(extractions) => {
                let stories = self.assemble(&job.construct, extractions);
                if stories.is_empty() {
                    let failure = JobFailure::no_extractable_content(job.transcripts.len());
                    self.finish_failed(job, failure, started).await
                } else {
                    self.finish_completed(job, stories, started).await
                }
            }
            Err(failure) => self.finish_failed(job, failure, started).await,
        }
    }

    fn claim(&self, job_id: Uuid) -> Result<RunGuard, JobError> {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !active.insert(job_id) {
            return Err(JobError::AlreadyRunning(job_id));
        }
        Ok(RunGuard {
            active: Arc::clone(&self.active),
            job_id,
        })
    }

    /// Extract every transcript with a bounded worker pool
    ///
    /// Results come back in completion order and are put back in submission
    /// order before returning. On error the remaining workers are aborted.
    async fn extract_all(&self, job: &mut Job) -> Result<Vec<TranscriptExtraction>, JobFailure> {
        let transcripts = job.transcripts.clone();
        let total = transcripts.len();
        let workers = self.max_workers.min(total).max(1);
        let construct = Arc::new(job.construct.clone());

        tracing::info!(job_id = %job.id, transcripts = total, workers, "Extraction started");

        let mut slots: Vec<Option<TranscriptExtraction>> = vec![None; total];
        let mut results = stream::iter(transcripts.into_iter().enumerate())
            .map(|(index, transcript)| {
                let engine = self.engine.clone();
                let construct = Arc::clone(&construct);
                let transcript_id = transcript.id.clone();
                async move {
                    let mut worker = WorkerHandle(tokio::spawn(async move {
                        engine.extract(&transcript, &construct).await
                    }));
                    let joined = (&mut worker.0).await;
                    (index, transcript_id, joined)
                }
            })
            .buffer_unordered(workers);

        while let Some((index, transcript_id, joined)) = results.next().await {
            let extraction = joined.map_err(|e| {
                JobFailure::internal(format!("worker for transcript '{}' failed: {}", transcript_id, e))
            })?;

            job.record_note(TranscriptNote {
                transcript_id: transcript_id.clone(),
                extraction_method: extraction.method,
                record_count: extraction.drafts.len(),
                degradation: extraction.degradation.as_ref().map(|d| d.code().to_string()),
            });
            self.store
                .put_job(job)
                .await
                .map_err(|e| JobFailure::internal(format!("failed to store progress: {}", e)))?;

            self.event_bus.emit_lossy(IetlEvent::TranscriptProcessed {
                job_id: job.id,
                transcript_id,
                extraction_method: extraction.method.to_string(),
                record_count: extraction.drafts.len(),
                processed: job.progress.processed,
                total,
                timestamp: Utc::now(),
            });

            slots[index] = Some(extraction);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Score drafts and assign sequential ids in transcript order
    fn assemble(&self, construct: &Construct, extractions: Vec<TranscriptExtraction>) -> Vec<UserStory> {
        extractions
            .into_iter()
            .flat_map(|extraction| extraction.drafts)
            .enumerate()
            .map(|(index, draft)| self.finalize(construct, index + 1, draft))
            .collect()
    }

    fn finalize(&self, construct: &Construct, position: usize, draft: UserStoryDraft) -> UserStory {
        let id = story_id(position);
        let confidence = self.scorer.score(&draft);

        let mut fields = IndexMap::with_capacity(construct.output_fields().len());
        for (name, kind) in construct.field_kinds() {
            let value = match kind {
                FieldKind::Identifier => id.clone(),
                FieldKind::Score => format!("{:.3}", confidence),
                _ => draft.fields.get(name).cloned().unwrap_or_default(),
            };
            fields.insert(name.to_string(), value);
        }

        UserStory {
            id,
            fields,
            tags: draft.tags,
            confidence,
            extraction_method: draft.extraction_method,
            source_transcript_id: draft.source_transcript_id,
            source_snippet: draft.source_snippet,
        }
    }

    async fn finish_completed(
        &self,
        mut job: Job,
        stories: Vec<UserStory>,
        started: Instant,
    ) -> Result<JobStatusView, JobError> {
        let story_count = stories.len();
        let fallback_count = stories
            .iter()
            .filter(|s| s.extraction_method == ExtractionMethod::Fallback)
            .count();

        let processing = job.clone();
        job.result = Some(stories);
        let transition = job.transition_to(JobStatus::Completed)?;
        if let Err(e) = self.persist_terminal(&job).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to store completed job");
            let failure = JobFailure::internal(format!("failed to store completed result: {}", e));
            return self.finish_failed(processing, failure, started).await;
        }
        self.announce(&transition);

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            job_id = %job.id,
            stories = story_count,
            fallback = fallback_count,
            duration_ms,
            "Job completed"
        );
        self.event_bus.emit_lossy(IetlEvent::JobCompleted {
            job_id: job.id,
            story_count,
            fallback_count,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(job.status_view())
    }

    async fn finish_failed(
        &self,
        mut job: Job,
        failure: JobFailure,
        started: Instant,
    ) -> Result<JobStatusView, JobError> {
        let reason = failure.reason.clone();
        job.error = Some(failure);
        let transition = job.transition_to(JobStatus::Failed)?;
        self.persist_terminal(&job).await?;
        self.announce(&transition);

        tracing::warn!(
            job_id = %job.id,
            reason = %reason,
            duration_ms = started.elapsed().as_millis() as u64,
            "Job failed"
        );
        self.event_bus.emit_lossy(IetlEvent::JobFailed {
            job_id: job.id,
            reason,
            timestamp: Utc::now(),
        });

        Ok(job.status_view())
    }

    /// Store a terminal record, retrying transient store failures
    async fn persist_terminal(&self, job: &Job) -> Result<(), StoreError> {
        let store = &self.store;
        TERMINAL_WRITE_POLICY
            .run("store terminal job state", move || store.put_job(job), |_| true)
            .await
            .map_err(|e| match e {
                RetryError::Failed { last_error, .. } => last_error,
                RetryError::TimedOut { attempts } => StoreError::Backend(ietl_common::Error::Internal(
                    format!("terminal write timed out after {} attempt(s)", attempts),
                )),
            })
    }

    fn announce(&self, transition: &StateTransition) {
        tracing::info!(
            job_id = %transition.job_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Job state changed"
        );
        self.event_bus.emit_lossy(IetlEvent::JobStateChanged {
            job_id: transition.job_id,
            old_state: transition.old_state.to_string(),
            new_state: transition.new_state.to_string(),
            timestamp: transition.transitioned_at,
        });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    async fn load(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.store
            .get_job(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))
    }

    /// Full job record
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.load(job_id).await
    }

    /// Snapshot of a job's status
    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusView, JobError> {
        Ok(self.load(job_id).await?.status_view())
    }

    /// Poll until the job is terminal or the policy runs out of attempts
    pub async fn wait_for_terminal(
        &self,
        job_id: Uuid,
        policy: &RetryPolicy,
    ) -> Result<JobStatusView, JobError> {
        let mut status = JobStatus::Created;
        for attempt in 1..=policy.max_attempts {
            let view = self.get_status(job_id).await?;
            if view.status.is_terminal() {
                return Ok(view);
            }
            status = view.status;
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
        }

        Err(JobError::StillProcessing {
            job_id,
            status,
            attempts: policy.max_attempts,
        })
    }

    // ------------------------------------------------------------------
    // Requirements
    // ------------------------------------------------------------------

    /// Stateless derivation from caller-supplied stories
    pub fn derive_requirements(
        &self,
        stories: &[UserStory],
        construct: &ConstructInput,
    ) -> Result<Vec<Requirement>, JobError> {
        Ok(self.deriver.derive(stories, construct)?)
    }

    /// Derive from a completed job's stories and replace its stored set
    ///
    /// Uses the built-in requirements construct when none is given.
    pub async fn derive_requirements_for_job(
        &self,
        job_id: Uuid,
        construct: Option<ConstructInput>,
    ) -> Result<Vec<Requirement>, JobError> {
        let job = self.load(job_id).await?;
        let stories = match (&job.status, &job.result) {
            (JobStatus::Completed, Some(stories)) => stories,
            _ => {
                return Err(JobError::NotCompleted {
                    job_id,
                    status: job.status,
                })
            }
        };

        let construct = construct.unwrap_or_else(ConstructInput::default_requirements);
        let requirements = self.deriver.derive(stories, &construct)?;
        self.store.replace_requirements(job_id, &requirements).await?;

        tracing::info!(
            job_id = %job_id,
            requirements = requirements.len(),
            "Requirements derived"
        );
        self.event_bus.emit_lossy(IetlEvent::RequirementsDerived {
            job_id,
            requirement_count: requirements.len(),
            timestamp: Utc::now(),
        });

        Ok(requirements)
    }

    /// Stored requirement set; empty when never derived
    pub async fn get_requirements(&self, job_id: Uuid) -> Result<Vec<Requirement>, JobError> {
        self.load(job_id).await?;
        Ok(self.store.get_requirements(job_id).await?.unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Construct registry
    // ------------------------------------------------------------------

    pub async fn register_construct(&self, input: ConstructInput) -> Result<ConstructRecord, JobError> {
        let construct = schema_validator::validate(input)?;
        let record = ConstructRecord::new(construct);
        self.store.save_construct(&record).await?;
        tracing::info!(construct_id = %record.id, name = record.construct.name(), "Construct registered");
        Ok(record)
    }

    pub async fn get_construct(&self, construct_id: Uuid) -> Result<ConstructRecord, JobError> {
        self.store
            .get_construct(construct_id)
            .await?
            .ok_or(JobError::ConstructNotFound(construct_id))
    }

    pub async fn list_constructs(&self) -> Result<Vec<ConstructRecord>, JobError> {
        Ok(self.store.list_constructs().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryJobStore;
    use std::time::Duration;

    fn manager() -> JobManager {
        JobManager::new(
            Arc::new(InMemoryJobStore::new()),
            ExtractionEngine::fallback_only(),
            EventBus::new(64),
        )
    }

    fn construct(fields: &[&str], defaults: &[(&str, &str)]) -> ConstructInput {
        ConstructInput {
            name: "Stories".to_string(),
            output_fields: fields.iter().map(|s| s.to_string()).collect(),
            defaults: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_job_starts_in_created() {
        let manager = manager();
        let receipt = manager
            .create_job(
                Some("  batch 1 ".into()),
                construct(&["story"], &[]),
                vec![Transcript::new("t1", "a.txt", "Approval routing is slow.")],
            )
            .await
            .unwrap();

        assert_eq!(receipt.status, JobStatus::Created);
        let job = manager.get_job(receipt.job_id).await.unwrap();
        assert_eq!(job.name.as_deref(), Some("batch 1"));
        assert_eq!(job.transcripts[0].size_bytes, 25);
    }

    #[tokio::test]
    async fn test_invalid_construct_stores_nothing() {
        let manager = manager();
        let err = manager
            .create_job(
                None,
                construct(&[], &[]),
                vec![Transcript::new("t1", "", "text")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(ValidationError::EmptySchema)));
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let manager = manager();
        let receipt = manager
            .create_job(
                None,
                construct(&["story"], &[]),
                vec![Transcript::new("t1", "", "The approval workflow needs review.")],
            )
            .await
            .unwrap();

        let view = manager.run_job(receipt.job_id).await.unwrap();
        assert_eq!(view.status, JobStatus::Completed);

        let err = manager.run_job(receipt.job_id).await.unwrap_err();
        assert!(matches!(err, JobError::Transition(_)));
        assert_eq!(
            manager.get_status(receipt.job_id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_system_fields_filled_and_ids_sequential() {
        let manager = manager();
        let receipt = manager
            .create_job(
                None,
                construct(&["Story ID", "story", "Match Score"], &[]),
                vec![
                    Transcript::new("t1", "", "Approval routing is slow. Metadata tagging is manual."),
                    Transcript::new("t2", "", "We must sync with the CRM api."),
                ],
            )
            .await
            .unwrap();

        let view = manager.run_job(receipt.job_id).await.unwrap();
        let stories = view.result.unwrap();
        assert_eq!(stories.len(), 3);
        for (i, story) in stories.iter().enumerate() {
            assert_eq!(story.id, story_id(i + 1));
            assert_eq!(story.fields["Story ID"], story.id);
            assert_eq!(story.fields["Match Score"], format!("{:.3}", story.confidence));
            assert_eq!(story.fields.len(), 3);
        }
        assert_eq!(stories[2].source_transcript_id, "t2");
        assert_eq!(view.notes.len(), 2);
        assert_eq!(view.progress.processed, 2);
    }

    #[tokio::test]
    async fn test_order_preserved_with_single_worker() {
        let manager = manager().with_max_workers(1);
        let transcripts = (1..=5)
            .map(|i| Transcript::new(format!("t{}", i), "", "The approval workflow is slow."))
            .collect();
        let receipt = manager
            .create_job(None, construct(&["story"], &[]), transcripts)
            .await
            .unwrap();

        let view = manager.run_job(receipt.job_id).await.unwrap();
        let sources: Vec<_> = view
            .result
            .unwrap()
            .into_iter()
            .map(|s| s.source_transcript_id)
            .collect();
        assert_eq!(sources, vec!["t1", "t2", "t3", "t4", "t5"]);
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let manager = manager();
        let mut rx = manager.event_bus().subscribe();
        let receipt = manager
            .create_job(
                None,
                construct(&["story"], &[]),
                vec![Transcript::new("t1", "", "Approval routing is slow.")],
            )
            .await
            .unwrap();
        manager.run_job(receipt.job_id).await.unwrap();

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.job_id(), receipt.job_id);
            types.push(event.event_type());
        }
        assert_eq!(
            types,
            vec![
                "JobCreated",
                "JobStateChanged",
                "TranscriptProcessed",
                "JobStateChanged",
                "JobCompleted"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_terminal_gives_up() {
        let manager = manager();
        let receipt = manager
            .create_job(
                None,
                construct(&["story"], &[]),
                vec![Transcript::new("t1", "", "text")],
            )
            .await
            .unwrap();

        let policy = RetryPolicy::polling(3, Duration::from_millis(100));
        let err = manager
            .wait_for_terminal(receipt.job_id, &policy)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::StillProcessing { attempts: 3, status: JobStatus::Created, .. }
        ));
    }

    #[tokio::test]
    async fn test_requirements_need_completed_job() {
        let manager = manager();
        let receipt = manager
            .create_job(
                None,
                construct(&["story"], &[]),
                vec![Transcript::new("t1", "", "Approval routing is slow.")],
            )
            .await
            .unwrap();

        let err = manager
            .derive_requirements_for_job(receipt.job_id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::NotCompleted { status: JobStatus::Created, .. }));
        assert!(manager.get_requirements(receipt.job_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_construct_registry() {
        let manager = manager();
        let record = manager
            .register_construct(ConstructInput::default_user_stories())
            .await
            .unwrap();

        let loaded = manager.get_construct(record.id).await.unwrap();
        assert_eq!(loaded.construct.name(), "Default User Story Template");

        let receipt = manager
            .create_job_with_construct_id(
                None,
                record.id,
                vec![Transcript::new("t1", "", "Approval routing is slow.")],
            )
            .await
            .unwrap();
        let job = manager.get_job(receipt.job_id).await.unwrap();
        assert_eq!(job.construct.output_fields().len(), 11);

        let missing = Uuid::new_v4();
        assert!(matches!(
            manager.get_construct(missing).await,
            Err(JobError::ConstructNotFound(id)) if id == missing
        ));
    }
}
