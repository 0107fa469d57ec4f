//! Extraction Engine
//!
//! Transcript text + construct → candidate records. Two strategies, always
//! tagged on the output:
//!
//! 1. **AI**: one structured completion request, bounded by the retry policy.
//! 2. **Fallback**: deterministic keyword rules.
//!
//! Any AI problem (no client, timeout, transport failure, unparsable output, or
//! an answer with no valid record) routes to fallback. The reason is reported
//! as `degradation` so the job can record it.

pub mod completion;
pub mod fallback;
pub mod prompt;
pub mod response_parser;
pub mod text;

use crate::models::{Construct, ExtractionMethod, Transcript, UserStoryDraft};
use crate::services::retry_policy::{RetryError, RetryPolicy};
use completion::{CompletionClient, CompletionError, CompletionRequest};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Per-attempt bound for completion calls when the policy sets none
pub const DEFAULT_AI_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why the AI strategy was not used
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("no completion service configured")]
    AiUnavailable,

    #[error("completion timed out after {attempts} attempt(s)")]
    AiTimeout { attempts: u32 },

    #[error("completion transport failed after {attempts} attempt(s): {message}")]
    AiTransport { attempts: u32, message: String },

    #[error("completion output unparsable: {0}")]
    AiMalformed(String),

    #[error("completion returned no valid record")]
    AiEmpty,
}

impl ExtractionFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionFailure::AiUnavailable => "AiUnavailable",
            ExtractionFailure::AiTimeout { .. } => "AiTimeout",
            ExtractionFailure::AiTransport { .. } => "AiTransport",
            ExtractionFailure::AiMalformed(_) => "AiMalformed",
            ExtractionFailure::AiEmpty => "AiEmpty",
        }
    }
}

/// Result of extracting one transcript
#[derive(Debug, Clone)]
pub struct TranscriptExtraction {
    pub drafts: Vec<UserStoryDraft>,
    /// Strategy that produced `drafts`
    pub method: ExtractionMethod,
    /// Set when the AI strategy was skipped or failed
    pub degradation: Option<ExtractionFailure>,
}

/// Extraction Engine
///
/// Every completion attempt is time-bounded, so a job in PROCESSING always
/// reaches a terminal state.
#[derive(Clone)]
pub struct ExtractionEngine {
    client: Option<Arc<dyn CompletionClient>>,
    policy: RetryPolicy,
}

impl ExtractionEngine {
    pub fn new(client: Option<Arc<dyn CompletionClient>>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy: policy.with_default_timeout(DEFAULT_AI_ATTEMPT_TIMEOUT),
        }
    }

    /// Engine with no completion service (fallback only)
    pub fn fallback_only() -> Self {
        Self::new(None, RetryPolicy::once())
    }

    pub fn ai_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Extract drafts from one transcript
    pub async fn extract(&self, transcript: &Transcript, construct: &Construct) -> TranscriptExtraction {
        let failure = match self.try_ai(transcript, construct).await {
            Ok(drafts) => {
                tracing::debug!(
                    transcript_id = %transcript.id,
                    records = drafts.len(),
                    "AI extraction succeeded"
                );
                return TranscriptExtraction {
                    drafts,
                    method: ExtractionMethod::Ai,
                    degradation: None,
                };
            }
            Err(failure) => failure,
        };

        let drafts = fallback::extract(transcript, construct);
        if failure == ExtractionFailure::AiUnavailable {
            tracing::debug!(transcript_id = %transcript.id, records = drafts.len(), "Fallback extraction (no AI configured)");
        } else {
            tracing::warn!(
                transcript_id = %transcript.id,
                reason = %failure,
                records = drafts.len(),
                "AI extraction degraded to fallback"
            );
        }

        TranscriptExtraction {
            drafts,
            method: ExtractionMethod::Fallback,
            degradation: Some(failure),
        }
    }

    async fn try_ai(
        &self,
        transcript: &Transcript,
        construct: &Construct,
    ) -> Result<Vec<UserStoryDraft>, ExtractionFailure> {
        let client = self.client.as_ref().ok_or(ExtractionFailure::AiUnavailable)?;
        let request = CompletionRequest::new(transcript, construct);

        let raw = self
            .policy
            .run(
                client.name(),
                || client.complete(&request),
                CompletionError::is_transient,
            )
            .await
            .map_err(|e| match e {
                RetryError::TimedOut { attempts } => ExtractionFailure::AiTimeout { attempts },
                RetryError::Failed { attempts, last_error } => ExtractionFailure::AiTransport {
                    attempts,
                    message: last_error.to_string(),
                },
            })?;

        let candidates = response_parser::parse_response(&raw)
            .map_err(|e| ExtractionFailure::AiMalformed(e.to_string()))?;
        let drafts = response_parser::build_drafts(candidates, transcript, construct);
        if drafts.is_empty() {
            return Err(ExtractionFailure::AiEmpty);
        }
        Ok(drafts)
    }
}
