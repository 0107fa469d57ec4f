//! Test Helper Utilities
//!
//! Shared utilities for testing ietl-extract

#![allow(dead_code)]

use async_trait::async_trait;
use ietl_common::events::EventBus;
use ietl_extract::db::InMemoryJobStore;
use ietl_extract::models::{ConstructInput, Transcript};
use ietl_extract::services::extraction::completion::{
    CompletionClient, CompletionError, CompletionRequest,
};
use ietl_extract::services::{Backoff, ExtractionEngine, JobManager, RetryPolicy};
use ietl_extract::AppState;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Reply = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

/// Completion client answering from a closure
pub struct FakeCompletionClient {
    reply: Reply,
    calls: AtomicU32,
}

impl FakeCompletionClient {
    pub fn new<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicU32::new(0),
        })
    }

    /// Same text for every request
    pub fn always(text: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(text.to_string()))
    }

    /// Every request fails with the given HTTP status
    pub fn failing(status: u16) -> Arc<Self> {
        Self::new(move |_| Err(CompletionError::Api(status, "unavailable".to_string())))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(request)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Completion client that panics, standing in for a crashed worker
pub struct PanickingClient;

#[async_trait]
impl CompletionClient for PanickingClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        panic!("completion worker crashed");
    }
}

pub fn test_policy() -> RetryPolicy {
    RetryPolicy::new(2, Some(Duration::from_secs(5)), Backoff::None)
}

pub fn fallback_manager() -> JobManager {
    JobManager::new(
        Arc::new(InMemoryJobStore::new()),
        ExtractionEngine::fallback_only(),
        EventBus::new(256),
    )
}

pub fn ai_manager(client: Arc<dyn CompletionClient>) -> JobManager {
    JobManager::new(
        Arc::new(InMemoryJobStore::new()),
        ExtractionEngine::new(Some(client), test_policy()),
        EventBus::new(256),
    )
}

pub fn test_state() -> AppState {
    AppState::new(fallback_manager())
}

/// Construct with the given fields and defaults
pub fn construct(fields: &[&str], defaults: &[(&str, &str)]) -> ConstructInput {
    ConstructInput {
        name: "Test Construct".to_string(),
        output_fields: fields.iter().map(|s| s.to_string()).collect(),
        defaults: defaults
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        ..Default::default()
    }
}

pub fn transcript(id: &str, text: &str) -> Transcript {
    Transcript::new(id, format!("{}.txt", id), text)
}

/// Poll policy generous enough for background jobs in tests
pub fn poll_policy() -> RetryPolicy {
    RetryPolicy::polling(200, Duration::from_millis(10))
}
