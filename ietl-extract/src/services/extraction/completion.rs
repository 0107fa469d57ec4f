//! Text-completion client
//!
//! The extraction engine talks to the completion service only through the
//! [`CompletionClient`] trait. [`HttpCompletionClient`] speaks the
//! OpenAI-compatible chat-completions protocol.

use super::prompt;
use crate::models::{Construct, Transcript};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("ietl-extract/", env!("CARGO_PKG_VERSION"));

/// Structured extraction request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub transcript_text: String,
    pub output_fields: Vec<String>,
    pub pattern: String,
    pub defaults: IndexMap<String, String>,
    pub priority_rules: Vec<String>,
}

impl CompletionRequest {
    pub fn new(transcript: &Transcript, construct: &Construct) -> Self {
        Self {
            transcript_text: transcript.text.clone(),
            output_fields: construct.output_fields().to_vec(),
            pattern: construct.pattern().to_string(),
            defaults: construct.defaults().clone(),
            priority_rules: construct.priority_rules().to_vec(),
        }
    }
}

/// Completion client errors
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// The HTTP envelope itself could not be read
    #[error("Invalid response envelope: {0}")]
    Envelope(String),
}

impl CompletionError {
    /// Worth another attempt (network trouble, throttling, server errors)
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Network(_) => true,
            CompletionError::Api(status, _) => *status == 429 || *status >= 500,
            CompletionError::Envelope(_) => false,
        }
    }
}

/// Anything that can answer a [`CompletionRequest`] with raw text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the completion text; parsing is the caller's job
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "completion"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completions client
pub struct HttpCompletionClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    /// Build a client; request timeouts are applied by the retry policy
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, CompletionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt::build_user_prompt(request),
                },
            ],
            temperature: 0.0,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            transcript_chars = request.transcript_text.len(),
            "Sending completion request"
        );

        let mut builder = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Envelope(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Envelope("no choices in response".to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}
