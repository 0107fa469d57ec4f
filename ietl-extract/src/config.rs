//! Configuration resolution for ietl-extract
//!
//! The AI API key resolves ENV → TOML. No key is not an error: the service
//! then runs with fallback extraction only, unless the endpoint accepts
//! unauthenticated requests.

use crate::services::extraction::completion::{CompletionClient, HttpCompletionClient};
use crate::services::extraction::ExtractionEngine;
use crate::services::retry_policy::RetryPolicy;
use ietl_common::config::{AiConfig, TomlConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable holding the completion API key
pub const AI_API_KEY_ENV: &str = "IETL_AI_API_KEY";

/// Resolve the completion API key
///
/// **Priority:** ENV → TOML
pub fn resolve_ai_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(AI_API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.ai.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "AI API key found in multiple sources: environment, TOML. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("AI API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("AI API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Build the extraction engine from the `[ai]` section
///
/// Without an endpoint the engine is fallback only.
pub fn build_extraction_engine(ai: &AiConfig, api_key: Option<String>) -> ExtractionEngine {
    let policy = RetryPolicy::from_ai_config(ai);
    match ai.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => {
            match HttpCompletionClient::new(endpoint, ai.model.clone(), api_key) {
                Ok(client) => {
                    info!(endpoint, model = %ai.model, "AI extraction enabled");
                    let client: Arc<dyn CompletionClient> = Arc::new(client);
                    ExtractionEngine::new(Some(client), policy)
                }
                Err(e) => {
                    warn!(endpoint, error = %e, "Failed to build completion client, using fallback extraction only");
                    ExtractionEngine::new(None, policy)
                }
            }
        }
        None => {
            warn!("No AI endpoint configured, running with fallback extraction only");
            ExtractionEngine::new(None, policy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.ai.api_key = key.map(str::to_string);
        config
    }

    #[test]
    #[serial]
    fn test_env_key_wins_over_toml() {
        std::env::set_var(AI_API_KEY_ENV, "env-key");
        let key = resolve_ai_api_key(&toml_with_key(Some("toml-key")));
        std::env::remove_var(AI_API_KEY_ENV);
        assert_eq!(key.as_deref(), Some("env-key"));
    }

    #[test]
    #[serial]
    fn test_toml_key_used_without_env() {
        std::env::remove_var(AI_API_KEY_ENV);
        let key = resolve_ai_api_key(&toml_with_key(Some("toml-key")));
        assert_eq!(key.as_deref(), Some("toml-key"));
    }

    #[test]
    #[serial]
    fn test_blank_keys_are_ignored() {
        std::env::set_var(AI_API_KEY_ENV, "   ");
        let key = resolve_ai_api_key(&toml_with_key(Some("")));
        std::env::remove_var(AI_API_KEY_ENV);
        assert!(key.is_none());
    }

    #[test]
    fn test_engine_without_endpoint_is_fallback_only() {
        let engine = build_extraction_engine(&AiConfig::default(), None);
        assert!(!engine.ai_configured());
    }

    #[test]
    fn test_engine_with_endpoint() {
        let ai = AiConfig {
            endpoint: Some("http://localhost:9/v1/chat/completions".to_string()),
            ..AiConfig::default()
        };
        let engine = build_extraction_engine(&ai, Some("k".to_string()));
        assert!(engine.ai_configured());
        assert_eq!(engine.policy().max_attempts, ai.max_attempts);
    }
}
