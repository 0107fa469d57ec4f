//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok" or "degraded")
    pub status: String,
    /// Module name ("ietl-extract")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// True when a completion service is configured
    pub ai_configured: bool,
    /// Job store backend ("sqlite" or "memory")
    pub storage: String,
}

/// GET /health
///
/// Reports "degraded" when extraction runs on fallback rules only.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;
    let ai_configured = state.manager.ai_configured();

    Json(HealthResponse {
        status: if ai_configured { "ok" } else { "degraded" }.to_string(),
        module: "ietl-extract".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        ai_configured,
        storage: state.manager.store_backend().to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
