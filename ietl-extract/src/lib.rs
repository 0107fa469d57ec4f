//! ietl-extract library interface
//!
//! Interview transcripts in, structured user stories and derived requirements
//! out. Exposes the job manager and its components for embedding and for
//! integration testing; the binary wraps them in an HTTP service.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};
pub use crate::services::JobManager;

use axum::Router;
use chrono::{DateTime, Utc};
use ietl_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: JobManager,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(manager: JobManager) -> Self {
        let event_bus = manager.event_bus().clone();
        Self {
            manager,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::job_routes())
        .merge(api::requirement_routes())
        .merge(api::construct_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}
