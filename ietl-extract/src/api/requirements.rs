//! Requirement API handlers
//!
//! POST /requirements (stateless), POST|GET /jobs/:id/requirements,
//! GET /jobs/:id/requirements.csv

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::jobs::csv_response,
    error::ApiResult,
    models::{ConstructInput, Requirement, UserStory},
    services::export,
    AppState,
};

/// POST /requirements request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeriveRequest {
    #[serde(default)]
    pub user_stories: Vec<UserStory>,
    /// Requirements construct; the built-in one when absent
    #[serde(default)]
    pub construct: Option<ConstructInput>,
}

/// POST /jobs/:id/requirements request
#[derive(Debug, Default, Deserialize)]
pub struct DeriveForJobRequest {
    #[serde(default)]
    pub construct: Option<ConstructInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    pub requirements: Vec<Requirement>,
}

/// POST /requirements
pub async fn derive_requirements(
    State(state): State<AppState>,
    Json(request): Json<DeriveRequest>,
) -> ApiResult<Json<RequirementsResponse>> {
    let construct = request
        .construct
        .unwrap_or_else(ConstructInput::default_requirements);
    let requirements = state
        .manager
        .derive_requirements(&request.user_stories, &construct)?;

    tracing::debug!(
        stories = request.user_stories.len(),
        requirements = requirements.len(),
        "Stateless derivation"
    );
    Ok(Json(RequirementsResponse {
        job_id: None,
        requirements,
    }))
}

/// POST /jobs/:id/requirements
///
/// Replaces any previously stored set for the job.
pub async fn derive_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    request: Option<Json<DeriveForJobRequest>>,
) -> ApiResult<Json<RequirementsResponse>> {
    let construct = request.and_then(|Json(r)| r.construct);
    let requirements = state
        .manager
        .derive_requirements_for_job(job_id, construct)
        .await?;

    Ok(Json(RequirementsResponse {
        job_id: Some(job_id),
        requirements,
    }))
}

/// GET /jobs/:id/requirements
pub async fn get_requirements(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<RequirementsResponse>> {
    let requirements = state.manager.get_requirements(job_id).await?;
    Ok(Json(RequirementsResponse {
        job_id: Some(job_id),
        requirements,
    }))
}

/// GET /jobs/:id/requirements.csv
pub async fn export_requirements(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let requirements = state.manager.get_requirements(job_id).await?;
    let body = export::write_requirements(&requirements);
    Ok(csv_response(body, &format!("requirements-{}.csv", job_id)))
}

/// Build requirement routes
pub fn requirement_routes() -> Router<AppState> {
    Router::new()
        .route("/requirements", post(derive_requirements))
        .route(
            "/jobs/:id/requirements",
            post(derive_for_job).get(get_requirements),
        )
        .route("/jobs/:id/requirements.csv", get(export_requirements))
}
