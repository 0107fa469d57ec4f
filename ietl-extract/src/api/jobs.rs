//! Job API handlers
//!
//! POST /jobs, GET /jobs/:id, GET /jobs/:id/stories.csv

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{ConstructInput, JobReceipt, JobStatus, JobStatusView, Transcript},
    services::export,
    AppState,
};

/// POST /jobs request
///
/// Give either an inline `construct` or a registered `constructId`. With
/// neither, the built-in user story template is used.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub construct: Option<ConstructInput>,
    #[serde(default)]
    pub construct_id: Option<Uuid>,
    #[serde(default)]
    pub transcripts: Vec<Transcript>,
}

/// POST /jobs
///
/// Validate and store the job, then start it in the background. Returns 202
/// Accepted with the job id.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<JobReceipt>)> {
    let receipt = match (request.construct, request.construct_id) {
        (Some(_), Some(_)) => {
            return Err(ApiError::bad_request(
                "give either construct or constructId, not both",
            ))
        }
        (None, Some(construct_id)) => {
            state
                .manager
                .create_job_with_construct_id(request.name, construct_id, request.transcripts)
                .await?
        }
        (construct, None) => {
            let construct = construct.unwrap_or_else(ConstructInput::default_user_stories);
            state
                .manager
                .create_job(request.name, construct, request.transcripts)
                .await?
        }
    };

    state.manager.spawn_run(receipt.job_id);
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// GET /jobs/:id
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobStatusView>> {
    let view = state.manager.get_status(job_id).await?;
    tracing::debug!(job_id = %job_id, status = %view.status, "Status query");
    Ok(Json(view))
}

/// GET /jobs/:id/stories.csv
pub async fn export_stories(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let job = state.manager.get_job(job_id).await?;
    let stories = match (job.status, job.result.as_deref()) {
        (JobStatus::Completed, Some(stories)) => stories,
        _ => {
            return Err(ApiError::Conflict(format!(
                "job {} is {}, nothing to export",
                job_id, job.status
            )))
        }
    };

    let body = export::write_stories(stories, job.construct.output_fields());
    Ok(csv_response(body, &format!("stories-{}.csv", job_id)))
}

pub(crate) fn csv_response(body: String, filename: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", get(get_job_status))
        .route("/jobs/:id/stories.csv", get(export_stories))
}
