//! Construct registry API handlers
//!
//! POST /constructs, GET /constructs, GET /constructs/default,
//! GET /constructs/:id

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::{ConstructInput, ConstructRecord},
    AppState,
};

/// GET /constructs/default response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultConstructsResponse {
    pub user_stories: ConstructInput,
    pub requirements: ConstructInput,
}

/// POST /constructs
pub async fn register_construct(
    State(state): State<AppState>,
    Json(input): Json<ConstructInput>,
) -> ApiResult<(StatusCode, Json<ConstructRecord>)> {
    let record = state.manager.register_construct(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /constructs
pub async fn list_constructs(State(state): State<AppState>) -> ApiResult<Json<Vec<ConstructRecord>>> {
    Ok(Json(state.manager.list_constructs().await?))
}

/// GET /constructs/:id
pub async fn get_construct(
    State(state): State<AppState>,
    Path(construct_id): Path<Uuid>,
) -> ApiResult<Json<ConstructRecord>> {
    Ok(Json(state.manager.get_construct(construct_id).await?))
}

/// GET /constructs/default
pub async fn default_constructs() -> Json<DefaultConstructsResponse> {
    Json(DefaultConstructsResponse {
        user_stories: ConstructInput::default_user_stories(),
        requirements: ConstructInput::default_requirements(),
    })
}

/// Build construct routes
pub fn construct_routes() -> Router<AppState> {
    Router::new()
        .route("/constructs", get(list_constructs).post(register_construct))
        .route("/constructs/default", get(default_constructs))
        .route("/constructs/:id", get(get_construct))
}
