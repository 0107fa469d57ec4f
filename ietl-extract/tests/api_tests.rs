//! Integration tests for ietl-extract API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpers::*;
use http_body_util::BodyExt;
use ietl_extract::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(state, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(state: &AppState, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&payload).unwrap()))
        .unwrap();
    let (status, body) = send(state, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

/// Submit a job over HTTP and wait until the background run finishes
async fn completed_job(state: &AppState, payload: Value) -> Uuid {
    let (status, body) = post_json(state, "/jobs", payload).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{}", body);
    let job_id: Uuid = body["jobId"].as_str().unwrap().parse().unwrap();

    state
        .manager
        .wait_for_terminal(job_id, &poll_policy())
        .await
        .unwrap();
    job_id
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = test_state();
    let (status, json) = get_json(&state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["module"], "ietl-extract");
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["ai_configured"], false);
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn test_create_job_without_transcripts_is_rejected() {
    let state = test_state();
    let (status, json) = post_json(
        &state,
        "/jobs",
        json!({ "construct": { "name": "S", "outputFields": ["story"] }, "transcripts": [] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "NoTranscripts");
}

#[tokio::test]
async fn test_create_job_with_invalid_construct_is_rejected() {
    let state = test_state();
    let (status, json) = post_json(
        &state,
        "/jobs",
        json!({
            "construct": { "name": "S", "outputFields": ["story", "story"] },
            "transcripts": [{ "id": "t1", "text": "Approval routing." }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "DuplicateField");
}

#[tokio::test]
async fn test_job_lifecycle_over_http() {
    let state = test_state();
    let job_id = completed_job(
        &state,
        json!({
            "name": "Interviews",
            "construct": {
                "name": "Stories",
                "outputFields": ["story", "role", "priority"],
                "defaults": { "priority": "MEDIUM" }
            },
            "transcripts": [
                { "id": "t1", "name": "ops.txt", "text": "As a workflow manager, I need approval routing." }
            ]
        }),
    )
    .await;

    let (status, json) = get_json(&state, &format!("/jobs/{}", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["name"], "Interviews");
    assert_eq!(json["result"][0]["id"], "US-001");
    assert_eq!(json["result"][0]["fields"]["priority"], "MEDIUM");
    assert_eq!(json["result"][0]["extractionMethod"], "fallback");
    assert_eq!(json["notes"][0]["degradation"], "AiUnavailable");
    assert_eq!(json["progress"]["processed"], 1);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let state = test_state();
    let (status, json) = get_json(&state, &format!("/jobs/{}", Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_stories_csv_export() {
    let state = test_state();
    let job_id = completed_job(
        &state,
        json!({
            "construct": { "name": "Stories", "outputFields": ["story"] },
            "transcripts": [{ "id": "t1", "text": "Metadata tagging is manual." }]
        }),
    )
    .await;

    let request = Request::builder()
        .uri(format!("/jobs/{}/stories.csv", job_id))
        .body(Body::empty())
        .unwrap();
    let response = build_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "\"id\",\"story\",\"confidence\",\"extraction_method\",\"source_transcript_id\",\"source_snippet\",\"tags\""
    );
    assert!(lines.next().unwrap().starts_with("\"US-001\",\"Metadata tagging is manual\","));
}

#[tokio::test]
async fn test_stateless_requirements() {
    let state = test_state();

    let (status, json) = post_json(&state, "/requirements", json!({ "userStories": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "EmptyInput");

    let story = json!({
        "id": "US-001",
        "fields": { "User Story": "Route approvals", "Capability": "approval routing" },
        "tags": ["workflow"],
        "confidence": 0.3,
        "extractionMethod": "fallback",
        "sourceTranscriptId": "t1",
        "sourceSnippet": "I need approval routing."
    });

    let (status, json) = post_json(
        &state,
        "/requirements",
        json!({ "userStories": [story.clone()], "construct": { "name": "", "outputFields": ["x"] } }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "InvalidName");

    let (status, json) = post_json(&state, "/requirements", json!({ "userStories": [story] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requirements"][0]["reqId"], "REQ-001");
    assert_eq!(
        json["requirements"][0]["requirement"],
        "The system shall support approval routing"
    );
    assert_eq!(json["requirements"][0]["priorityLevel"], "MEDIUM");
    assert_eq!(json["requirements"][0]["sourceStoryId"], "US-001");
}

#[tokio::test]
async fn test_job_requirements_replace_and_export() {
    let state = test_state();
    let job_id = completed_job(
        &state,
        json!({
            "transcripts": [{ "id": "t1", "text": "Security audits are critical. Approval routing is slow." }]
        }),
    )
    .await;

    let (status, json) = get_json(&state, &format!("/jobs/{}/requirements", job_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requirements"].as_array().unwrap().len(), 0);

    let uri = format!("/jobs/{}/requirements", job_id);
    let (status, derived) = post_json(&state, &uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let count = derived["requirements"].as_array().unwrap().len();
    assert_eq!(count, 2);
    assert_eq!(derived["requirements"][0]["priorityLevel"], "HIGH");

    let (_, again) = post_json(&state, &uri, json!({})).await;
    assert_eq!(again["requirements"], derived["requirements"]);

    let (_, stored) = get_json(&state, &uri).await;
    assert_eq!(stored["requirements"].as_array().unwrap().len(), count);

    let request = Request::builder()
        .uri(format!("/jobs/{}/requirements.csv", job_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(body).unwrap();
    assert_eq!(csv.lines().count(), count + 1);
}

#[tokio::test]
async fn test_requirements_for_unfinished_job_conflict() {
    let state = test_state();
    let receipt = state
        .manager
        .create_job(
            None,
            construct(&["story"], &[]),
            vec![transcript("t1", "Approval routing is slow.")],
        )
        .await
        .unwrap();

    let (status, json) = post_json(
        &state,
        &format!("/jobs/{}/requirements", receipt.job_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_construct_registry() {
    let state = test_state();

    let (status, defaults) = get_json(&state, "/constructs/default").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["userStories"]["outputFields"][0], "User Story ID");
    assert_eq!(defaults["requirements"]["outputFields"][0], "Req ID");

    let (status, record) = post_json(
        &state,
        "/constructs",
        json!({ "name": "  Ops  ", "outputFields": [" story ", "role"], "defaults": { "role": "operator" } }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["construct"]["name"], "Ops");
    assert_eq!(record["construct"]["outputFields"][0], "story");
    let construct_id = record["id"].as_str().unwrap().to_string();

    let (status, fetched) = get_json(&state, &format!("/constructs/{}", construct_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], construct_id);

    let (_, listed) = get_json(&state, "/constructs").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let job_id = completed_job(
        &state,
        json!({
            "constructId": construct_id,
            "transcripts": [{ "id": "t1", "text": "Metadata tagging is manual." }]
        }),
    )
    .await;
    let (_, job) = get_json(&state, &format!("/jobs/{}", job_id)).await;
    assert_eq!(job["result"][0]["fields"]["role"], "operator");

    let (status, _) = get_json(&state, &format!("/constructs/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inline_construct_and_id_together_rejected() {
    let state = test_state();
    let (status, json) = post_json(
        &state,
        "/jobs",
        json!({
            "construct": { "name": "S", "outputFields": ["story"] },
            "constructId": Uuid::new_v4(),
            "transcripts": [{ "id": "t1", "text": "x" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}
