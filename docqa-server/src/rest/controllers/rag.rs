//! Grounded question answering.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::status_for;
use crate::rest::sse::sse_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Default, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub answer: String,
    pub retrieved_docs: usize,
    pub max_score: f32,
    pub below_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type AskError = (StatusCode, Json<AskResponse>);

fn reject(status: StatusCode, message: impl Into<String>, error: Option<String>) -> AskError {
    (status, Json(AskResponse { success: false, message: message.into(), error, ..Default::default() }))
}

fn read_query(body: Result<Json<AskRequest>, JsonRejection>) -> Result<String, AskError> {
    let Json(request) = body.map_err(|e| {
        reject(StatusCode::BAD_REQUEST, "invalid request body", Some(e.body_text()))
    })?;
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "query must not be empty", None));
    }
    Ok(query)
}

/// `POST /api/rag/ask`.
pub async fn ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AskError> {
    let query = read_query(body)?;
    info!(query = %query, "answering question");

    let answer = state.answers.ask(&query).await.map_err(|e| {
        error!(error = %e, "failed to answer question");
        reject(status_for(&e), format!("failed to answer question: {e}"), Some(e.to_string()))
    })?;

    Ok(Json(AskResponse {
        success: true,
        message: answer.message,
        query: answer.query,
        answer: answer.answer,
        retrieved_docs: answer.retrieved_docs,
        max_score: answer.max_score,
        below_threshold: answer.below_threshold,
        error: None,
    }))
}

/// `POST /api/rag/ask/stream`.
///
/// The retrieval summary is sent in `x-retrieved-docs`, `x-max-score` and
/// `x-below-threshold` headers; the answer follows as SSE events.
pub async fn ask_stream(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Response, AskError> {
    let query = read_query(body)?;
    info!(query = %query, "streaming answer");

    let streamed = state.answers.ask_stream(&query).await.map_err(|e| {
        error!(error = %e, "failed to start streamed answer");
        reject(status_for(&e), format!("failed to answer question: {e}"), Some(e.to_string()))
    })?;

    let mut headers = HeaderMap::new();
    headers.insert("x-retrieved-docs", HeaderValue::from(streamed.retrieved_docs));
    if let Ok(score) = HeaderValue::from_str(&format!("{:.4}", streamed.max_score)) {
        headers.insert("x-max-score", score);
    }
    headers.insert(
        "x-below-threshold",
        HeaderValue::from_static(if streamed.below_threshold { "true" } else { "false" }),
    );

    Ok((headers, sse_response(streamed.events)).into_response())
}
