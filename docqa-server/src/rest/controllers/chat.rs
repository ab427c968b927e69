//! Plain chat with the configured model, without retrieval.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docqa_model::{ChatMessage, ChatModel, HistoryEntry, build_conversation, deliver};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::rest::sse::sse_response;
use crate::state::AppState;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub question: String,
    pub answer: String,
}

type ChatError = (StatusCode, Json<Value>);

fn reject(status: StatusCode, message: impl Into<String>) -> ChatError {
    (status, Json(json!({ "error": message.into() })))
}

fn prepare(
    state: &AppState,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(String, Arc<dyn ChatModel>, Vec<ChatMessage>), ChatError> {
    let Json(request) = body
        .map_err(|e| reject(StatusCode::BAD_REQUEST, format!("invalid request format: {}", e.body_text())))?;
    if request.question.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "question must not be empty"));
    }
    let model = state
        .chat_model
        .clone()
        .ok_or_else(|| reject(StatusCode::INTERNAL_SERVER_ERROR, "no chat model is configured"))?;
    let messages = build_conversation(CHAT_SYSTEM_PROMPT, &request.history, &request.question);
    Ok((request.question, model, messages))
}

/// `POST /api/chat/test`.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let (question, model, messages) = prepare(&state, body)?;
    let reply = model.generate(&messages).await.map_err(|e| {
        error!(model = model.name(), error = %e, "chat generation failed");
        reject(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to generate answer: {e}"))
    })?;
    Ok(Json(ChatResponse { question, answer: reply.content }))
}

/// `POST /api/chat/test/stream`.
pub async fn chat_stream(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ChatError> {
    let (_, model, messages) = prepare(&state, body)?;
    let events = deliver(async move { model.stream(&messages).await });
    Ok(sse_response(events).into_response())
}
