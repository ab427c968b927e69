//! HTTP routes.

pub mod controllers;
pub mod sse;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use controllers::{chat, collections, documents, health, rag};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/document/insert", post(documents::insert_document))
        .route("/api/rag/insert", post(documents::insert_document))
        .route("/api/rag/ask", post(rag::ask))
        .route("/api/rag/ask/stream", post(rag::ask_stream))
        .route("/api/chat/test", post(chat::chat))
        .route("/api/chat/test/stream", post(chat::chat_stream))
        .route("/api/milvus/collections", get(collections::list_collections))
        .route("/api/milvus/collections/{name}", delete(collections::drop_collection))
        .layer(body_limit)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
