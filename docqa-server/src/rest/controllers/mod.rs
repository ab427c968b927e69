pub mod chat;
pub mod collections;
pub mod documents;
pub mod health;
pub mod rag;

use axum::http::StatusCode;
use docqa_rag::RagError;

/// Input errors are the caller's fault; everything else is ours.
pub(crate) fn status_for(error: &RagError) -> StatusCode {
    if error.is_input_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR }
}
