//! Collection admin.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Default, Serialize)]
pub struct CollectionsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub collections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/milvus/collections`.
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionsResponse>, (StatusCode, Json<CollectionsResponse>)> {
    match state.vector_store.list_collections().await {
        Ok(collections) => {
            Ok(Json(CollectionsResponse { success: true, message: None, collections }))
        }
        Err(e) => {
            error!(error = %e, "failed to list collections");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CollectionsResponse {
                    success: false,
                    message: Some(format!("failed to list collections: {e}")),
                    collections: Vec::new(),
                }),
            ))
        }
    }
}

/// `DELETE /api/milvus/collections/{name}`. Releases, then drops.
pub async fn drop_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DropResponse>, (StatusCode, Json<DropResponse>)> {
    if name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(DropResponse { success: false, message: "collection name must not be empty".into() }),
        ));
    }

    state.reconciler.drop_collection(&name).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DropResponse { success: false, message: format!("failed to drop collection: {e}") }),
        )
    })?;

    Ok(Json(DropResponse { success: true, message: format!("collection '{name}' dropped") }))
}
