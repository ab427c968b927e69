use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// The collection in use. Differs from `configured_collection` after a rename.
    pub collection: String,
    pub configured_collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let configured = state.reconciler.configured_name().to_string();
    let active = state.reconciler.active_collection().await;
    Json(HealthResponse {
        status: "ok",
        collection: active.as_ref().map(|a| a.name.clone()).unwrap_or_else(|| configured.clone()),
        configured_collection: configured,
        dimensions: active.map(|a| a.dimensions),
    })
}
