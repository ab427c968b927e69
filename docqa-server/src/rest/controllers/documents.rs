//! Document upload and ingestion.

use std::path::{Path, PathBuf};

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::status_for;
use crate::state::AppState;

/// Multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Serialize)]
pub struct InsertResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub document_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
}

type InsertError = (StatusCode, Json<InsertResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> InsertError {
    (status, Json(InsertResponse { success: false, message: message.into(), ..Default::default() }))
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Longest upload name kept, in bytes. Chunk ids are built from the stored
/// name and have to fit the store's 255-byte primary key.
pub const MAX_FILE_NAME_BYTES: usize = 128;

/// Keep only the final path component of a client-supplied name, shortened
/// to [`MAX_FILE_NAME_BYTES`] with its extension intact.
fn sanitize_file_name(name: Option<&str>) -> String {
    let name = name
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload");
    shorten_file_name(name, MAX_FILE_NAME_BYTES)
}

fn shorten_file_name(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    // The extension picks the parser, so it survives; the stem is cut.
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .filter(|e| e.len() < max)
        .unwrap_or_default();
    let stem = &name[..name.len() - ext.len()];
    let mut end = max - ext.len();
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{ext}", &stem[..end])
}

async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Upload, InsertError> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            reject(StatusCode::BAD_REQUEST, format!("failed to read upload: {}", e.body_text()))
        })?;
        let Some(mut field) = field else {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                format!("missing multipart field '{FILE_FIELD}'"),
            ));
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = sanitize_file_name(field.file_name());
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            reject(StatusCode::BAD_REQUEST, format!("failed to read upload: {}", e.body_text()))
        })? {
            if bytes.len() + chunk.len() > limit {
                return Err(reject(
                    StatusCode::BAD_REQUEST,
                    format!("file exceeds the upload limit of {:.2} MB", limit as f64 / (1 << 20) as f64),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(Upload { file_name, bytes });
    }
}

async fn persist(dir: &Path, upload: &Upload) -> Result<PathBuf, InsertError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        error!(dir = %dir.display(), error = %e, "failed to create upload directory");
        reject(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to create upload directory: {e}"))
    })?;

    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let path = dir.join(format!("{nanos}_{}", upload.file_name));
    tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to save upload");
        reject(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to save upload: {e}"))
    })?;
    Ok(path)
}

/// `POST /api/document/insert` and `POST /api/rag/insert`.
pub async fn insert_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<InsertResponse>, InsertError> {
    let upload = read_upload(&mut multipart, state.max_upload_bytes).await?;
    info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "received upload");

    let path = persist(&state.upload_dir, &upload).await?;
    let result = state.pipeline.ingest_file(&path).await;
    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(path = %path.display(), error = %e, "failed to remove temporary upload");
    }

    match result {
        Ok(report) => Ok(Json(InsertResponse {
            success: true,
            message: format!("document '{}' indexed", upload.file_name),
            chunk_count: Some(report.chunk_count),
            document_ids: report.document_ids,
        })),
        Err(e) => {
            error!(file_name = %upload.file_name, error = %e, "failed to index document");
            Err(reject(status_for(&e), format!("failed to index document: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_their_directories() {
        assert_eq!(sanitize_file_name(Some("../../etc/passwd")), "passwd");
        assert_eq!(sanitize_file_name(Some("notes.md")), "notes.md");
        assert_eq!(sanitize_file_name(Some("")), "upload");
        assert_eq!(sanitize_file_name(None), "upload");
    }

    #[test]
    fn long_names_are_shortened_keeping_the_extension() {
        let long = format!("{}.pdf", "r".repeat(300));
        let short = sanitize_file_name(Some(&long));
        assert_eq!(short.len(), MAX_FILE_NAME_BYTES);
        assert!(short.ends_with("r.pdf"));

        let accented = format!("{}.md", "é".repeat(100));
        let short = shorten_file_name(&accented, 20);
        assert!(short.len() <= 20);
        assert!(short.ends_with(".md"));
        assert!(short.starts_with('é'));

        assert_eq!(shorten_file_name("notes.txt", 20), "notes.txt");
    }
}
