use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

const FILE_FIELD: &str = "pdfs";

/// `POST /upload`: saves every `pdfs` part to the upload directory, then
/// rebuilds the index from them.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut saved = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // Parts without a filename are form values, not files.
        let Some(raw_name) = field.file_name() else {
            continue;
        };
        let file_name = sanitize_file_name(raw_name);
        let data = field.bytes().await.map_err(multipart_error)?;

        let path = unique_upload_path(&state.paths.upload_dir, &file_name, &saved);
        save_upload(&path, &data).await?;
        tracing::info!("Saved upload {} ({} bytes)", path.display(), data.len());
        saved.push(path);
    }

    if saved.is_empty() {
        return Err(ApiError::BadRequest("No PDF files uploaded".to_string()));
    }

    let report = state.chatbot.ingest_pdfs(&saved).await?;

    Ok(Json(json!({
        "message": "PDFs processed and ingested successfully",
        "documents": report.files,
        "pages": report.pages,
        "chunks": report.chunks,
        "skipped": report.skipped,
    })))
}

async fn save_upload(path: &Path, data: &[u8]) -> Result<(), ApiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ApiError::internal)?;
    }
    tokio::fs::write(path, data)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to save {}: {}", path.display(), err)))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Keeps only the final path component of a client-supplied name.
fn sanitize_file_name(raw: &str) -> PathBuf {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .map(str::trim)
        .unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        return PathBuf::from(format!("{}.pdf", Uuid::new_v4()));
    }
    PathBuf::from(base)
}

/// Resolves `file_name` inside `dir`, adding a uuid suffix when the name is
/// taken on disk or earlier in the same request.
fn unique_upload_path(dir: &Path, file_name: &Path, taken: &[PathBuf]) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() && !taken.contains(&candidate) {
        return candidate;
    }

    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = match file_name.extension() {
        Some(ext) => format!("{}-{}.{}", stem, Uuid::new_v4(), ext.to_string_lossy()),
        None => format!("{}-{}", stem, Uuid::new_v4()),
    };
    dir.join(renamed)
}
