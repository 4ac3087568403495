//! Artifact retrieval and purge handlers.

use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    body::Body,
    extract::{RawPathParams, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /files/:filename - Stream a produced artifact
///
/// The path segment is taken raw and URL-decoded exactly once before lookup.
#[utoipa::path(
    get,
    path = "/files/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "URL-encoded artifact file name, as reported in the job record")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Name escapes the download directory", body = crate::error::ApiError),
        (status = 404, description = "No such file", body = crate::error::ApiError)
    )
)]
pub async fn download_file(State(state): State<AppState>, params: RawPathParams) -> Response {
    let Some(raw) = params
        .iter()
        .find(|(key, _)| *key == "filename")
        .map(|(_, value)| value.to_string())
    else {
        return Error::Validation("file name is required".to_string()).into_response();
    };

    match serve_artifact(&state, &raw).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn serve_artifact(state: &AppState, raw: &str) -> crate::Result<Response> {
    let path = state.downloader.resolve_encoded_artifact(raw).await?;
    let (file, len) = state.downloader.open_artifact(&path).await?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(file = %filename, bytes = len, "Serving artifact");

    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| Error::Other(format!("invalid Content-Disposition header: {e}")))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| Error::Other(format!("failed to build response: {e}")))
}

/// `attachment` disposition with an ASCII fallback and the exact UTF-8 name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

/// DELETE /files - Delete every artifact and forget every job
#[utoipa::path(
    delete,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "Everything removed", body = crate::types::PurgeReport),
        (status = 409, description = "Jobs still pending or running", body = crate::error::ApiError),
        (status = 500, description = "Some entries could not be removed", body = crate::types::PurgeReport)
    )
)]
pub async fn purge_files(State(state): State<AppState>) -> Response {
    match state.downloader.purge().await {
        Ok(report) if report.complete() => (StatusCode::OK, Json(report)).into_response(),
        Ok(report) => (StatusCode::INTERNAL_SERVER_ERROR, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
