//! Job management handlers.

use super::{ProbeRequest, SubmitJobRequest, SubmitJobResponse};
use crate::api::AppState;
use crate::types::{JobId, JobStatus};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// POST /jobs - Submit a download job
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Response {
    let quality = request.quality.as_deref().unwrap_or("best");

    match state.downloader.submit(&request.url, quality).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Job submission rejected");
            e.into_response()
        }
    }
}

/// GET /jobs - List all known jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All jobs, oldest first", body = Vec<crate::types::JobRecord>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.list_jobs().await)
}

/// GET /jobs/:id - Get a job's current state
///
/// Unknown ids answer 404 with a record whose status is `unknown`, so pollers
/// can treat every response body the same way.
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job state", body = crate::types::JobRecord),
        (status = 404, description = "Unknown job (status `unknown`)", body = crate::types::JobRecord)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let record = state.downloader.status(&JobId::from(id)).await;

    let status = if record.status == JobStatus::Unknown {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    (status, Json(record)).into_response()
}

/// POST /jobs/:id/cancel - Cancel a pending or running job
#[utoipa::path(
    post,
    path = "/jobs/{id}/cancel",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 202, description = "Cancellation requested"),
        (status = 404, description = "Unknown job", body = crate::error::ApiError),
        (status = 409, description = "Job already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = JobId::from(id);

    match state.downloader.cancel(&id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({"status": "cancelling", "job_id": id})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /probe - Inspect a URL without downloading
#[utoipa::path(
    post,
    path = "/probe",
    tag = "jobs",
    request_body = ProbeRequest,
    responses(
        (status = 200, description = "Media metadata and offered quality tiers", body = crate::types::MediaInfo),
        (status = 400, description = "Missing or invalid URL", body = crate::error::ApiError),
        (status = 502, description = "Extraction failed", body = crate::error::ApiError)
    )
)]
pub async fn probe_media(
    State(state): State<AppState>,
    Json(request): Json<ProbeRequest>,
) -> Response {
    match state.downloader.probe(&request.url).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "Probe failed");
            e.into_response()
        }
    }
}
