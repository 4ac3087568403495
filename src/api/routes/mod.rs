//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Job submission, status, cancellation and probing
//! - [`files`] - Artifact retrieval and purge
//! - [`system`] - Health, capabilities, events, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod files;
mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobRequest {
    /// Media page URL (http or https)
    #[serde(default)]
    #[schema(example = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    pub url: String,
    /// Quality selector: "best", "worst", "audio", "720p", "1080"... (default: "best")
    #[serde(default)]
    #[schema(example = "720p")]
    pub quality: Option<String>,
}

/// Response for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobResponse {
    /// ID of the new job, used to poll `/jobs/{id}`
    pub job_id: crate::types::JobId,
}

/// Request body for POST /probe
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ProbeRequest {
    /// Media page URL (http or https)
    #[serde(default)]
    pub url: String,
}
