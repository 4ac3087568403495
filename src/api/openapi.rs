//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting yt-dlp download jobs, tracking their progress and retrieving the produced files",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::cancel_job,
        crate::api::routes::probe_media,

        // Files
        crate::api::routes::download_file,
        crate::api::routes::purge_files,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_capabilities,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::JobRecord,
        crate::types::QualityTier,
        crate::types::StreamFormat,
        crate::types::MediaInfo,
        crate::types::Event,
        crate::types::PurgeFailure,
        crate::types::PurgeReport,
        crate::types::Capabilities,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::PurgePolicy,
        crate::config::EngineConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::SubmitJobRequest,
        crate::api::routes::SubmitJobResponse,
        crate::api::routes::ProbeRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Download jobs - Submit, poll, cancel, and probe URLs"),
        (name = "files", description = "Artifacts - Retrieve produced files and purge the download directory"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
