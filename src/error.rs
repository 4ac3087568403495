//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The crate-wide [`Error`] type and [`Result`] alias
//! - [`EngineError`] for failures raised by an extraction engine
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Each variant carries enough context to be reported to an API client without
/// further lookups.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Caller-supplied input was rejected (empty URL, malformed file name, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// The extraction engine failed to probe or fetch
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O error (disk full, permission denied, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job or artifact not found
    #[error("not found: {0}")]
    NotFound(String),

    /// A freshly generated job id was already registered
    #[error("job id collision: {0}")]
    IdCollision(String),

    /// Operation not allowed in the job's current state
    #[error("cannot {operation} job {id} in state {current_state}")]
    InvalidState {
        /// The job the operation targeted
        id: String,
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The state that prevents the operation (e.g., "completed")
        current_state: String,
    },

    /// Purge refused because jobs are still in flight
    #[error("purge rejected: {active} job(s) still pending or running")]
    PurgeRejected {
        /// Number of jobs that were pending or running when purge was requested
        active: usize,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Failures raised by an extraction engine
///
/// Inside a job runner these are caught and recorded on the job; they only reach
/// a caller directly through [`probe`](crate::MediaDownloader::probe).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine does not know how to handle the URL
    #[error("unsupported URL: {0}")]
    Unsupported(String),

    /// The media could not be reached (network error, removed video, geo block)
    #[error("media unavailable: {0}")]
    Unavailable(String),

    /// The engine process failed to run or exited unsuccessfully
    #[error("engine process failed: {0}")]
    Process(String),

    /// The engine's output could not be understood
    #[error("could not decode engine output: {0}")]
    Decode(String),

    /// No engine binary is installed or configured
    #[error("extraction engine not available: {0}")]
    NotInstalled(String),
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "purge_rejected",
///     "message": "purge rejected: 2 job(s) still pending or running",
///     "details": {
///       "active_jobs": 2
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 409 Conflict
            Error::InvalidState { .. } => 409,
            Error::PurgeRejected { .. } => 409,

            // 501 Not Implemented - no engine installed
            Error::Engine(EngineError::NotInstalled(_)) => 501,

            // 502 Bad Gateway - the engine or the remote site failed
            Error::Engine(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::IdCollision(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Engine(e) => match e {
                EngineError::Unsupported(_) => "unsupported_url",
                EngineError::Unavailable(_) => "media_unavailable",
                EngineError::Process(_) => "engine_process_error",
                EngineError::Decode(_) => "engine_decode_error",
                EngineError::NotInstalled(_) => "engine_not_installed",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::IdCollision(_) => "id_collision",
            Error::InvalidState { .. } => "invalid_state",
            Error::PurgeRejected { .. } => "purge_rejected",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::InvalidState {
                id,
                operation,
                current_state,
            } => Some(serde_json::json!({
                "job_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::PurgeRejected { active } => Some(serde_json::json!({
                "active_jobs": active,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
