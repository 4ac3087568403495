//! # media-dl
//!
//! Asynchronous media download job manager built on yt-dlp.
//!
//! Callers submit a URL and a quality selector, get a job id back at once, and
//! poll the job (or subscribe to events) while a background runner drives the
//! extraction engine. Completed jobs leave one file in a managed download
//! directory, retrievable by name.
//!
//! ## Design Philosophy
//!
//! - **Non-blocking submission** - `submit` registers the job and returns immediately
//! - **Isolated jobs** - one failing extraction never affects another job
//! - **Pluggable engine** - yt-dlp by default, any [`ExtractionEngine`] in tests or embeddings
//! - **Event-driven** - consumers subscribe to events instead of polling if they prefer
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     let id = downloader
//!         .submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "720p")
//!         .await?;
//!
//!     let mut events = downloader.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     println!("{:?}", downloader.status(&id).await);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Managed download directory
pub mod artifacts;
/// Configuration types
pub mod config;
/// Core job manager implementation (decomposed into focused submodules)
pub mod downloader;
/// Extraction engine abstraction and the yt-dlp implementation
pub mod engine;
/// Error types
pub mod error;
/// Progress normalization
pub mod progress;
/// In-memory job registry
pub mod registry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, EngineConfig, PurgePolicy};
pub use downloader::MediaDownloader;
pub use engine::{CliEngine, ExtractionEngine, NoOpEngine};
pub use error::{ApiError, EngineError, Error, ErrorDetail, Result, ToHttpStatus};
pub use types::{
    Capabilities, Event, JobId, JobRecord, JobStatus, MediaInfo, PurgeReport, QualitySpec,
    QualityTier, StreamFormat,
};

/// Helper function to run the job manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which cancels in-flight jobs.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = MediaDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
