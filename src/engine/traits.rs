//! Traits and types for extraction engines

use crate::progress::ProgressEvent;
use crate::types::{MediaInfo, QualitySpec};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// What a runner asks an engine to fetch
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL
    pub url: String,
    /// Requested quality
    pub quality: QualitySpec,
    /// Directory the artifact must be written into
    pub output_dir: PathBuf,
    /// Short unique tag to embed in the output file name
    ///
    /// Two jobs for the same URL must not write to the same file.
    pub tag: String,
}

/// Result of a successful fetch
#[must_use]
#[derive(Debug, Clone)]
pub struct FetchOutput {
    /// Path of the produced file
    pub path: PathBuf,
    /// Media title, if the engine learned it
    pub title: Option<String>,
}

/// Update streamed from an engine while it fetches
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    /// Transfer progress
    Progress(ProgressEvent),
    /// The media title became known
    Title(String),
}

/// Progress callback handed to [`ExtractionEngine::fetch`]
///
/// Reports never block and are silently dropped once the runner has stopped
/// listening.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<EngineUpdate>,
}

impl ProgressSink {
    /// Create a sink and the receiver the runner drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report transfer progress
    pub fn progress(&self, event: ProgressEvent) {
        self.tx.send(EngineUpdate::Progress(event)).ok();
    }

    /// Report the media title
    pub fn title(&self, title: impl Into<String>) {
        self.tx.send(EngineUpdate::Title(title.into())).ok();
    }
}

/// Capabilities of an engine implementation
#[derive(Debug, Clone, Copy)]
pub struct EngineCapabilities {
    /// Can probe URLs for metadata
    pub can_probe: bool,
    /// Can fetch media
    pub can_fetch: bool,
}

/// Media extraction engine
///
/// The job manager only needs two operations: probe a URL for metadata and
/// available streams, and fetch it at a requested quality into a directory
/// while streaming progress.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{CliEngine, ExtractionEngine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CliEngine::from_path().expect("yt-dlp not found in PATH");
///
/// let info = engine.probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
/// println!("{} offers {:?}", info.title, info.available_qualities);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Look up metadata and available streams for a URL
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Engine`] if the URL is unsupported, unreachable,
    /// or the engine output cannot be understood.
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo>;

    /// Fetch the media described by `request`, reporting progress to `sink`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Engine`] for engine-side failures and
    /// [`crate::Error::Io`] for local storage failures.
    async fn fetch(&self, request: FetchRequest, sink: ProgressSink) -> crate::Result<FetchOutput>;

    /// Query capabilities of this engine
    fn capabilities(&self) -> EngineCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
