//! No-op engine for graceful degradation

use super::traits::{EngineCapabilities, ExtractionEngine, FetchOutput, FetchRequest, ProgressSink};
use crate::error::EngineError;
use crate::types::MediaInfo;
use async_trait::async_trait;

const NOT_INSTALLED: &str = "media extraction requires the yt-dlp binary. \
     Configure engine.ytdlp_path or ensure yt-dlp is in PATH.";

/// Engine used when no yt-dlp binary is available or configured
///
/// Every operation fails with [`EngineError::NotInstalled`]. Jobs submitted
/// against it still run through the normal state machine and end up failed,
/// and the rest of the service (status, retrieval, purge) keeps working.
///
/// # Examples
///
/// ```
/// use media_dl::engine::{ExtractionEngine, NoOpEngine};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = NoOpEngine;
/// assert!(engine.probe("https://example.com/v").await.is_err());
/// assert!(!engine.capabilities().can_fetch);
/// # }
/// ```
pub struct NoOpEngine;

#[async_trait]
impl ExtractionEngine for NoOpEngine {
    async fn probe(&self, _url: &str) -> crate::Result<MediaInfo> {
        Err(EngineError::NotInstalled(NOT_INSTALLED.into()).into())
    }

    async fn fetch(&self, _request: FetchRequest, _sink: ProgressSink) -> crate::Result<FetchOutput> {
        Err(EngineError::NotInstalled(NOT_INSTALLED.into()).into())
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_probe: false,
            can_fetch: false,
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
