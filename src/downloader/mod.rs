//! Core job manager implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`dispatch`] - Job submission, probing and status queries
//! - [`runner`] - Per-job state machine driving the extraction engine
//! - [`control`] - Job cancellation
//! - [`purge`] - Artifact retrieval and the purge operation
//! - [`lifecycle`] - Shutdown coordination

mod control;
mod dispatch;
mod lifecycle;
mod purge;
mod runner;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::engine::{CliEngine, ExtractionEngine, NoOpEngine};
use crate::error::{Error, Result};
use crate::registry::JobRegistry;
use crate::types::{Capabilities, Event, JobId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, RwLock, Semaphore, broadcast};
use tokio_util::sync::CancellationToken;

pub(crate) use dispatch::JobIdGenerator;

/// Job scheduling state shared by every clone of the downloader
#[derive(Clone)]
pub(crate) struct JobControl {
    /// Limits how many jobs fetch at once (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Cancellation tokens of jobs whose runner has not finished yet
    pub(crate) active_jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    /// Cleared during shutdown; submissions are rejected afterwards
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Submission holds this shared, purge holds it exclusively
    pub(crate) purge_gate: Arc<RwLock<()>>,
}

impl JobControl {
    fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            concurrent_limit: Arc::new(Semaphore::new(max_concurrent_jobs)),
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            purge_gate: Arc::new(RwLock::new(())),
        }
    }
}

/// Main job manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Job records, the single source of truth for job state
    pub(crate) registry: Arc<JobRegistry>,
    /// Managed artifact directory
    pub(crate) store: ArtifactStore,
    /// Extraction engine (trait object for pluggable implementations)
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Scheduling, cancellation and purge coordination
    pub(crate) job_control: JobControl,
    /// Job id source
    pub(crate) id_gen: Arc<JobIdGenerator>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// Creates the download directory and picks the extraction engine from the
    /// configuration: an explicit `engine.ytdlp_path`, else yt-dlp from PATH
    /// (when `engine.search_path` is set), else [`NoOpEngine`].
    pub async fn new(config: Config) -> Result<Self> {
        let engine: Arc<dyn ExtractionEngine> = match CliEngine::from_config(&config.engine) {
            Some(engine) => Arc::new(engine),
            None => {
                tracing::warn!("yt-dlp not found, jobs will fail until an engine is configured");
                Arc::new(NoOpEngine)
            }
        };

        Self::with_engine(config, engine).await
    }

    /// Create a MediaDownloader that uses the given engine
    pub async fn with_engine(config: Config, engine: Arc<dyn ExtractionEngine>) -> Result<Self> {
        if config.download.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("download.max_concurrent_jobs".to_string()),
            });
        }

        let store = ArtifactStore::new(config.download.download_dir.clone());
        store.ensure_dir().await?;

        let engine_caps = engine.capabilities();
        tracing::info!(
            engine = engine.name(),
            can_probe = engine_caps.can_probe,
            can_fetch = engine_caps.can_fetch,
            "Extraction engine initialized"
        );

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            store,
            engine,
            event_tx,
            job_control: JobControl::new(config.download.max_concurrent_jobs),
            config: Arc::new(config),
            id_gen: Arc::new(JobIdGenerator::new()),
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Query what the configured extraction engine can do
    pub fn capabilities(&self) -> Capabilities {
        let caps = self.engine.capabilities();
        Capabilities {
            engine: self.engine.name().to_string(),
            can_probe: caps.can_probe,
            can_fetch: caps.can_fetch,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// Events without subscribers are dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:6790).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
