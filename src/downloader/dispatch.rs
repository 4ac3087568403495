//! Job submission, probing and status queries.

use crate::error::{Error, Result};
use crate::types::{Event, JobId, JobRecord, MediaInfo, QualitySpec};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use super::MediaDownloader;

/// How many fresh ids submission tries before giving up
const MAX_ID_ATTEMPTS: usize = 8;

/// Process-wide submission counter
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generates job ids of the form `<millis>-<seq>-<url hash>-<nonce>` (all hex)
///
/// The sequence alone separates ids within one process; the timestamp, URL
/// hash and random nonce keep ids from different processes apart.
#[derive(Debug, Default)]
pub(crate) struct JobIdGenerator;

impl JobIdGenerator {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn next(&self, url: &str) -> JobId {
        let millis = Utc::now().timestamp_millis().max(0) as u64;
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let digest = Sha256::digest(url.as_bytes());
        let url_hash: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
        let nonce: u32 = rand::random();

        JobId(format!("{millis:x}-{seq:x}-{url_hash}-{nonce:08x}"))
    }
}

/// Trim and check a caller-supplied URL
pub(crate) fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("url is required".to_string()));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("invalid url '{trimmed}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(Error::Validation(format!(
            "unsupported url scheme '{other}', expected http or https"
        ))),
    }
}

impl MediaDownloader {
    /// Submit a job and return its id immediately
    ///
    /// `quality` is parsed leniently (see [`QualitySpec::parse`]); anything
    /// unrecognized means `best`. The fetch itself runs in a spawned task, so
    /// this returns before any engine, network or disk activity.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty or malformed URL (no job is created)
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has started
    /// - [`Error::IdCollision`] if no unused id could be generated
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(downloader: MediaDownloader) -> Result<()> {
    /// let id = downloader
    ///     .submit("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "720p")
    ///     .await?;
    /// println!("{:?}", downloader.status(&id).await.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, url: &str, quality: &str) -> Result<JobId> {
        let url = validate_url(url)?;
        let quality = QualitySpec::parse(quality);

        let _gate = self.job_control.purge_gate.read().await;
        if !self
            .job_control
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        // A record never becomes visible to `cancel` without its token
        let token = CancellationToken::new();
        let id = {
            let mut active_jobs = self.job_control.active_jobs.lock().await;
            let id = self.register(&url, quality).await?;
            active_jobs.insert(id.clone(), token.clone());
            id
        };

        tracing::info!(job_id = %id, url = %url, %quality, "Job queued");
        self.emit_event(Event::Queued {
            id: id.clone(),
            url: url.clone(),
            quality,
        });

        let downloader = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            downloader.run_job(job_id, url, quality, token).await;
        });

        Ok(id)
    }

    /// Insert a pending record under a fresh id, retrying on collision
    async fn register(&self, url: &str, quality: QualitySpec) -> Result<JobId> {
        let mut last_err = None;
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.id_gen.next(url);
            match self
                .registry
                .create(JobRecord::pending(id.clone(), url, quality))
                .await
            {
                Ok(()) => return Ok(id),
                Err(e @ Error::IdCollision(_)) => {
                    tracing::warn!(job_id = %id, attempt, "Job id collision, retrying");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::IdCollision("no id generated".to_string())))
    }

    /// Snapshot of a job
    ///
    /// Unknown ids (never submitted, or cleared by a purge) yield a record with
    /// status [`Unknown`](crate::JobStatus::Unknown) rather than an error.
    pub async fn status(&self, id: &JobId) -> JobRecord {
        self.registry.get(id).await
    }

    /// Snapshots of all known jobs, oldest first
    pub async fn list_jobs(&self) -> Vec<JobRecord> {
        self.registry.list().await
    }

    /// Ask the engine for metadata and the quality tiers a URL offers
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a bad URL, [`Error::Engine`] when the engine
    /// cannot handle it.
    pub async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let url = validate_url(url)?;
        tracing::debug!(url = %url, engine = self.engine.name(), "Probing url");
        self.engine.probe(&url).await
    }
}
