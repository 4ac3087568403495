//! Artifact retrieval and purge.

use crate::config::PurgePolicy;
use crate::error::{Error, Result};
use crate::types::{Event, PurgeFailure, PurgeReport};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::MediaDownloader;

/// How long a best-effort purge waits for cancelled runners
const PURGE_CANCEL_GRACE: Duration = Duration::from_secs(5);

impl MediaDownloader {
    /// Resolve an already-decoded artifact file name to its path
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for names that could leave the download directory,
    /// [`Error::NotFound`] when no such file exists.
    pub async fn resolve_artifact(&self, filename: &str) -> Result<PathBuf> {
        self.store.resolve(filename).await
    }

    /// Resolve a URL-encoded artifact file name (as taken from a request path)
    pub async fn resolve_encoded_artifact(&self, raw: &str) -> Result<PathBuf> {
        self.store.resolve_encoded(raw).await
    }

    /// Open a resolved artifact, returning the handle and its length in bytes
    pub async fn open_artifact(&self, path: &Path) -> Result<(tokio::fs::File, u64)> {
        self.store.open(path).await
    }

    /// Delete every artifact and forget every job
    ///
    /// What happens to in-flight jobs depends on `download.purge_policy`:
    /// - `reject_while_active`: fails with [`Error::PurgeRejected`] and changes nothing
    /// - `best_effort`: cancels them first, waits briefly for their runners, then purges
    ///
    /// Entries that cannot be deleted are listed in the report; the registry is
    /// cleared regardless. No job can be submitted while a purge runs.
    pub async fn purge(&self) -> Result<PurgeReport> {
        let _gate = self.job_control.purge_gate.write().await;

        let active = self.registry.count_active().await;
        if active > 0 {
            match self.config.download.purge_policy {
                PurgePolicy::RejectWhileActive => {
                    tracing::warn!(active, "Purge rejected, jobs still in flight");
                    return Err(Error::PurgeRejected { active });
                }
                PurgePolicy::BestEffort => {
                    let cancelled = self.cancel_all().await;
                    tracing::info!(cancelled, "Cancelled in-flight jobs before purge");
                    if tokio::time::timeout(PURGE_CANCEL_GRACE, self.wait_for_active_jobs())
                        .await
                        .is_err()
                    {
                        tracing::warn!("Runners still alive after grace period, purging anyway");
                    }
                }
            }
        }

        let mut report = match self.store.purge_all().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read download directory during purge");
                PurgeReport {
                    failures: vec![PurgeFailure {
                        path: self.store.root().to_path_buf(),
                        error: e.to_string(),
                    }],
                    ..Default::default()
                }
            }
        };
        report.cleared_jobs = self.registry.clear().await;

        tracing::info!(
            removed_files = report.removed_files,
            cleared_jobs = report.cleared_jobs,
            failures = report.failures.len(),
            "Purge complete"
        );
        self.emit_event(Event::Purged {
            removed_files: report.removed_files,
            cleared_jobs: report.cleared_jobs,
        });

        Ok(report)
    }
}
