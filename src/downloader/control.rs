//! Job cancellation.

use crate::error::{Error, Result};
use crate::types::{JobId, JobStatus};

use super::MediaDownloader;

impl MediaDownloader {
    /// Cancel a pending or running job
    ///
    /// Signals the job's runner, which records the job as failed with a
    /// "cancelled" error and kills the engine process. The call returns as soon
    /// as the signal is sent.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the id is unknown
    /// - [`Error::InvalidState`] if the job already completed or failed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::*;
    /// # async fn example(downloader: MediaDownloader, id: JobId) -> Result<()> {
    /// downloader.cancel(&id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn cancel(&self, id: &JobId) -> Result<()> {
        let record = self.registry.get(id).await;

        match record.status {
            JobStatus::Unknown => Err(Error::NotFound(format!("job {id}"))),
            JobStatus::Completed | JobStatus::Failed => Err(Error::InvalidState {
                id: id.to_string(),
                operation: "cancel".to_string(),
                current_state: record.status.as_str().to_string(),
            }),
            JobStatus::Pending | JobStatus::Running => {
                let active_jobs = self.job_control.active_jobs.lock().await;
                if let Some(token) = active_jobs.get(id) {
                    token.cancel();
                    tracing::info!(job_id = %id, "Job cancellation requested");
                }
                Ok(())
            }
        }
    }

    /// Signal cancellation to every job whose runner is still alive
    ///
    /// Returns how many jobs were signalled.
    pub(crate) async fn cancel_all(&self) -> usize {
        let active_jobs = self.job_control.active_jobs.lock().await;
        tracing::debug!(active_count = active_jobs.len(), "Cancelling all active jobs");

        for (id, token) in active_jobs.iter() {
            tracing::debug!(job_id = %id, "Signaling cancellation");
            token.cancel();
        }
        active_jobs.len()
    }
}
