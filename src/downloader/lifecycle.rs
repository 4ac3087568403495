//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::MediaDownloader;

/// How long shutdown waits for cancelled runners to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl MediaDownloader {
    /// Gracefully shut down the job manager
    ///
    /// 1. Stops accepting new jobs ([`submit`](Self::submit) returns
    ///    [`ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Cancels every pending and running job
    /// 3. Waits up to 30 seconds for their runners to finish
    /// 4. Emits [`Event::Shutdown`]
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        {
            // Submissions past the check but not yet registered finish first
            let _gate = self.job_control.purge_gate.write().await;
            self.job_control.accepting_new.store(false, Ordering::SeqCst);
        }
        tracing::info!("Stopped accepting new jobs");

        let cancelled = self.cancel_all().await;
        tracing::info!(cancelled, "Signaled cancellation to all active jobs");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All job runners finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for job runners to finish, proceeding with shutdown")
            }
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.job_control.accepting_new.load(Ordering::SeqCst)
    }

    /// Wait until every runner has removed itself from the active map
    pub(crate) async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.job_control.active_jobs.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active jobs to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
