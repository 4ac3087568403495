//! Helpers for waiting on job outcomes

use media_dl::{Config, Event, JobId, JobRecord, MediaDownloader};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::ScriptedEngine;

/// Result of waiting for a job to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Job completed successfully
    Completed,
    /// Job failed with error
    Failed(String),
    /// Timeout waiting for completion
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Downloader over a fresh temp directory and a [`ScriptedEngine`]
pub async fn create_downloader(
    configure: impl FnOnce(&mut Config),
) -> (MediaDownloader, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    configure(&mut config);

    let downloader = MediaDownloader::with_engine(config, Arc::new(ScriptedEngine::new()))
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Wait for the job's Completed or Failed event
///
/// Subscribe before submitting, or the event may already be gone.
pub async fn wait_for_completion(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: &JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed { id: event_id, .. }) if &event_id == id => {
                    return WaitResult::Completed;
                }
                Ok(Event::Failed { id: event_id, error }) if &event_id == id => {
                    return WaitResult::Failed(error);
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll until the job is running
pub async fn wait_for_running(downloader: &MediaDownloader, id: &JobId, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if downloader.status(id).await.status == media_dl::JobStatus::Running {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Assert the documented field invariants of a record
pub fn assert_record_consistent(record: &JobRecord) {
    use media_dl::JobStatus;

    assert_eq!(
        record.file_path.is_some(),
        record.status == JobStatus::Completed,
        "file_path must be set exactly when completed: {record:?}"
    );
    assert_eq!(
        record.error.is_some(),
        record.status == JobStatus::Failed,
        "error must be set exactly when failed: {record:?}"
    );
    assert!((0.0..=100.0).contains(&record.progress));
}
