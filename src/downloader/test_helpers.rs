//! Shared test helpers: a scriptable engine and MediaDownloader construction.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::engine::{
    EngineCapabilities, ExtractionEngine, FetchOutput, FetchRequest, FormatSelection,
    ProgressSink, select_formats,
};
use crate::error::EngineError;
use crate::progress::ProgressEvent;
use crate::types::{JobId, JobRecord, MediaInfo, StreamFormat, available_tiers};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::tempdir;

/// What a [`FakeEngine`] does when asked to fetch
#[derive(Clone, Debug)]
pub(crate) enum FakeMode {
    /// Report progress, write a file whose extension follows stream selection
    Produce,
    /// Like `Produce` but always write this extension
    ProduceWithExt(String),
    /// Write the file and also an extracted sibling with this extension
    ProduceWithSibling { ext: String, sibling_ext: String },
    /// Fail with `EngineError::Unavailable`
    Fail(String),
    /// Report one progress event, then never finish
    Hang,
}

/// Scriptable engine that writes small files instead of downloading
pub(crate) struct FakeEngine {
    pub(crate) title: String,
    pub(crate) formats: Vec<StreamFormat>,
    pub(crate) progress: Vec<ProgressEvent>,
    pub(crate) mode: FakeMode,
    requests: std::sync::Mutex<Vec<FetchRequest>>,
    /// Set once a hanging fetch future has been dropped
    pub(crate) dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn combined(id: &str, height: u32) -> StreamFormat {
    StreamFormat {
        format_id: id.to_string(),
        ext: "mp4".to_string(),
        height: Some(height),
        has_video: true,
        has_audio: true,
        bitrate: Some(height as f64),
    }
}

pub(crate) fn video_only(id: &str, height: u32) -> StreamFormat {
    StreamFormat {
        format_id: id.to_string(),
        ext: "webm".to_string(),
        height: Some(height),
        has_video: true,
        has_audio: false,
        bitrate: Some(height as f64 * 2.0),
    }
}

pub(crate) fn audio_only(id: &str, ext: &str, bitrate: f64) -> StreamFormat {
    StreamFormat {
        format_id: id.to_string(),
        ext: ext.to_string(),
        height: None,
        has_video: false,
        has_audio: true,
        bitrate: Some(bitrate),
    }
}

pub(crate) fn progress(downloaded: u64, total: u64) -> ProgressEvent {
    ProgressEvent {
        downloaded_bytes: Some(downloaded),
        total_bytes: Some(total),
        total_bytes_estimate: None,
        percent_label: None,
    }
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self {
            title: "Sample Clip".to_string(),
            formats: vec![
                combined("18", 360),
                combined("22", 720),
                audio_only("140", "m4a", 128.0),
            ],
            progress: vec![progress(25, 100), progress(50, 100), progress(100, 100)],
            mode: FakeMode::Produce,
            requests: std::sync::Mutex::new(Vec::new()),
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn with_formats(mut self, formats: Vec<StreamFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub(crate) fn with_progress(mut self, progress: Vec<ProgressEvent>) -> Self {
        self.progress = progress;
        self
    }

    pub(crate) fn with_mode(mut self, mode: FakeMode) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::new().with_mode(FakeMode::Fail(message.to_string()))
    }

    pub(crate) fn hanging() -> Self {
        Self::new().with_mode(FakeMode::Hang)
    }

    /// Requests received so far
    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Extension of the stream yt-dlp would have written for this quality
    fn selected_ext(&self, request: &FetchRequest) -> String {
        let find = |id: &str| {
            self.formats
                .iter()
                .find(|f| f.format_id == id)
                .map(|f| f.ext.clone())
        };
        match select_formats(&self.formats, request.quality) {
            Some(FormatSelection::Single(id)) => find(&id).unwrap_or_else(|| "mp4".into()),
            Some(FormatSelection::Merged { video, .. }) => {
                find(&video).unwrap_or_else(|| "mp4".into())
            }
            None => "mp4".to_string(),
        }
    }
}

#[async_trait]
impl ExtractionEngine for FakeEngine {
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo> {
        if let FakeMode::Fail(message) = &self.mode {
            return Err(EngineError::Unavailable(format!("{url}: {message}")).into());
        }
        Ok(MediaInfo {
            title: self.title.clone(),
            duration: Some(10.0),
            uploader: Some("tester".to_string()),
            thumbnail: None,
            available_qualities: available_tiers(&self.formats),
            formats: self.formats.clone(),
        })
    }

    async fn fetch(&self, request: FetchRequest, sink: ProgressSink) -> crate::Result<FetchOutput> {
        self.requests.lock().unwrap().push(request.clone());

        let ext = match &self.mode {
            FakeMode::Fail(message) => {
                sink.progress(progress(10, 100));
                return Err(EngineError::Unavailable(message.clone()).into());
            }
            FakeMode::Hang => {
                let _flag = DropFlag(self.dropped.clone());
                sink.title(self.title.clone());
                sink.progress(progress(10, 100));
                return std::future::pending::<crate::Result<FetchOutput>>().await;
            }
            FakeMode::ProduceWithExt(ext) => ext.clone(),
            FakeMode::ProduceWithSibling { ext, .. } => ext.clone(),
            FakeMode::Produce => self.selected_ext(&request),
        };

        sink.title(self.title.clone());
        for event in &self.progress {
            sink.progress(event.clone());
            tokio::task::yield_now().await;
        }

        let stem = format!("{} [{}]", self.title, request.tag);
        let path = request.output_dir.join(format!("{stem}.{ext}"));
        tokio::fs::write(&path, b"media bytes").await?;

        if let FakeMode::ProduceWithSibling { sibling_ext, .. } = &self.mode {
            let sibling = request.output_dir.join(format!("{stem}.{sibling_ext}"));
            tokio::fs::write(&sibling, b"audio bytes").await?;
        }

        Ok(FetchOutput {
            path,
            title: Some(self.title.clone()),
        })
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_probe: true,
            can_fetch: true,
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Helper to create a test MediaDownloader backed by the default [`FakeEngine`].
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    create_test_downloader_with(Arc::new(FakeEngine::new()), |_| {}).await
}

/// Like [`create_test_downloader`] with a custom engine and config tweaks
pub(crate) async fn create_test_downloader_with(
    engine: Arc<FakeEngine>,
    configure: impl FnOnce(&mut Config),
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_jobs = 3;
    configure(&mut config);

    let downloader = MediaDownloader::with_engine(config, engine).await.unwrap();
    (downloader, temp_dir)
}

/// Poll until the job reaches a terminal state (panics after 5 seconds)
pub(crate) async fn wait_for_terminal(downloader: &MediaDownloader, id: &JobId) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = downloader.status(id).await;
        if record.is_terminal() {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} did not finish, last state {:?}",
            record.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the job is running (panics after 5 seconds)
pub(crate) async fn wait_for_running(downloader: &MediaDownloader, id: &JobId) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while downloader.status(id).await.status != crate::types::JobStatus::Running {
        assert!(tokio::time::Instant::now() < deadline, "job {id} never started");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Collect events until the job's Completed or Failed event (panics after 5 seconds)
pub(crate) async fn collect_events_until_terminal(
    events: &mut tokio::sync::broadcast::Receiver<crate::types::Event>,
    id: &JobId,
) -> Vec<crate::types::Event> {
    use crate::types::Event;

    let mut collected = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for job events")
            .expect("event channel closed");
        let done = matches!(
            &event,
            Event::Completed { id: done_id, .. } | Event::Failed { id: done_id, .. } if done_id == id
        );
        collected.push(event);
        if done {
            return collected;
        }
    }
}
