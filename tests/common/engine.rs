//! Scripted extraction engine for integration tests

use async_trait::async_trait;
use media_dl::engine::{
    EngineCapabilities, ExtractionEngine, FetchOutput, FetchRequest, ProgressSink,
};
use media_dl::progress::ProgressEvent;
use media_dl::types::available_tiers;
use media_dl::{EngineError, MediaInfo, QualitySpec, StreamFormat};
use std::time::Duration;

/// Engine that pretends to download by writing a small file
///
/// URLs containing `/gone` fail, URLs containing `/slow` take `slow_delay`.
pub struct ScriptedEngine {
    pub formats: Vec<StreamFormat>,
    pub slow_delay: Duration,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            formats: vec![
                format("18", "mp4", Some(360), true, true),
                format("22", "mp4", Some(720), true, true),
                format("137", "mp4", Some(1080), true, false),
                format("140", "m4a", None, false, true),
            ],
            slow_delay: Duration::from_secs(30),
        }
    }
}

pub fn format(
    id: &str,
    ext: &str,
    height: Option<u32>,
    has_video: bool,
    has_audio: bool,
) -> StreamFormat {
    StreamFormat {
        format_id: id.to_string(),
        ext: ext.to_string(),
        height,
        has_video,
        has_audio,
        bitrate: None,
    }
}

fn step(percent: u64) -> ProgressEvent {
    ProgressEvent {
        downloaded_bytes: Some(percent),
        total_bytes: Some(100),
        ..Default::default()
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    async fn probe(&self, url: &str) -> media_dl::Result<MediaInfo> {
        if url.contains("/gone") {
            return Err(EngineError::Unavailable(format!("{url}: video removed")).into());
        }
        Ok(MediaInfo {
            title: "Integration Clip".to_string(),
            duration: Some(3.0),
            uploader: None,
            thumbnail: None,
            available_qualities: available_tiers(&self.formats),
            formats: self.formats.clone(),
        })
    }

    async fn fetch(
        &self,
        request: FetchRequest,
        sink: ProgressSink,
    ) -> media_dl::Result<FetchOutput> {
        let info = self.probe(&request.url).await?;
        sink.title(info.title.clone());

        if request.url.contains("/slow") {
            sink.progress(step(5));
            tokio::time::sleep(self.slow_delay).await;
        }

        for percent in [20, 60, 100] {
            sink.progress(step(percent));
        }

        let ext = match request.quality {
            QualitySpec::AudioOnly => "m4a",
            _ => "mp4",
        };
        let path = request
            .output_dir
            .join(format!("{} [{}].{ext}", info.title, request.tag));
        tokio::fs::write(&path, request.url.as_bytes()).await?;

        Ok(FetchOutput {
            path,
            title: Some(info.title),
        })
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_probe: true,
            can_fetch: true,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
