//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use utoipa::ToSchema;

/// File extensions treated as audio containers
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "opus", "ogg", "oga", "flac", "wav"];

/// Unique identifier for a job
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Registered, waiting for a runner slot
    Pending,
    /// Fetching through the extraction engine
    Running,
    /// Artifact ready for retrieval
    Completed,
    /// Failed with error
    Failed,
    /// Sentinel for ids the registry does not hold (never stored)
    Unknown,
}

impl JobStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the job is still pending or running
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        }
    }
}

/// Requested output quality
///
/// Unrecognized input falls back to [`QualitySpec::Best`]; parsing never fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum QualitySpec {
    /// Best stream at or under this height in pixels
    MaxHeight(u32),
    /// Engine's best overall
    #[default]
    Best,
    /// Engine's worst overall
    Worst,
    /// Best audio-only stream
    AudioOnly,
}

impl QualitySpec {
    /// Parse a user-supplied quality string
    ///
    /// Accepts `best`, `worst`, `audio`/`audio-only`/`audio_only`/`bestaudio`,
    /// a bare height (`720`) or a height with a `p` suffix (`720p`).
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "best" => QualitySpec::Best,
            "worst" => QualitySpec::Worst,
            "audio" | "audio-only" | "audio_only" | "audioonly" | "bestaudio" => {
                QualitySpec::AudioOnly
            }
            other => {
                let digits = other.strip_suffix('p').unwrap_or(other);
                match digits.parse::<u32>() {
                    Ok(height) if height > 0 => QualitySpec::MaxHeight(height),
                    _ => QualitySpec::Best,
                }
            }
        }
    }

    /// Whether the job should produce an audio container
    pub fn is_audio_only(&self) -> bool {
        matches!(self, QualitySpec::AudioOnly)
    }
}

impl std::fmt::Display for QualitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualitySpec::MaxHeight(h) => write!(f, "{h}p"),
            QualitySpec::Best => f.write_str("best"),
            QualitySpec::Worst => f.write_str("worst"),
            QualitySpec::AudioOnly => f.write_str("audio-only"),
        }
    }
}

impl Serialize for QualitySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QualitySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(QualitySpec::parse(&raw))
    }
}

/// Quality tier offered to callers after probing a URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum QualityTier {
    /// Always offered
    #[serde(rename = "best")]
    Best,
    /// A combined stream at least 1080 pixels tall exists
    #[serde(rename = "1080p")]
    P1080,
    /// A combined stream at least 720 pixels tall exists
    #[serde(rename = "720p")]
    P720,
    /// An audio-only stream exists
    #[serde(rename = "audio-only")]
    AudioOnly,
}

impl QualityTier {
    /// The quality request that selects this tier
    pub fn to_quality(self) -> QualitySpec {
        match self {
            QualityTier::Best => QualitySpec::Best,
            QualityTier::P1080 => QualitySpec::MaxHeight(1080),
            QualityTier::P720 => QualitySpec::MaxHeight(720),
            QualityTier::AudioOnly => QualitySpec::AudioOnly,
        }
    }
}

/// One stream variant reported by the engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StreamFormat {
    /// Engine-specific format identifier
    pub format_id: String,
    /// Container extension (e.g., "mp4", "webm", "m4a")
    pub ext: String,
    /// Frame height in pixels, for video streams
    pub height: Option<u32>,
    /// Carries a video track
    pub has_video: bool,
    /// Carries an audio track
    pub has_audio: bool,
    /// Average bitrate in kbit/s, if known
    pub bitrate: Option<f64>,
}

impl StreamFormat {
    /// Video and audio in one stream
    pub fn is_combined(&self) -> bool {
        self.has_video && self.has_audio
    }

    /// Audio without video
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Video without audio
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }
}

/// Metadata returned by a probe
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MediaInfo {
    /// Media title
    pub title: String,
    /// Duration in seconds
    pub duration: Option<f64>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Quality tiers a caller can request
    pub available_qualities: Vec<QualityTier>,
    /// Raw stream variants
    pub formats: Vec<StreamFormat>,
}

/// Derive the tiers to offer from the streams a source exposes
///
/// `best` is always offered. `1080p` and `720p` require a combined video+audio
/// stream at or above that height; `audio-only` requires an audio-only stream.
pub fn available_tiers(formats: &[StreamFormat]) -> Vec<QualityTier> {
    let tallest_combined = formats
        .iter()
        .filter(|f| f.is_combined())
        .filter_map(|f| f.height)
        .max()
        .unwrap_or(0);

    let mut tiers = vec![QualityTier::Best];
    if tallest_combined >= 1080 {
        tiers.push(QualityTier::P1080);
    }
    if tallest_combined >= 720 {
        tiers.push(QualityTier::P720);
    }
    if formats.iter().any(StreamFormat::is_audio_only) {
        tiers.push(QualityTier::AudioOnly);
    }
    tiers
}

/// Whether a path ends in an audio container extension
pub fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// State of one submitted job
///
/// `file_path` is set iff the job is completed and `error` is set iff it failed;
/// the transition methods below are the only way those fields are written.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobRecord {
    /// Job ID
    pub id: JobId,
    /// Source URL
    pub url: String,
    /// Requested quality
    #[schema(value_type = String, example = "720p")]
    pub quality: QualitySpec,
    /// Current status
    pub status: JobStatus,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f32,
    /// Engine-formatted progress estimate, when no numeric data is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_label: Option<String>,
    /// Media title, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Path of the produced artifact (completed jobs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// Artifact file name, as accepted by the retrieval endpoint (completed jobs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Failure cause (failed jobs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When the record last changed
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A fresh pending record
    pub fn pending(id: JobId, url: impl Into<String>, quality: QualitySpec) -> Self {
        let now = Utc::now();
        Self {
            id,
            url: url.into(),
            quality,
            status: JobStatus::Pending,
            progress: 0.0,
            progress_label: None,
            title: None,
            file_path: None,
            filename: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sentinel returned for ids the registry does not hold
    pub fn unknown(id: JobId) -> Self {
        let mut record = Self::pending(id, String::new(), QualitySpec::Best);
        record.status = JobStatus::Unknown;
        record
    }

    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending -> Running, progress reset to 0
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.progress = 0.0;
        self.progress_label = None;
        true
    }

    /// Record a progress update; ignored unless running
    ///
    /// A lower percentage than the current one is ignored, so progress never
    /// moves backwards.
    pub fn record_progress(&mut self, percent: Option<f32>, label: Option<String>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        let mut changed = false;
        if let Some(p) = percent {
            let p = p.clamp(0.0, 100.0);
            if p > self.progress {
                self.progress = p;
                changed = true;
            }
            if self.progress_label.take().is_some() {
                changed = true;
            }
        } else if let Some(label) = label
            && self.progress_label.as_deref() != Some(label.as_str())
        {
            self.progress_label = Some(label);
            changed = true;
        }
        changed
    }

    /// Set the title as soon as the engine reports it; ignored once terminal
    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        let title = title.into();
        if title.trim().is_empty() || self.title.as_deref() == Some(title.as_str()) {
            return false;
        }
        self.title = Some(title);
        true
    }

    /// Running -> Completed
    ///
    /// Refuses an empty path so a completed record always names an artifact.
    pub fn complete(&mut self, file_path: PathBuf, title: Option<String>) -> bool {
        if self.status != JobStatus::Running || file_path.as_os_str().is_empty() {
            return false;
        }
        self.filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        self.file_path = Some(file_path);
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            self.title = Some(title);
        }
        self.progress = 100.0;
        self.progress_label = None;
        self.error = None;
        self.status = JobStatus::Completed;
        true
    }

    /// Pending/Running -> Failed; progress is left at its last value
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.status.is_active() {
            return false;
        }
        let message = message.into();
        self.error = Some(if message.trim().is_empty() {
            "unknown error".to_string()
        } else {
            message
        });
        self.file_path = None;
        self.filename = None;
        self.status = JobStatus::Failed;
        true
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job registered
    Queued {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
        /// Requested quality
        #[schema(value_type = String)]
        quality: QualitySpec,
    },

    /// Runner started fetching
    Started {
        /// Job ID
        id: JobId,
    },

    /// Progress update
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
        /// Engine-formatted estimate, if that is all the engine reported
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    /// Media title became known
    TitleResolved {
        /// Job ID
        id: JobId,
        /// Media title
        title: String,
    },

    /// Job completed successfully
    Completed {
        /// Job ID
        id: JobId,
        /// Path of the produced artifact
        file_path: PathBuf,
        /// Media title, if known
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// All artifacts and job records were removed
    Purged {
        /// Number of directory entries deleted
        removed_files: usize,
        /// Number of job records cleared
        cleared_jobs: usize,
    },

    /// Manager is shutting down
    Shutdown,
}

/// One entry purge could not delete
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeFailure {
    /// Entry that could not be removed
    pub path: PathBuf,
    /// Why removal failed
    pub error: String,
}

/// Outcome of a purge
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct PurgeReport {
    /// Number of directory entries deleted
    pub removed_files: usize,
    /// Number of job records cleared
    pub cleared_jobs: usize,
    /// Entries that could not be deleted
    pub failures: Vec<PurgeFailure>,
}

impl PurgeReport {
    /// Whether every entry was removed
    pub fn complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What the configured extraction engine can do
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Engine implementation name
    pub engine: String,
    /// Whether probing works
    pub can_probe: bool,
    /// Whether fetching works
    pub can_fetch: bool,
}
