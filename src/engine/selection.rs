//! Stream selection policy
//!
//! Maps a [`QualitySpec`] onto the streams a probe reported:
//! - height bound: tallest video at or under the bound, either a combined
//!   stream or a video-only stream paired with the best audio (combined wins
//!   ties); nothing under the bound falls back to `Best`
//! - `Best` / `Worst`: best / worst combined stream, then video + best audio,
//!   then whatever exists
//! - `AudioOnly`: highest-bitrate audio-only stream, else `Best`

use crate::types::{QualitySpec, StreamFormat};
use std::cmp::Ordering;

/// Streams chosen for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelection {
    /// One stream carrying everything needed
    Single(String),
    /// A video stream muxed with a separate audio stream
    Merged {
        /// Video format id
        video: String,
        /// Audio format id
        audio: String,
    },
}

impl FormatSelection {
    /// Render as a yt-dlp `-f` argument
    pub fn format_arg(&self) -> String {
        match self {
            FormatSelection::Single(id) => id.clone(),
            FormatSelection::Merged { video, audio } => format!("{video}+{audio}"),
        }
    }
}

/// Pick streams for `quality` from the probed `formats`
///
/// Returns `None` only when `formats` holds nothing usable.
pub fn select_formats(formats: &[StreamFormat], quality: QualitySpec) -> Option<FormatSelection> {
    match quality {
        QualitySpec::Best => select_best(formats),
        QualitySpec::Worst => select_worst(formats),
        QualitySpec::MaxHeight(bound) => {
            select_at_most(formats, bound).or_else(|| select_best(formats))
        }
        QualitySpec::AudioOnly => best_audio(formats)
            .map(|f| FormatSelection::Single(f.format_id.clone()))
            .or_else(|| select_best(formats)),
    }
}

/// Format expression handed to yt-dlp when the probe listed no streams
pub fn fallback_selector(quality: QualitySpec) -> String {
    match quality {
        QualitySpec::Best => "best".to_string(),
        QualitySpec::Worst => "worst".to_string(),
        QualitySpec::MaxHeight(h) => {
            format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best")
        }
        QualitySpec::AudioOnly => "bestaudio/best".to_string(),
    }
}

fn rank(a: &StreamFormat, b: &StreamFormat) -> Ordering {
    a.height
        .unwrap_or(0)
        .cmp(&b.height.unwrap_or(0))
        .then_with(|| a.bitrate.unwrap_or(0.0).total_cmp(&b.bitrate.unwrap_or(0.0)))
}

fn best_audio(formats: &[StreamFormat]) -> Option<&StreamFormat> {
    formats
        .iter()
        .filter(|f| f.is_audio_only())
        .max_by(|a, b| a.bitrate.unwrap_or(0.0).total_cmp(&b.bitrate.unwrap_or(0.0)))
}

fn pair(video: &StreamFormat, formats: &[StreamFormat]) -> FormatSelection {
    match best_audio(formats) {
        Some(audio) => FormatSelection::Merged {
            video: video.format_id.clone(),
            audio: audio.format_id.clone(),
        },
        None => FormatSelection::Single(video.format_id.clone()),
    }
}

fn select_best(formats: &[StreamFormat]) -> Option<FormatSelection> {
    if let Some(combined) = formats.iter().filter(|f| f.is_combined()).max_by(|a, b| rank(a, b)) {
        return Some(FormatSelection::Single(combined.format_id.clone()));
    }
    if let Some(video) = formats.iter().filter(|f| f.is_video_only()).max_by(|a, b| rank(a, b)) {
        return Some(pair(video, formats));
    }
    best_audio(formats).map(|f| FormatSelection::Single(f.format_id.clone()))
}

fn select_worst(formats: &[StreamFormat]) -> Option<FormatSelection> {
    if let Some(combined) = formats.iter().filter(|f| f.is_combined()).min_by(|a, b| rank(a, b)) {
        return Some(FormatSelection::Single(combined.format_id.clone()));
    }
    if let Some(video) = formats.iter().filter(|f| f.is_video_only()).min_by(|a, b| rank(a, b)) {
        return Some(pair(video, formats));
    }
    formats
        .iter()
        .filter(|f| f.has_audio || f.has_video)
        .min_by(|a, b| rank(a, b))
        .map(|f| FormatSelection::Single(f.format_id.clone()))
}

fn select_at_most(formats: &[StreamFormat], bound: u32) -> Option<FormatSelection> {
    let fits = |f: &&StreamFormat| f.height.is_some_and(|h| h <= bound);

    let combined = formats
        .iter()
        .filter(|f| f.is_combined())
        .filter(fits)
        .max_by(|a, b| rank(a, b));
    let video = formats
        .iter()
        .filter(|f| f.is_video_only())
        .filter(fits)
        .max_by(|a, b| rank(a, b));

    match (combined, video) {
        (Some(c), Some(v)) if v.height > c.height => Some(pair(v, formats)),
        (Some(c), _) => Some(FormatSelection::Single(c.format_id.clone())),
        (None, Some(v)) => Some(pair(v, formats)),
        (None, None) => None,
    }
}
