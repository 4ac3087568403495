//! Parser for yt-dlp output
//!
//! The CLI engine asks yt-dlp to print machine-readable marker lines (see
//! [`PROGRESS_TEMPLATE`], [`TITLE_TEMPLATE`], [`FILE_TEMPLATE`]) alongside its
//! normal output. Lines without a marker are not ours and are ignored, apart
//! from `ERROR:` lines which feed [`classify_failure`].

use crate::error::EngineError;
use crate::progress::ProgressEvent;
use crate::types::{MediaInfo, StreamFormat, available_tiers};
use serde::Deserialize;
use std::path::PathBuf;

const PROGRESS_MARKER: &str = "[media-dl:progress]";
const TITLE_MARKER: &str = "[media-dl:title]";
const FILE_MARKER: &str = "[media-dl:file]";

/// `--progress-template` value producing progress marker lines
pub const PROGRESS_TEMPLATE: &str = "download:[media-dl:progress] %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress._percent_str)s";

/// `--print` value announcing the title before the download starts
pub const TITLE_TEMPLATE: &str = "before_dl:[media-dl:title] %(title)s";

/// `--print` value announcing the final file after post-processing
pub const FILE_TEMPLATE: &str = "after_move:[media-dl:file] %(filepath)s";

/// A marker line recognized in yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// Transfer progress
    Progress(ProgressEvent),
    /// Title announced before the download
    Title(String),
    /// Final file location
    File(PathBuf),
}

/// Parse one line of yt-dlp output
///
/// Returns `None` for lines that carry no marker.
pub fn parse_output_line(line: &str) -> Option<OutputLine> {
    let line = strip_ansi(line);
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return Some(OutputLine::Progress(parse_progress_fields(rest)));
    }
    if let Some(rest) = line.strip_prefix(TITLE_MARKER) {
        let title = rest.trim();
        return (!title.is_empty() && title != "NA").then(|| OutputLine::Title(title.to_string()));
    }
    if let Some(rest) = line.strip_prefix(FILE_MARKER) {
        let path = rest.trim();
        return (!path.is_empty() && path != "NA").then(|| OutputLine::File(PathBuf::from(path)));
    }
    None
}

fn parse_progress_fields(rest: &str) -> ProgressEvent {
    let mut fields = rest.split_whitespace();
    let downloaded_bytes = fields.next().and_then(parse_byte_count);
    let total_bytes = fields.next().and_then(parse_byte_count);
    let total_bytes_estimate = fields.next().and_then(parse_byte_count);

    let label = fields.collect::<Vec<_>>().join(" ");
    let percent_label = (!label.is_empty() && label != "NA").then_some(label);

    ProgressEvent {
        downloaded_bytes,
        total_bytes,
        total_bytes_estimate,
        percent_label,
    }
}

// yt-dlp prints "NA" for missing fields and floats for estimates
fn parse_byte_count(field: &str) -> Option<u64> {
    let value: f64 = field.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // CSI sequence: ESC [ params final-byte
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<f64>,
    tbr: Option<f64>,
    abr: Option<f64>,
    vbr: Option<f64>,
}

impl RawFormat {
    fn into_stream(self) -> Option<StreamFormat> {
        // An absent codec field means "unknown", not "none"
        let has_video = self.vcodec.as_deref() != Some("none");
        let has_audio = self.acodec.as_deref() != Some("none");
        if !has_video && !has_audio {
            // storyboards and similar
            return None;
        }

        Some(StreamFormat {
            format_id: self.format_id,
            ext: self.ext.unwrap_or_else(|| "unknown".to_string()),
            height: self.height.filter(|h| *h > 0.0).map(|h| h as u32),
            has_video,
            has_audio,
            bitrate: self.tbr.or(self.abr).or(self.vbr),
        })
    }
}

/// Parse the JSON document printed by `yt-dlp --dump-single-json`
pub fn parse_probe_json(stdout: &[u8]) -> Result<MediaInfo, EngineError> {
    let raw: RawInfo = serde_json::from_slice(stdout)
        .map_err(|e| EngineError::Decode(format!("probe output is not valid JSON: {e}")))?;

    let formats: Vec<StreamFormat> = raw
        .formats
        .into_iter()
        .filter_map(RawFormat::into_stream)
        .collect();

    Ok(MediaInfo {
        title: raw
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string()),
        duration: raw.duration,
        uploader: raw.uploader,
        thumbnail: raw.thumbnail,
        available_qualities: available_tiers(&formats),
        formats,
    })
}

/// Map yt-dlp's stderr from a failed run to an [`EngineError`]
pub fn classify_failure(stderr: &str) -> EngineError {
    let message = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("ERROR:"))
        .map(|m| m.trim().to_string())
        .or_else(|| {
            stderr
                .lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "yt-dlp exited unsuccessfully".to_string());

    let lower = message.to_lowercase();
    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        EngineError::Unsupported(message)
    } else if [
        "video unavailable",
        "private video",
        "not available",
        "has been removed",
        "http error",
        "unable to download",
        "urlopen error",
        "timed out",
        "name or service not known",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        EngineError::Unavailable(message)
    } else {
        EngineError::Process(message)
    }
}
