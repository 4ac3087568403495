//! CLI-based extraction engine driving an external yt-dlp binary

use super::parser::{
    FILE_TEMPLATE, OutputLine, PROGRESS_TEMPLATE, TITLE_TEMPLATE, classify_failure,
    parse_output_line, parse_probe_json,
};
use super::selection::{fallback_selector, select_formats};
use super::traits::{EngineCapabilities, ExtractionEngine, FetchOutput, FetchRequest, ProgressSink};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept for error classification
const STDERR_TAIL: usize = 20;

/// CLI-based extraction engine using the external yt-dlp binary
///
/// Every probe and fetch runs a separate yt-dlp process. Processes are spawned
/// with `kill_on_drop`, so dropping a fetch future (cancellation, timeout)
/// terminates the child.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{CliEngine, ExtractionEngine};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let engine = CliEngine::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let engine = CliEngine::from_path().expect("yt-dlp not found in PATH");
///
/// let info = engine.probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
/// # Ok(())
/// # }
/// ```
pub struct CliEngine {
    binary_path: PathBuf,
    audio_format: String,
    extra_args: Vec<String>,
    probe_timeout: Duration,
}

impl CliEngine {
    /// Create a new CLI engine with an explicit binary path and default settings
    pub fn new(binary_path: PathBuf) -> Self {
        let defaults = EngineConfig::default();
        Self {
            binary_path,
            audio_format: defaults.audio_format,
            extra_args: defaults.extra_args,
            probe_timeout: defaults.probe_timeout,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build from configuration
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled. Returns `None` if no binary is available.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let binary_path = match &config.ytdlp_path {
            Some(path) => Some(path.clone()),
            None if config.search_path => which::which("yt-dlp").ok(),
            None => None,
        }?;

        Some(Self {
            binary_path,
            audio_format: config.audio_format.clone(),
            extra_args: config.extra_args.clone(),
            probe_timeout: config.probe_timeout,
        })
    }

    /// Path of the yt-dlp executable
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(["--no-warnings", "--no-playlist"])
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> crate::Error {
        EngineError::Process(format!(
            "Failed to execute {}: {}",
            self.binary_path.display(),
            e
        ))
        .into()
    }
}

#[async_trait]
impl ExtractionEngine for CliEngine {
    async fn probe(&self, url: &str) -> crate::Result<MediaInfo> {
        let mut cmd = self.command();
        cmd.args(["--dump-single-json", "--skip-download", "--"]).arg(url);

        let output = tokio::time::timeout(self.probe_timeout, cmd.output())
            .await
            .map_err(|_| {
                EngineError::Unavailable(format!(
                    "probe timed out after {}s",
                    self.probe_timeout.as_secs()
                ))
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&output.stderr)).into());
        }

        Ok(parse_probe_json(&output.stdout)?)
    }

    async fn fetch(&self, request: FetchRequest, sink: ProgressSink) -> crate::Result<FetchOutput> {
        let info = self.probe(&request.url).await?;
        sink.title(info.title.clone());

        let selector = select_formats(&info.formats, request.quality)
            .map(|s| s.format_arg())
            .unwrap_or_else(|| fallback_selector(request.quality));
        let template = request
            .output_dir
            .join(format!("%(title).150B [{}].%(ext)s", request.tag));

        debug!(url = %request.url, format = %selector, "starting yt-dlp fetch");

        let mut cmd = self.command();
        cmd.args(["--newline", "--progress", "--no-simulate"])
            .args(["--progress-template", PROGRESS_TEMPLATE])
            .args(["--print", TITLE_TEMPLATE])
            .args(["--print", FILE_TEMPLATE])
            .arg("-f")
            .arg(&selector)
            .arg("-o")
            .arg(&template);
        if request.quality.is_audio_only() {
            cmd.args(["-x", "--audio-format", self.audio_format.as_str()]);
        }
        cmd.arg("--")
            .arg(&request.url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Process("yt-dlp stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Process("yt-dlp stderr not captured".into()))?;

        let (stdout_result, stderr_result) =
            tokio::join!(read_lines(stdout, &sink), read_lines(stderr, &sink));
        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;

        let stdout_result = stdout_result?;
        let stderr_result = stderr_result?;

        if !status.success() {
            let tail: Vec<String> = stderr_result.tail.into_iter().collect();
            return Err(classify_failure(&tail.join("\n")).into());
        }

        let path = stdout_result
            .file
            .or(stderr_result.file)
            .ok_or_else(|| EngineError::Decode("yt-dlp did not report an output file".into()))?;

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
        "cli-yt-dlp"
    }
}

#[derive(Default)]
struct StreamSummary {
    file: Option<PathBuf>,
    tail: VecDeque<String>,
}

/// Drain one output stream, forwarding marker lines to the sink
async fn read_lines<R>(reader: R, sink: &ProgressSink) -> std::io::Result<StreamSummary>
where
    R: AsyncRead + Unpin,
{
    let mut summary = StreamSummary::default();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        // Titles and paths are not guaranteed to be UTF-8
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw).into_owned();

        match parse_output_line(&line) {
            Some(OutputLine::Progress(event)) => sink.progress(event),
            Some(OutputLine::Title(title)) => sink.title(title),
            Some(OutputLine::File(path)) => summary.file = Some(path),
            None => {
                if summary.tail.len() == STDERR_TAIL {
                    summary.tail.pop_front();
                }
                summary.tail.push_back(line);
            }
        }
    }
    Ok(summary)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineUpdate;
    use crate::types::QualitySpec;

    #[test]
    fn from_config_prefers_explicit_path() {
        let config = EngineConfig {
            ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
            search_path: false,
            audio_format: "mp3".into(),
            ..Default::default()
        };

        let engine = CliEngine::from_config(&config).unwrap();
        assert_eq!(engine.binary_path(), &PathBuf::from("/opt/yt-dlp"));
        assert_eq!(engine.audio_format, "mp3");
        assert_eq!(engine.name(), "cli-yt-dlp");
    }

    #[test]
    fn from_config_without_path_or_search_is_none() {
        let config = EngineConfig {
            ytdlp_path: None,
            search_path: false,
            ..Default::default()
        };
        assert!(CliEngine::from_config(&config).is_none());
    }

    #[test]
    fn from_path_matches_which() {
        let found = which::which("yt-dlp").ok();
        let engine = CliEngine::from_path();
        assert_eq!(engine.map(|e| e.binary_path), found);
    }

    #[tokio::test]
    async fn missing_binary_is_a_process_error() {
        let engine = CliEngine::new(PathBuf::from("/nonexistent/yt-dlp-binary-xyz"));
        let result = engine.probe("https://example.com/v").await;
        assert!(matches!(
            result,
            Err(crate::Error::Engine(EngineError::Process(_)))
        ));

        let (sink, _rx) = ProgressSink::channel();
        let request = FetchRequest {
            url: "https://example.com/v".into(),
            quality: QualitySpec::Best,
            output_dir: std::env::temp_dir(),
            tag: "t".into(),
        };
        assert!(engine.fetch(request, sink).await.is_err());
    }

    #[tokio::test]
    async fn read_lines_forwards_markers_and_keeps_tail() {
        let output = b"[youtube] abc: Downloading webpage\n\
[media-dl:title] Clip\n\
[media-dl:progress] 10 100 NA 10.0%\n\
[media-dl:file] /dl/Clip [t].mp4\n\
ERROR: trailing\n";
        let (sink, mut rx) = ProgressSink::channel();

        let summary = read_lines(&output[..], &sink).await.unwrap();
        drop(sink);

        assert_eq!(summary.file, Some(PathBuf::from("/dl/Clip [t].mp4")));
        assert_eq!(summary.tail.len(), 2);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        assert!(matches!(&updates[0], EngineUpdate::Title(t) if t == "Clip"));
        assert!(matches!(&updates[1], EngineUpdate::Progress(p) if p.downloaded_bytes == Some(10)));
    }

    #[tokio::test]
    async fn read_lines_survives_invalid_utf8() {
        let mut output = b"[media-dl:title] Caf".to_vec();
        output.extend_from_slice(&[0xE9, b'\r', b'\n']);
        output.extend_from_slice(b"junk \xFF\xFE bytes\n");
        output.extend_from_slice(b"[media-dl:file] /dl/Clip [t].mp4");
        let (sink, mut rx) = ProgressSink::channel();

        let summary = read_lines(&output[..], &sink).await.unwrap();
        drop(sink);

        assert_eq!(summary.file, Some(PathBuf::from("/dl/Clip [t].mp4")));
        assert_eq!(summary.tail.len(), 1);
        assert!(summary.tail[0].starts_with("junk "));
        match rx.recv().await {
            Some(EngineUpdate::Title(title)) => assert_eq!(title, "Caf\u{FFFD}"),
            other => panic!("expected a title update, got {other:?}"),
        }
    }
}
