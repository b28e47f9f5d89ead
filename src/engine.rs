/*!
 * Transcoding engine abstraction and the ffmpeg-backed implementation.
 *
 * The engine is treated as a black-box executor: callers hand it input and
 * output paths plus mode-specific options, and receive an ordered event
 * stream (started, progress, completed/failed) through an observer sink.
 * Progress is advisory only; control flow never blocks on it.
 */

use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::errors::EngineError;

/// Event emitted while an engine job runs
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The engine process was started with the given command description
    Started(String),
    /// Advisory percent-complete update
    Progress(f32),
    /// The job finished and the output path holds the result
    Completed(PathBuf),
    /// The job failed with the given detail
    Failed(String),
}

/// Observer sink registered per engine invocation
pub type EventSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Sink that discards all events
pub fn null_sink() -> EventSink {
    Arc::new(|_| {})
}

/// Vertical caption placement for burned-in rendering
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    #[default]
    Bottom,
    Center,
}

impl CaptionPosition {
    /// ASS numpad alignment value for force_style
    fn alignment(&self) -> u8 {
        match self {
            Self::Top => 8,
            Self::Bottom => 2,
            Self::Center => 5,
        }
    }
}

impl fmt::Display for CaptionPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Center => "center",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CaptionPosition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "center" | "middle" => Ok(Self::Center),
            _ => Err(anyhow::anyhow!("Invalid caption position: {}", s)),
        }
    }
}

/// Styling options forwarded to the engine for burned-in captions
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubtitleStyle {
    // @field: Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: u32,

    // @field: Font color name or ASS color literal
    #[serde(default = "default_font_color")]
    pub font_color: String,

    // @field: Vertical placement
    #[serde(default)]
    pub position: CaptionPosition,
}

fn default_font_size() -> u32 {
    24
}

fn default_font_color() -> String {
    "white".to_string()
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        SubtitleStyle {
            font_size: default_font_size(),
            font_color: default_font_color(),
            position: CaptionPosition::default(),
        }
    }
}

impl SubtitleStyle {
    /// Build the libass force_style parameter for the subtitles filter
    pub fn force_style(&self) -> String {
        format!(
            "FontSize={},PrimaryColour={},Alignment={}",
            self.font_size,
            ass_color(&self.font_color),
            self.position.alignment()
        )
    }
}

/// Map a color name to an ASS &HBBGGRR& literal, passing through values
/// that already look like ASS color syntax
fn ass_color(color: &str) -> String {
    match color.to_lowercase().as_str() {
        "white" => "&HFFFFFF&".to_string(),
        "black" => "&H000000&".to_string(),
        "yellow" => "&H00FFFF&".to_string(),
        "red" => "&H0000FF&".to_string(),
        "green" => "&H00FF00&".to_string(),
        "blue" => "&HFF0000&".to_string(),
        "cyan" => "&HFFFF00&".to_string(),
        other if other.starts_with("&h") => color.to_string(),
        _ => "&HFFFFFF&".to_string(),
    }
}

/// Common trait for transcoding engines
///
/// This is the seam between the caption pipeline and the external media tool.
/// The production implementation shells out to ffmpeg; tests supply mocks
/// with scriptable per-mode outcomes.
#[async_trait]
pub trait TranscodeEngine: Send + Sync + fmt::Debug {
    /// Re-encode the video with the subtitle file composited as a pixel
    /// overlay, copying the audio stream unchanged.
    async fn burn_in(
        &self,
        input: &Path,
        subtitle: &Path,
        output: &Path,
        style: &SubtitleStyle,
        timeout: Duration,
        observer: EventSink,
    ) -> Result<(), EngineError>;

    /// Remux the video with the subtitle file attached as a selectable
    /// subtitle stream, copying all existing streams without re-encoding.
    async fn attach_track(
        &self,
        input: &Path,
        subtitle: &Path,
        output: &Path,
        language: &str,
        timeout: Duration,
        observer: EventSink,
    ) -> Result<(), EngineError>;

    /// Probe a media file for its duration in seconds
    async fn probe_duration(&self, input: &Path) -> Result<f64, EngineError>;
}

/// ffmpeg-backed transcoding engine
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    // @field: ffmpeg executable name or path
    ffmpeg_path: String,

    // @field: ffprobe executable name or path
    ffprobe_path: String,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: &str, ffprobe_path: &str) -> Self {
        FfmpegEngine {
            ffmpeg_path: ffmpeg_path.to_string(),
            ffprobe_path: ffprobe_path.to_string(),
        }
    }

    /// Run an ffmpeg invocation with a time bound, forwarding progress events.
    ///
    /// The process is spawned with `-progress pipe:1` so percent-complete can
    /// be derived from stdout key/value lines against the probed duration.
    /// Exceeding the bound kills the process and reports a timeout.
    async fn run(
        &self,
        args: Vec<String>,
        output: &Path,
        total_secs: Option<f64>,
        timeout: Duration,
        observer: EventSink,
    ) -> Result<(), EngineError> {
        let description = format!("{} {}", self.ffmpeg_path, args.join(" "));
        debug!("Running transcoder: {}", description);
        observer(EngineEvent::Started(description));

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            let sink = observer.clone();
            tokio::spawn(forward_progress(stdout, total_secs, sink));
        }

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf).await;
                buf
            })
        });

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let detail = format!("Failed to wait on transcoder process: {}", e);
                observer(EngineEvent::Failed(detail.clone()));
                return Err(EngineError::Spawn(detail));
            }
            Err(_) => {
                let _ = child.kill().await;
                let secs = timeout.as_secs();
                observer(EngineEvent::Failed(format!("timed out after {}s", secs)));
                return Err(EngineError::Timeout(secs));
            }
        };

        if !status.success() {
            let stderr_text = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            let filtered = filter_engine_stderr(&stderr_text);
            error!("Transcoder failed: {}", filtered);
            observer(EngineEvent::Failed(filtered.clone()));
            return Err(EngineError::Failed(filtered));
        }

        observer(EngineEvent::Completed(output.to_path_buf()));
        Ok(())
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn burn_in(
        &self,
        input: &Path,
        subtitle: &Path,
        output: &Path,
        style: &SubtitleStyle,
        timeout: Duration,
        observer: EventSink,
    ) -> Result<(), EngineError> {
        let total_secs = self.probe_duration(input).await.ok();

        let filter = format!(
            "subtitles={}:force_style='{}'",
            escape_filter_path(subtitle),
            style.force_style()
        );

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            filter,
            "-c:a".to_string(),
            "copy".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(args, output, total_secs, timeout, observer).await
    }

    async fn attach_track(
        &self,
        input: &Path,
        subtitle: &Path,
        output: &Path,
        language: &str,
        timeout: Duration,
        observer: EventSink,
    ) -> Result<(), EngineError> {
        let total_secs = self.probe_duration(input).await.ok();

        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-i".to_string(),
            subtitle.to_string_lossy().to_string(),
            "-map".to_string(),
            "0".to_string(),
            "-map".to_string(),
            "1:0".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-c:s".to_string(),
            subtitle_codec_for(output).to_string(),
            "-metadata:s:s:0".to_string(),
            format!("language={}", language),
            "-disposition:s:0".to_string(),
            "default".to_string(),
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
            output.to_string_lossy().to_string(),
        ];

        self.run(args, output, total_secs, timeout, observer).await
    }

    async fn probe_duration(&self, input: &Path) -> Result<f64, EngineError> {
        let ffprobe_future = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                input.to_str().unwrap_or_default(),
            ])
            .output();

        let timeout_duration = Duration::from_secs(60);
        let output = tokio::select! {
            result = ffprobe_future => {
                result.map_err(|e| EngineError::Spawn(format!("Failed to execute ffprobe: {}", e)))?
            },
            _ = tokio::time::sleep(timeout_duration) => {
                return Err(EngineError::Timeout(timeout_duration.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Failed(format!("ffprobe failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let json: Value = from_str(&stdout)
            .map_err(|e| EngineError::ParseError(format!("ffprobe JSON: {}", e)))?;

        json.get("format")
            .and_then(|f| f.get("duration"))
            .and_then(|d| d.as_str())
            .and_then(|d| d.parse::<f64>().ok())
            .ok_or_else(|| {
                EngineError::ParseError("ffprobe output missing format.duration".to_string())
            })
    }
}

/// Read `-progress pipe:1` key/value lines and forward percent updates.
///
/// The pipe is drained to end-of-stream even when no total duration is known,
/// otherwise ffmpeg dies on a broken pipe while writing progress; without a
/// total the percent computation is simply skipped.
async fn forward_progress(
    stdout: tokio::process::ChildStdout,
    total_secs: Option<f64>,
    observer: EventSink,
) {
    let total = total_secs.filter(|t| *t > 0.0);

    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        // out_time_ms is microseconds despite the name
        if let Some(value) = line.trim().strip_prefix("out_time_ms=") {
            if let (Some(total), Ok(micros)) = (total, value.parse::<i64>()) {
                if micros >= 0 {
                    let percent = ((micros as f64 / 1_000_000.0) / total * 100.0).clamp(0.0, 100.0);
                    observer(EngineEvent::Progress(percent as f32));
                }
            }
        }
    }
}

/// Pick the subtitle stream codec from the output container extension.
/// MP4-family containers need mov_text; Matroska and friends take SRT as-is.
fn subtitle_codec_for(output: &Path) -> &'static str {
    match output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp4") | Some("m4v") | Some("mov") => "mov_text",
        _ => "srt",
    }
}

/// Escape a path for use inside an ffmpeg filter argument
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('=', "\\=")
        .replace('\'', "\\'")
}

/// Filter ffmpeg stderr to only the meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
fn filter_engine_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Output #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !noise_prefixes.iter().any(|p| line.starts_with(p))
        })
        .collect();

    if meaningful.is_empty() {
        "unknown transcoder error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
