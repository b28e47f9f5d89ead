// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::caption_muxer::{CaptionMuxer, SubtitleType};
use crate::engine::{CaptionPosition, EngineEvent, EventSink, FfmpegEngine, SubtitleStyle, TranscodeEngine};
use crate::file_utils::FileManager;
use crate::pipeline::{CaptionJob, CaptionPipeline, CaptionRequest};
use crate::status_store::{JsonFileStatusStore, ProcessingRecord, StatusStore};
use crate::subtitle_renderer::SubtitleFormat;

mod app_config;
mod caption_muxer;
mod cue_timer;
mod engine;
mod errors;
mod file_utils;
mod pipeline;
mod status_store;
mod subtitle_renderer;

/// CLI Wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSubtitleFormat {
    Srt,
    Vtt,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(cli_format: CliSubtitleFormat) -> Self {
        match cli_format {
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
            CliSubtitleFormat::Vtt => SubtitleFormat::Vtt,
        }
    }
}

/// CLI Wrapper for SubtitleType to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSubtitleType {
    Hard,
    Soft,
}

impl From<CliSubtitleType> for SubtitleType {
    fn from(cli_type: CliSubtitleType) -> Self {
        match cli_type {
            CliSubtitleType::Hard => SubtitleType::Hard,
            CliSubtitleType::Soft => SubtitleType::Soft,
        }
    }
}

/// CLI Wrapper for CaptionPosition to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliCaptionPosition {
    Top,
    Bottom,
    Center,
}

impl From<CliCaptionPosition> for CaptionPosition {
    fn from(cli_position: CliCaptionPosition) -> Self {
        match cli_position {
            CliCaptionPosition::Top => CaptionPosition::Top,
            CliCaptionPosition::Bottom => CaptionPosition::Bottom,
            CliCaptionPosition::Center => CaptionPosition::Center,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Caption a video from a narration script (default command)
    Caption(CaptionArgs),

    /// Generate shell completions for capflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct CaptionArgs {
    /// Input video file to caption
    #[arg(value_name = "VIDEO_PATH")]
    video_path: Option<PathBuf>,

    /// Narration script file
    #[arg(short = 'i', long, conflicts_with = "script_text")]
    script: Option<PathBuf>,

    /// Narration script passed inline
    #[arg(long)]
    script_text: Option<String>,

    /// Video duration in seconds (probed from the video when omitted)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Subtitle output format
    #[arg(short = 'F', long, value_enum)]
    format: Option<CliSubtitleFormat>,

    /// Caption rendering mode
    #[arg(short, long, value_enum)]
    mode: Option<CliSubtitleType>,

    /// Font size for burned-in captions
    #[arg(long)]
    font_size: Option<u32>,

    /// Font color for burned-in captions
    #[arg(long)]
    font_color: Option<String>,

    /// Vertical caption placement
    #[arg(short, long, value_enum)]
    position: Option<CliCaptionPosition>,

    /// Write the subtitle file only, skip video muxing
    #[arg(long)]
    captions_only: bool,

    /// Output directory for subtitle and video files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// capflow - caption pipeline for narrated videos
///
/// Derives per-caption timing from a narration script, writes an SRT or
/// WebVTT subtitle file, and produces a captioned video through ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "capflow")]
#[command(version = "0.1.0")]
#[command(about = "Script-driven video captioning tool")]
#[command(long_about = "capflow turns a raw video plus a narration script into a captioned video.
Caption timing is estimated from word counts (180 words/minute with a 20%
pacing buffer); captions are burned into the pixels or attached as a
toggleable track, with automatic fallback when the preferred method fails.

EXAMPLES:
    capflow movie.mp4 -i script.txt                 # Burn captions using defaults
    capflow movie.mp4 -i script.txt -m soft         # Attach a toggleable track
    capflow movie.mp4 -i script.txt -F vtt          # Emit WebVTT instead of SRT
    capflow movie.mp4 --script-text 'He runs. He jumps!' -d 10
    capflow --captions-only --script-text 'Hi.' -d 5 # Subtitle file only
    capflow completions bash > capflow.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different config file with --config-path. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    caption: CaptionArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                color,
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "capflow", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Caption(args)) => run_caption(args).await,
        None => run_caption(cli.caption).await,
    }
}

async fn run_caption(options: CaptionArgs) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let config_level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level_filter(&config_level));
    }

    let config = load_config(&options)?;

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if options.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    let script_text = read_script(&options)?;

    let engine = Arc::new(FfmpegEngine::new(
        &config.engine.ffmpeg_path,
        &config.engine.ffprobe_path,
    ));
    let store: Arc<dyn StatusStore> =
        Arc::new(JsonFileStatusStore::open(config.records_path.clone()));

    // Resolve the duration: explicit flag wins, otherwise probe the video
    let duration_secs = match (options.duration, &options.video_path) {
        (Some(duration), _) => duration,
        (None, Some(video_path)) => {
            let probed = engine
                .probe_duration(video_path)
                .await
                .context("Failed to probe video duration")?;
            info!("Probed video duration: {:.2}s", probed);
            probed
        }
        (None, None) => {
            return Err(anyhow!(
                "--duration is required when no video file is given"
            ));
        }
    };

    let format = options
        .format
        .map(SubtitleFormat::from)
        .unwrap_or(config.subtitle.format);
    let subtitle_type = options
        .mode
        .map(SubtitleType::from)
        .unwrap_or(config.subtitle.subtitle_type);
    let style = SubtitleStyle {
        font_size: options.font_size.unwrap_or(config.subtitle.style.font_size),
        font_color: options
            .font_color
            .clone()
            .unwrap_or_else(|| config.subtitle.style.font_color.clone()),
        position: options
            .position
            .map(CaptionPosition::from)
            .unwrap_or(config.subtitle.style.position),
    };
    let output_dir = options.output_dir.unwrap_or_else(|| config.output_dir.clone());

    let id = uuid::Uuid::new_v4().to_string();
    let short_id = &id[..8];

    let base_name: &Path = options
        .video_path
        .as_deref()
        .unwrap_or_else(|| Path::new("captions"));
    let subtitle_path =
        FileManager::generate_output_path(base_name, &output_dir, short_id, format.extension());

    let mux = !options.captions_only && options.video_path.is_some();
    let output_path = if mux {
        let video_path = options.video_path.as_ref().unwrap();
        let extension = video_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        Some(FileManager::generate_output_path(
            video_path,
            &output_dir,
            "captioned",
            extension,
        ))
    } else {
        None
    };

    let record = ProcessingRecord::new(
        id.clone(),
        options.video_path.clone().unwrap_or_default(),
        duration_secs,
        script_text.clone(),
        format,
        subtitle_type,
    );
    store.insert(record).await;

    let job = CaptionJob {
        id,
        request: CaptionRequest {
            script_text,
            video_duration_secs: duration_secs,
            format,
            subtitle_type,
            style,
        },
        subtitle_path,
        video_path: if mux { options.video_path.clone() } else { None },
        output_path,
        language: config.language.clone(),
    };

    let muxer = CaptionMuxer::new(engine).with_timeouts(
        Duration::from_secs(config.engine.burn_timeout_secs),
        Duration::from_secs(config.engine.track_timeout_secs),
    );
    let pipeline = CaptionPipeline::with_muxer(muxer, store);
    let (observer, progress_bar) = progress_observer(mux);

    let outcome = pipeline
        .run(&job, observer)
        .await
        .map_err(|e| anyhow!("Caption pipeline failed: {}", e))?;

    if let Some(bar) = progress_bar {
        bar.finish_and_clear();
    }

    info!("Subtitle file: {:?}", outcome.subtitle_path);
    match &outcome.video_with_subtitles {
        Some(video) if outcome.degraded => {
            warn!(
                "Captions could not be applied; wrote a caption-less copy to {:?}",
                video
            );
        }
        Some(video) => info!("Captioned video: {:?}", video),
        None => {}
    }

    Ok(())
}

/// Load the configuration file, creating a default one when missing,
/// and fold CLI overrides into it
fn load_config(options: &CaptionArgs) -> Result<Config> {
    let config_path = &options.config_path;

    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path
        );

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        config
    };

    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

/// Resolve the narration script from a file or the inline flag
fn read_script(options: &CaptionArgs) -> Result<String> {
    match (&options.script, &options.script_text) {
        (Some(path), _) => FileManager::read_to_string(path),
        (None, Some(text)) => Ok(text.clone()),
        (None, None) => Err(anyhow!("Either --script or --script-text is required")),
    }
}

/// Build an engine-event observer that drives a progress bar during muxing
fn progress_observer(mux: bool) -> (EventSink, Option<ProgressBar>) {
    if !mux {
        return (crate::engine::null_sink(), None);
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let observer_bar = bar.clone();
    let sink: EventSink = Arc::new(move |event| match event {
        EngineEvent::Started(_) => observer_bar.set_message("Rendering captions"),
        EngineEvent::Progress(percent) => observer_bar.set_position(percent as u64),
        EngineEvent::Completed(_) => observer_bar.set_position(100),
        EngineEvent::Failed(_) => observer_bar.set_message("Falling back"),
    });

    (sink, Some(bar))
}
