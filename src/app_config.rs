use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::caption_muxer::{BURN_TIMEOUT_SECS, SubtitleType, TRACK_TIMEOUT_SECS};
use crate::engine::SubtitleStyle;
use crate::subtitle_renderer::SubtitleFormat;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory for subtitle and video outputs
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// JSON file holding processing records
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,

    /// Language tag written into attached subtitle tracks
    #[serde(default = "default_language")]
    pub language: String,

    /// Subtitle defaults
    #[serde(default)]
    pub subtitle: SubtitleConfig,

    /// Transcoding engine config
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_dir: default_output_dir(),
            records_path: default_records_path(),
            language: default_language(),
            subtitle: SubtitleConfig::default(),
            engine: EngineConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    // @validates: Configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(anyhow!("Language tag must not be empty"));
        }

        if self.engine.ffmpeg_path.trim().is_empty() {
            return Err(anyhow!("ffmpeg path must not be empty"));
        }

        if self.engine.ffprobe_path.trim().is_empty() {
            return Err(anyhow!("ffprobe path must not be empty"));
        }

        if self.engine.burn_timeout_secs == 0 || self.engine.track_timeout_secs == 0 {
            return Err(anyhow!("Engine timeouts must be positive"));
        }

        if self.subtitle.style.font_size == 0 {
            return Err(anyhow!("Font size must be positive"));
        }

        Ok(())
    }
}

/// Subtitle defaults applied when the CLI does not override them
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SubtitleConfig {
    // @field: Output format
    #[serde(default)]
    pub format: SubtitleFormat,

    // @field: Rendering mode
    #[serde(default, rename = "type")]
    pub subtitle_type: SubtitleType,

    // @field: Burn-in styling
    #[serde(default)]
    pub style: SubtitleStyle,
}

/// Transcoding engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    // @field: ffmpeg executable name or path
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    // @field: ffprobe executable name or path
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    // @field: Burn-in time bound in seconds
    #[serde(default = "default_burn_timeout_secs")]
    pub burn_timeout_secs: u64,

    // @field: Soft-track time bound in seconds
    #[serde(default = "default_track_timeout_secs")]
    pub track_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            burn_timeout_secs: default_burn_timeout_secs(),
            track_timeout_secs: default_track_timeout_secs(),
        }
    }
}

/// Log level setting
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_records_path() -> PathBuf {
    PathBuf::from("records.json")
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_burn_timeout_secs() -> u64 {
    BURN_TIMEOUT_SECS
}

fn default_track_timeout_secs() -> u64 {
    TRACK_TIMEOUT_SECS
}
