use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{EventSink, SubtitleStyle, TranscodeEngine};
use crate::errors::{EngineError, PipelineError};
use crate::file_utils::FileManager;

// @module: Caption application with layered rendering fallback

/// Time bound for the burned-in rendering strategy
pub const BURN_TIMEOUT_SECS: u64 = 600;

/// Time bound for the soft-track rendering strategy
pub const TRACK_TIMEOUT_SECS: u64 = 300;

/// Requested caption rendering mode
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleType {
    // @mode: Burned into the video pixels, always visible
    #[default]
    Hard,
    // @mode: Attached as a toggleable subtitle stream
    Soft,
}

impl fmt::Display for SubtitleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SubtitleType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hard" | "burned" => Ok(Self::Hard),
            "soft" | "track" => Ok(Self::Soft),
            _ => Err(anyhow::anyhow!("Invalid subtitle type: {}", s)),
        }
    }
}

/// One rendering strategy in the ordered fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Re-encode with captions composited into the pixels
    Burn,
    /// Remux with captions attached as a subtitle stream
    Track,
    /// Last resort: copy the source verbatim, captions absent
    Copy,
}

impl fmt::Display for RenderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Burn => "burn-in",
            Self::Track => "soft-track",
            Self::Copy => "copy",
        };
        write!(f, "{}", name)
    }
}

/// Inputs for one caption application
#[derive(Debug, Clone)]
pub struct MuxRequest {
    // @field: Source video
    pub input_video: PathBuf,

    // @field: Subtitle file written by the pipeline
    pub subtitle_path: PathBuf,

    // @field: Destination video
    pub output_path: PathBuf,

    // @field: Requested rendering mode
    pub subtitle_type: SubtitleType,

    // @field: Styling for burned-in rendering
    pub style: SubtitleStyle,

    // @field: Language tag for the attached track
    pub language: String,
}

/// Result of one caption application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxOutcome {
    /// Path holding the produced video
    pub output_path: PathBuf,

    /// The strategy that ultimately succeeded
    pub strategy: RenderStrategy,

    /// True when no captions could be applied and the source was copied
    pub degraded: bool,
}

/// Applies caption cues to a video through the transcoding engine.
///
/// Owns the retry/fallback policy: an ordered strategy list is tried in
/// sequence, stopping at the first success. A hard request degrades to a soft
/// track on failure or timeout, and a failed soft track degrades to a verbatim
/// copy of the source so the pipeline always terminates with playable output.
#[derive(Debug, Clone)]
pub struct CaptionMuxer {
    // @field: Engine collaborator
    engine: Arc<dyn TranscodeEngine>,

    // @field: Bound for the burn-in strategy
    burn_timeout: Duration,

    // @field: Bound for the soft-track strategy
    track_timeout: Duration,
}

impl CaptionMuxer {
    pub fn new(engine: Arc<dyn TranscodeEngine>) -> Self {
        CaptionMuxer {
            engine,
            burn_timeout: Duration::from_secs(BURN_TIMEOUT_SECS),
            track_timeout: Duration::from_secs(TRACK_TIMEOUT_SECS),
        }
    }

    /// Override the per-strategy time bounds with configured values
    pub fn with_timeouts(mut self, burn: Duration, track: Duration) -> Self {
        self.burn_timeout = burn;
        self.track_timeout = track;
        self
    }

    /// Apply captions to the source video, falling back through strategies.
    ///
    /// Missing input files fail immediately with no fallback. Otherwise the
    /// strategy chain runs to the first success; only exhaustion of every
    /// strategy (including the copy terminal) surfaces as an error.
    pub async fn apply_captions(
        &self,
        request: &MuxRequest,
        observer: EventSink,
    ) -> Result<MuxOutcome, PipelineError> {
        if !FileManager::file_exists(&request.input_video) {
            return Err(PipelineError::MissingInput(
                request.input_video.display().to_string(),
            ));
        }
        if !FileManager::file_exists(&request.subtitle_path) {
            return Err(PipelineError::MissingInput(
                request.subtitle_path.display().to_string(),
            ));
        }

        let strategies: &[RenderStrategy] = match request.subtitle_type {
            SubtitleType::Hard => &[RenderStrategy::Burn, RenderStrategy::Track, RenderStrategy::Copy],
            SubtitleType::Soft => &[RenderStrategy::Track, RenderStrategy::Copy],
        };

        let mut last_error: Option<String> = None;

        for strategy in strategies {
            debug!("Trying {} strategy for {:?}", strategy, request.output_path);

            match self.try_strategy(*strategy, request, observer.clone()).await {
                Ok(()) => {
                    let degraded = *strategy == RenderStrategy::Copy;
                    if degraded {
                        warn!(
                            "All caption strategies failed, copied source verbatim to {:?}",
                            request.output_path
                        );
                    } else {
                        info!("Applied captions via {} to {:?}", strategy, request.output_path);
                    }
                    return Ok(MuxOutcome {
                        output_path: request.output_path.clone(),
                        strategy: *strategy,
                        degraded,
                    });
                }
                Err(e) => {
                    warn!("{} strategy failed: {}", strategy, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(PipelineError::StageFailed {
            stage: "muxing".to_string(),
            message: last_error.unwrap_or_else(|| "no rendering strategy available".to_string()),
        })
    }

    async fn try_strategy(
        &self,
        strategy: RenderStrategy,
        request: &MuxRequest,
        observer: EventSink,
    ) -> Result<(), EngineError> {
        match strategy {
            RenderStrategy::Burn => {
                self.engine
                    .burn_in(
                        &request.input_video,
                        &request.subtitle_path,
                        &request.output_path,
                        &request.style,
                        self.burn_timeout,
                        observer,
                    )
                    .await
            }
            RenderStrategy::Track => {
                self.engine
                    .attach_track(
                        &request.input_video,
                        &request.subtitle_path,
                        &request.output_path,
                        &request.language,
                        self.track_timeout,
                        observer,
                    )
                    .await
            }
            RenderStrategy::Copy => copy_source(&request.input_video, &request.output_path),
        }
    }
}

/// Terminal fallback: reproduce the source verbatim at the output path
fn copy_source(input: &Path, output: &Path) -> Result<(), EngineError> {
    FileManager::copy_file(input, output).map_err(|e| EngineError::Failed(e.to_string()))
}
