/*!
 * Pipeline orchestration: cue timing, serialization, file writing, and
 * caption muxing, with the status record advanced at every stage boundary.
 *
 * The orchestrator never retries the pure stages (re-running a deterministic
 * function cannot change its outcome); all rendering fallback behavior is
 * delegated to the muxer.
 */

use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

use crate::caption_muxer::{CaptionMuxer, MuxRequest, SubtitleType};
use crate::cue_timer::generate_cues;
use crate::engine::{EventSink, SubtitleStyle, TranscodeEngine};
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::status_store::{PipelineStage, RecordPatch, StatusStore};
use crate::subtitle_renderer::{SubtitleDocument, SubtitleFormat};

/// Caller-supplied captioning parameters
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    // @field: Narration script
    pub script_text: String,

    // @field: Target video duration in seconds, must be positive
    pub video_duration_secs: f64,

    // @field: Subtitle output format
    pub format: SubtitleFormat,

    // @field: Requested rendering mode
    pub subtitle_type: SubtitleType,

    // @field: Styling for burned-in rendering
    pub style: SubtitleStyle,
}

/// One unit of pipeline work: a request plus the paths it owns.
///
/// Video and output paths are optional; leaving them unset makes this a
/// captions-only job that terminates after the subtitle file is written.
#[derive(Debug, Clone)]
pub struct CaptionJob {
    // @field: Status record identifier
    pub id: String,

    // @field: Captioning parameters
    pub request: CaptionRequest,

    // @field: Destination for the subtitle file
    pub subtitle_path: PathBuf,

    // @field: Source video, None for captions-only jobs
    pub video_path: Option<PathBuf>,

    // @field: Destination video, None for captions-only jobs
    pub output_path: Option<PathBuf>,

    // @field: Language tag for soft-track metadata
    pub language: String,
}

/// Successful pipeline result
#[derive(Debug, Clone)]
pub struct CaptionOutcome {
    /// Where the subtitle file was written
    pub subtitle_path: PathBuf,

    /// The serialized subtitle text
    pub subtitle_content: String,

    /// Format of the subtitle file
    pub format: SubtitleFormat,

    /// Captioned video path, when muxing ran
    pub video_with_subtitles: Option<PathBuf>,

    /// True when the output video carries no captions (copy fallback)
    pub degraded: bool,
}

/// Sequences the caption pipeline stages for one job at a time.
///
/// Multiple pipelines may run concurrently for independent jobs; the status
/// store is the only shared state and is updated per-id only.
#[derive(Debug)]
pub struct CaptionPipeline {
    // @field: Muxer owning the rendering fallback chain
    muxer: CaptionMuxer,

    // @field: External status record store
    store: Arc<dyn StatusStore>,
}

impl CaptionPipeline {
    pub fn new(engine: Arc<dyn TranscodeEngine>, store: Arc<dyn StatusStore>) -> Self {
        CaptionPipeline {
            muxer: CaptionMuxer::new(engine),
            store,
        }
    }

    /// Build a pipeline around an already-configured muxer
    pub fn with_muxer(muxer: CaptionMuxer, store: Arc<dyn StatusStore>) -> Self {
        CaptionPipeline { muxer, store }
    }

    /// Run every stage of the pipeline for one job.
    ///
    /// On failure the status record is marked failed with the stage name and
    /// message before the error propagates. An empty cue sequence is not a
    /// failure: the subtitle file is still written with the format's empty
    /// rendition and the job continues.
    pub async fn run(
        &self,
        job: &CaptionJob,
        observer: EventSink,
    ) -> Result<CaptionOutcome, PipelineError> {
        let request = &job.request;

        if !(request.video_duration_secs > 0.0) {
            let error = PipelineError::InvalidInput(format!(
                "video duration must be positive, got {}",
                request.video_duration_secs
            ));
            self.record_failure(&job.id, &error).await;
            return Err(error);
        }

        // Stage: timing
        self.advance(&job.id, PipelineStage::Timing).await;
        let cues = match generate_cues(&request.script_text, request.video_duration_secs) {
            Ok(cues) => cues,
            Err(e) => return Err(self.fail(&job.id, "timing", e.to_string()).await),
        };
        if cues.is_empty() {
            info!("Job {}: script produced no captions", job.id);
        } else {
            debug!("Job {}: timed {} caption cue(s)", job.id, cues.len());
        }

        // Stage: serializing
        self.advance(&job.id, PipelineStage::Serializing).await;
        let document = SubtitleDocument::new(request.format, cues);
        let subtitle_content = document.render();

        // Stage: writing
        self.advance(&job.id, PipelineStage::Writing).await;
        if let Err(e) = FileManager::write_to_file(&job.subtitle_path, &subtitle_content) {
            return Err(self.fail(&job.id, "writing", e.to_string()).await);
        }
        self.store
            .update(
                &job.id,
                RecordPatch {
                    subtitle_path: Some(job.subtitle_path.clone()),
                    ..Default::default()
                },
            )
            .await;

        // Stage: muxing, skipped for captions-only jobs
        let (video_with_subtitles, degraded) =
            match (&job.video_path, &job.output_path) {
                (Some(video_path), Some(output_path)) => {
                    self.advance(&job.id, PipelineStage::Muxing).await;

                    let mux_request = MuxRequest {
                        input_video: video_path.clone(),
                        subtitle_path: job.subtitle_path.clone(),
                        output_path: output_path.clone(),
                        subtitle_type: request.subtitle_type,
                        style: request.style.clone(),
                        language: job.language.clone(),
                    };

                    match self.muxer.apply_captions(&mux_request, observer).await {
                        Ok(outcome) => {
                            self.store
                                .update(
                                    &job.id,
                                    RecordPatch {
                                        output_video: Some(outcome.output_path.clone()),
                                        ..Default::default()
                                    },
                                )
                                .await;
                            (Some(outcome.output_path), outcome.degraded)
                        }
                        Err(e) => {
                            self.record_failure(&job.id, &e).await;
                            return Err(e);
                        }
                    }
                }
                _ => (None, false),
            };

        self.advance(&job.id, PipelineStage::Completed).await;
        info!("Job {}: pipeline completed", job.id);

        Ok(CaptionOutcome {
            subtitle_path: job.subtitle_path.clone(),
            subtitle_content,
            format: request.format,
            video_with_subtitles,
            degraded,
        })
    }

    /// Move the status record to a new stage
    async fn advance(&self, id: &str, stage: PipelineStage) {
        debug!("Job {}: entering stage '{}'", id, stage);
        self.store.update(id, RecordPatch::stage(stage)).await;
    }

    /// Mark the record failed and build the matching error
    async fn fail(&self, id: &str, stage: &str, message: String) -> PipelineError {
        let error = PipelineError::StageFailed {
            stage: stage.to_string(),
            message,
        };
        self.record_failure(id, &error).await;
        error
    }

    /// Record a failure with the stage name it occurred in
    async fn record_failure(&self, id: &str, error: &PipelineError) {
        let message = match error {
            PipelineError::StageFailed { .. } => error.to_string(),
            _ => format!("Stage '{}' failed: {}", error.stage_name(), error),
        };
        self.store.update(id, RecordPatch::failed(message)).await;
    }
}
