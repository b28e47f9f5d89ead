/*!
 * Tests for the caption muxer fallback chain
 */

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio_test::block_on;

use capflow::caption_muxer::{CaptionMuxer, MuxRequest, RenderStrategy, SubtitleType};
use capflow::engine::{EngineEvent, EventSink, SubtitleStyle, null_sink};
use capflow::errors::PipelineError;
use capflow::file_utils::FileManager;

use crate::common;
use crate::common::mock_engine::MockEngine;

fn mux_request(dir: &PathBuf, subtitle_type: SubtitleType) -> Result<MuxRequest> {
    let input_video = common::create_test_video(dir, "input.mp4")?;
    let subtitle_path = common::create_test_file(
        dir,
        "captions.srt",
        "1\n00:00:00,000 --> 00:00:01,000\nHello\n\n",
    )?;

    Ok(MuxRequest {
        input_video,
        subtitle_path,
        output_path: dir.join("output.mp4"),
        subtitle_type,
        style: SubtitleStyle::default(),
        language: "eng".to_string(),
    })
}

/// Test immediate failure when the input video is missing
#[test]
fn test_apply_captions_withMissingVideo_shouldFailWithoutFallback() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::succeeding());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine);

    let mut request = mux_request(&dir, SubtitleType::Hard)?;
    request.input_video = dir.join("missing.mp4");

    let result = block_on(muxer.apply_captions(&request, null_sink()));

    assert!(matches!(result, Err(PipelineError::MissingInput(_))));
    assert_eq!(tracker.lock().unwrap().burn_calls, 0);
    assert_eq!(tracker.lock().unwrap().track_calls, 0);
    Ok(())
}

/// Test immediate failure when the subtitle file is missing
#[test]
fn test_apply_captions_withMissingSubtitle_shouldFailWithoutFallback() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let muxer = CaptionMuxer::new(Arc::new(MockEngine::succeeding()));

    let mut request = mux_request(&dir, SubtitleType::Hard)?;
    request.subtitle_path = dir.join("missing.srt");

    let result = block_on(muxer.apply_captions(&request, null_sink()));

    assert!(matches!(result, Err(PipelineError::MissingInput(_))));
    Ok(())
}

/// Test the happy path: hard mode burns captions on the first attempt
#[test]
fn test_apply_captions_withHardModeSuccess_shouldBurnOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::succeeding());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine);

    let request = mux_request(&dir, SubtitleType::Hard)?;
    let outcome = block_on(muxer.apply_captions(&request, null_sink()))?;

    assert_eq!(outcome.strategy, RenderStrategy::Burn);
    assert!(!outcome.degraded);
    assert_eq!(FileManager::read_to_string(&outcome.output_path)?, "burned video");
    assert_eq!(tracker.lock().unwrap().burn_calls, 1);
    assert_eq!(tracker.lock().unwrap().track_calls, 0);
    Ok(())
}

/// Test the fallback scenario: burn fails, track succeeds, result is not degraded
#[test]
fn test_apply_captions_withBurnFailure_shouldFallBackToTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::failing_burn());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine);

    let request = mux_request(&dir, SubtitleType::Hard)?;
    let outcome = block_on(muxer.apply_captions(&request, null_sink()))?;

    assert_eq!(outcome.strategy, RenderStrategy::Track);
    assert!(!outcome.degraded);
    assert_eq!(tracker.lock().unwrap().burn_calls, 1);
    assert_eq!(tracker.lock().unwrap().track_calls, 1);
    Ok(())
}

/// Test the total-failure scenario: both modes fail, source is copied, degraded flag set
#[test]
fn test_apply_captions_withAllEngineFailures_shouldCopySourceDegraded() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let muxer = CaptionMuxer::new(Arc::new(MockEngine::failing_all()));

    let request = mux_request(&dir, SubtitleType::Hard)?;
    let outcome = block_on(muxer.apply_captions(&request, null_sink()))?;

    assert_eq!(outcome.strategy, RenderStrategy::Copy);
    assert!(outcome.degraded);
    // The output is a verbatim copy of the source video
    assert_eq!(
        FileManager::read_to_string(&outcome.output_path)?,
        FileManager::read_to_string(&request.input_video)?
    );
    Ok(())
}

/// Test soft mode skips the burn strategy entirely
#[test]
fn test_apply_captions_withSoftMode_shouldSkipBurn() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::succeeding());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine);

    let request = mux_request(&dir, SubtitleType::Soft)?;
    let outcome = block_on(muxer.apply_captions(&request, null_sink()))?;

    assert_eq!(outcome.strategy, RenderStrategy::Track);
    assert_eq!(tracker.lock().unwrap().burn_calls, 0);
    assert_eq!(tracker.lock().unwrap().track_calls, 1);
    Ok(())
}

/// Test the language tag is forwarded to the track strategy
#[test]
fn test_apply_captions_withSoftMode_shouldForwardLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::succeeding());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine);

    let mut request = mux_request(&dir, SubtitleType::Soft)?;
    request.language = "fra".to_string();
    block_on(muxer.apply_captions(&request, null_sink()))?;

    assert_eq!(tracker.lock().unwrap().last_language.as_deref(), Some("fra"));
    Ok(())
}

/// Test overridden time bounds are forwarded to the engine per strategy
#[test]
fn test_apply_captions_withCustomTimeouts_shouldForwardBoundsToEngine() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let engine = Arc::new(MockEngine::failing_burn());
    let tracker = engine.tracker();
    let muxer = CaptionMuxer::new(engine)
        .with_timeouts(Duration::from_secs(42), Duration::from_secs(7));

    let request = mux_request(&dir, SubtitleType::Hard)?;
    block_on(muxer.apply_captions(&request, null_sink()))?;

    let tracker = tracker.lock().unwrap();
    assert_eq!(tracker.last_burn_timeout, Some(Duration::from_secs(42)));
    assert_eq!(tracker.last_track_timeout, Some(Duration::from_secs(7)));
    Ok(())
}

/// Test engine events are forwarded to the observer across fallbacks
#[test]
fn test_apply_captions_withObserver_shouldForwardEvents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();

    let muxer = CaptionMuxer::new(Arc::new(MockEngine::failing_burn()));

    let events: Arc<Mutex<Vec<EngineEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink: EventSink = Arc::new(move |event| sink_events.lock().unwrap().push(event));

    let request = mux_request(&dir, SubtitleType::Hard)?;
    block_on(muxer.apply_captions(&request, sink))?;

    let events = events.lock().unwrap();
    let starts = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Started(_)))
        .count();
    let completions = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Completed(_)))
        .count();
    let failures = events
        .iter()
        .filter(|e| matches!(e, EngineEvent::Failed(_)))
        .count();

    // One started per attempted strategy, one failure from burn, one completion from track
    assert_eq!(starts, 2);
    assert_eq!(failures, 1);
    assert_eq!(completions, 1);
    Ok(())
}
