/*!
 * Tests for processing-record status stores
 */

use std::path::PathBuf;

use anyhow::Result;
use capflow::caption_muxer::SubtitleType;
use capflow::status_store::{
    InMemoryStatusStore, JsonFileStatusStore, PipelineStage, ProcessingRecord, RecordPatch,
    StatusStore,
};
use capflow::subtitle_renderer::SubtitleFormat;

use crate::common;

fn sample_record(id: &str) -> ProcessingRecord {
    ProcessingRecord::new(
        id.to_string(),
        PathBuf::from("video.mp4"),
        10.0,
        "He runs.".to_string(),
        SubtitleFormat::Srt,
        SubtitleType::Hard,
    )
}

/// Test lookups and updates on unknown ids return None without failing
#[tokio::test]
async fn test_store_withUnknownId_shouldReturnNone() {
    let store = InMemoryStatusStore::new();

    assert!(store.get("nope").await.is_none());
    assert!(store.update("nope", RecordPatch::stage(PipelineStage::Timing)).await.is_none());
}

/// Test insert followed by get round-trips the record
#[tokio::test]
async fn test_store_withInsert_shouldRoundTrip() {
    let store = InMemoryStatusStore::new();
    store.insert(sample_record("abc")).await;

    let record = store.get("abc").await.unwrap();
    assert_eq!(record.id, "abc");
    assert_eq!(record.stage, PipelineStage::Queued);
    assert!(record.subtitle_path.is_none());
}

/// Test partial updates only touch the patched fields
#[tokio::test]
async fn test_store_withPatch_shouldApplyOnlyPatchedFields() {
    let store = InMemoryStatusStore::new();
    store.insert(sample_record("abc")).await;

    let updated = store
        .update(
            "abc",
            RecordPatch {
                stage: Some(PipelineStage::Writing),
                subtitle_path: Some(PathBuf::from("out/captions.srt")),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.stage, PipelineStage::Writing);
    assert_eq!(updated.subtitle_path, Some(PathBuf::from("out/captions.srt")));
    assert_eq!(updated.script, "He runs.");
    assert!(updated.error.is_none());
}

/// Test the failed patch records stage and message together
#[tokio::test]
async fn test_store_withFailedPatch_shouldRecordStageAndMessage() {
    let store = InMemoryStatusStore::new();
    store.insert(sample_record("abc")).await;

    let updated = store
        .update("abc", RecordPatch::failed("disk full".to_string()))
        .await
        .unwrap();

    assert_eq!(updated.stage, PipelineStage::Failed);
    assert_eq!(updated.error.as_deref(), Some("disk full"));
}

/// Test the JSON store persists records across reopen
#[tokio::test]
async fn test_json_store_withReopen_shouldPersistRecords() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("records.json");

    {
        let store = JsonFileStatusStore::open(path.clone());
        store.insert(sample_record("abc")).await;
        store
            .update("abc", RecordPatch::stage(PipelineStage::Completed))
            .await;
    }

    let reopened = JsonFileStatusStore::open(path);
    let record = reopened.get("abc").await.unwrap();
    assert_eq!(record.stage, PipelineStage::Completed);
    Ok(())
}

/// Test a malformed record file starts the store empty instead of failing
#[tokio::test]
async fn test_json_store_withMalformedFile_shouldStartEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        &temp_dir.path().to_path_buf(),
        "records.json",
        "not json at all",
    )?;

    let store = JsonFileStatusStore::open(path);
    assert!(store.get("anything").await.is_none());
    Ok(())
}
