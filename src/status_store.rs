/*!
 * Processing-record status store.
 *
 * Each pipeline invocation owns one record, updated at every stage boundary.
 * The store contract is forgiving: both lookups and updates on unknown ids
 * return None and never fail, so status reporting can never take down a run.
 */

use async_trait::async_trait;
use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::caption_muxer::SubtitleType;
use crate::subtitle_renderer::SubtitleFormat;

/// Stage a pipeline invocation is currently in
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    #[default]
    Queued,
    Timing,
    Serializing,
    Writing,
    Muxing,
    Completed,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Timing => "timing",
            Self::Serializing => "serializing",
            Self::Writing => "writing",
            Self::Muxing => "muxing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// One video's processing record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessingRecord {
    // @field: Unique identifier
    pub id: String,

    // @field: Source video path
    pub video_path: PathBuf,

    // @field: Target duration in seconds
    pub duration_secs: f64,

    // @field: Narration script
    pub script: String,

    // @field: Requested subtitle format
    pub format: SubtitleFormat,

    // @field: Requested rendering mode
    pub subtitle_type: SubtitleType,

    // @field: Subtitle file path once written
    #[serde(default)]
    pub subtitle_path: Option<PathBuf>,

    // @field: Output video path once muxing completes
    #[serde(default)]
    pub output_video: Option<PathBuf>,

    // @field: Current pipeline stage
    #[serde(default)]
    pub stage: PipelineStage,

    // @field: Failure message when stage is failed
    #[serde(default)]
    pub error: Option<String>,
}

impl ProcessingRecord {
    pub fn new(
        id: String,
        video_path: PathBuf,
        duration_secs: f64,
        script: String,
        format: SubtitleFormat,
        subtitle_type: SubtitleType,
    ) -> Self {
        ProcessingRecord {
            id,
            video_path,
            duration_secs,
            script,
            format,
            subtitle_type,
            subtitle_path: None,
            output_video: None,
            stage: PipelineStage::Queued,
            error: None,
        }
    }
}

/// Partial field set applied to a record in one update
#[derive(Debug, Default, Clone)]
pub struct RecordPatch {
    pub stage: Option<PipelineStage>,
    pub subtitle_path: Option<PathBuf>,
    pub output_video: Option<PathBuf>,
    pub error: Option<String>,
}

impl RecordPatch {
    /// Patch that only moves the record to a new stage
    pub fn stage(stage: PipelineStage) -> Self {
        RecordPatch {
            stage: Some(stage),
            ..Default::default()
        }
    }

    /// Patch that marks the record failed with a message
    pub fn failed(message: String) -> Self {
        RecordPatch {
            stage: Some(PipelineStage::Failed),
            error: Some(message),
            ..Default::default()
        }
    }

    fn apply(self, record: &mut ProcessingRecord) {
        if let Some(stage) = self.stage {
            record.stage = stage;
        }
        if let Some(path) = self.subtitle_path {
            record.subtitle_path = Some(path);
        }
        if let Some(path) = self.output_video {
            record.output_video = Some(path);
        }
        if let Some(error) = self.error {
            record.error = Some(error);
        }
    }
}

/// Common trait for status stores
#[async_trait]
pub trait StatusStore: Send + Sync + fmt::Debug {
    /// Look up a record by id, None for unknown ids
    async fn get(&self, id: &str) -> Option<ProcessingRecord>;

    /// Insert or replace a record
    async fn insert(&self, record: ProcessingRecord);

    /// Apply a partial update to the record with the given id.
    /// Returns the updated record, or None for unknown ids.
    async fn update(&self, id: &str, patch: RecordPatch) -> Option<ProcessingRecord>;
}

/// In-memory status store used by tests and single-shot CLI runs
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    records: Mutex<HashMap<String, ProcessingRecord>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn get(&self, id: &str) -> Option<ProcessingRecord> {
        self.records.lock().get(id).cloned()
    }

    async fn insert(&self, record: ProcessingRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Option<ProcessingRecord> {
        let mut records = self.records.lock();
        let record = records.get_mut(id)?;
        patch.apply(record);
        Some(record.clone())
    }
}

/// JSON-file backed status store.
///
/// Records are held in memory and flushed to a pretty-printed JSON file after
/// every mutation. A missing or unreadable file starts the store empty;
/// persistence failures are logged, never surfaced, per the store contract.
#[derive(Debug)]
pub struct JsonFileStatusStore {
    path: PathBuf,
    records: Mutex<HashMap<String, ProcessingRecord>>,
}

impl JsonFileStatusStore {
    pub fn open(path: PathBuf) -> Self {
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed record file {:?}: {}", path, e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        JsonFileStatusStore {
            path,
            records: Mutex::new(records),
        }
    }

    fn persist(&self, records: &HashMap<String, ProcessingRecord>) {
        let serialized = match serde_json::to_string_pretty(records) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize records: {}", e);
                return;
            }
        };

        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        if let Err(e) = std::fs::write(&self.path, serialized) {
            warn!("Failed to persist records to {:?}: {}", self.path, e);
        }
    }
}

#[async_trait]
impl StatusStore for JsonFileStatusStore {
    async fn get(&self, id: &str) -> Option<ProcessingRecord> {
        self.records.lock().get(id).cloned()
    }

    async fn insert(&self, record: ProcessingRecord) {
        let mut records = self.records.lock();
        records.insert(record.id.clone(), record);
        self.persist(&records);
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Option<ProcessingRecord> {
        let mut records = self.records.lock();
        let record = records.get_mut(id)?;
        patch.apply(record);
        let updated = record.clone();
        self.persist(&records);
        Some(updated)
    }
}
