use anyhow::{Result, anyhow};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

// @module: Word-count based caption timing

// @const: Sentence-terminal punctuation, runs collapse to one delimiter
static SENTENCE_SPLIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Reading rate used to estimate how long a caption stays on screen
pub const WORDS_PER_MINUTE: f64 = 180.0;

/// Pacing buffer applied on top of the raw word-count estimate
pub const PACING_BUFFER: f64 = 1.2;

/// Fixed gap between the end of one cue and the start of the next
pub const CUE_GAP_SECS: f64 = 0.5;

// @struct: Single timed caption
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    // @field: 1-based ordinal
    pub index: usize,

    // @field: Start offset in seconds
    pub start_secs: f64,

    // @field: End offset in seconds
    pub end_secs: f64,

    // @field: Display text, trimmed and non-empty
    pub text: String,
}

impl CaptionCue {
    pub fn new(index: usize, start_secs: f64, end_secs: f64, text: String) -> Self {
        CaptionCue {
            index,
            start_secs,
            end_secs,
            text,
        }
    }

    /// Width of the cue in seconds
    pub fn width_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Format the start offset with the given millisecond separator
    pub fn format_start(&self, millis_sep: char) -> String {
        Self::format_timestamp(self.start_secs, millis_sep)
    }

    /// Format the end offset with the given millisecond separator
    pub fn format_end(&self, millis_sep: char) -> String {
        Self::format_timestamp(self.end_secs, millis_sep)
    }

    /// Format an offset in seconds as HH:MM:SS?mmm.
    ///
    /// The millisecond fraction is floored, not rounded, so a cue ending at
    /// 1.9999s renders as 999ms rather than rolling over to the next second.
    pub fn format_timestamp(secs: f64, millis_sep: char) -> String {
        let secs = secs.max(0.0);
        let whole = secs.floor() as u64;
        let millis = ((secs - whole as f64) * 1000.0).floor() as u64;

        let hours = whole / 3600;
        let minutes = (whole % 3600) / 60;
        let seconds = whole % 60;

        format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, seconds, millis_sep, millis)
    }
}

impl fmt::Display for CaptionCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] {} --> {}: {}",
            self.index,
            self.format_start(','),
            self.format_end(','),
            self.text
        )
    }
}

/// Split a narration script into timed caption cues.
///
/// The script is split on sentence-terminal punctuation, each sentence gets a
/// duration derived from its word count at 180 words/minute with a 20% pacing
/// buffer, and cues are laid out left to right with a fixed half-second gap.
/// Cue end times are clamped to the video duration; sentences whose slot would
/// start at or past the end of the video are dropped rather than emitted as
/// zero-width cues.
///
/// A script with no sentences after trimming yields an empty sequence, which
/// callers treat as a non-fatal "no captions" outcome.
pub fn generate_cues(script_text: &str, video_duration_secs: f64) -> Result<Vec<CaptionCue>> {
    if !(video_duration_secs > 0.0) {
        return Err(anyhow!(
            "Video duration must be positive, got {}",
            video_duration_secs
        ));
    }

    let sentences: Vec<&str> = SENTENCE_SPLIT_REGEX
        .split(script_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        debug!("Script produced no sentences, returning empty cue sequence");
        return Ok(Vec::new());
    }

    let mut cues = Vec::with_capacity(sentences.len());
    let mut cursor = 0.0_f64;

    for sentence in &sentences {
        if cursor >= video_duration_secs {
            break;
        }

        let word_count = sentence.split_whitespace().count();
        let raw_duration = (word_count as f64 / WORDS_PER_MINUTE) * 60.0;
        let sentence_duration = raw_duration * PACING_BUFFER;

        let end = (cursor + sentence_duration).min(video_duration_secs);
        cues.push(CaptionCue::new(
            cues.len() + 1,
            cursor,
            end,
            (*sentence).to_string(),
        ));

        cursor = end + CUE_GAP_SECS;
    }

    let dropped = sentences.len() - cues.len();
    if dropped > 0 {
        warn!(
            "Dropped {} trailing sentence(s) that did not fit within {}s of video",
            dropped, video_duration_secs
        );
    }

    Ok(cues)
}
