use anyhow::{Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cue_timer::CaptionCue;

// @module: Subtitle document rendering (SRT and WebVTT)

// @const: SRT timestamp line regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

/// Supported subtitle output formats
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    // @format: SubRip, comma millisecond separator, indexed blocks
    #[default]
    Srt,
    // @format: WebVTT, dot millisecond separator, WEBVTT header
    Vtt,
}

impl SubtitleFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }

    /// Millisecond separator used in this format's timestamps
    fn millis_sep(&self) -> char {
        match self {
            Self::Srt => ',',
            Self::Vtt => '.',
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            _ => Err(anyhow!("Invalid subtitle format: {}", s)),
        }
    }
}

/// An ordered cue sequence tagged with its output format.
///
/// Documents are produced once from the cue timer output and rendered wholesale;
/// they are never patched in place.
#[derive(Debug, Clone)]
pub struct SubtitleDocument {
    /// Output format tag
    pub format: SubtitleFormat,

    /// Ordered caption cues
    pub cues: Vec<CaptionCue>,
}

impl SubtitleDocument {
    pub fn new(format: SubtitleFormat, cues: Vec<CaptionCue>) -> Self {
        SubtitleDocument { format, cues }
    }

    /// Render the document to its textual subtitle form
    pub fn render(&self) -> String {
        match self.format {
            SubtitleFormat::Srt => render_srt(&self.cues),
            SubtitleFormat::Vtt => render_vtt(&self.cues),
        }
    }
}

/// Render cues as SubRip text. An empty cue sequence renders as an empty string.
pub fn render_srt(cues: &[CaptionCue]) -> String {
    let sep = SubtitleFormat::Srt.millis_sep();
    let mut out = String::new();

    for cue in cues {
        out.push_str(&cue.index.to_string());
        out.push('\n');
        out.push_str(&cue.format_start(sep));
        out.push_str(" --> ");
        out.push_str(&cue.format_end(sep));
        out.push('\n');
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }

    out
}

/// Render cues as WebVTT text. An empty cue sequence renders as the bare header.
pub fn render_vtt(cues: &[CaptionCue]) -> String {
    let sep = SubtitleFormat::Vtt.millis_sep();
    let mut out = String::from("WEBVTT\n\n");

    for cue in cues {
        out.push_str(&cue.format_start(sep));
        out.push_str(" --> ");
        out.push_str(&cue.format_end(sep));
        out.push('\n');
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }

    out
}

/// Parse SRT content back into caption cues.
///
/// Used to verify round-trip parseability of rendered output and to re-read
/// subtitle files written by earlier runs. Invalid blocks are skipped with a
/// warning rather than failing the whole parse.
pub fn parse_srt(content: &str) -> Result<Vec<CaptionCue>> {
    let mut cues = Vec::new();

    let mut current_index: Option<usize> = None;
    let mut current_times: Option<(f64, f64)> = None;
    let mut current_text = String::new();

    fn flush(
        index: &mut Option<usize>,
        times: &mut Option<(f64, f64)>,
        text: &mut String,
        cues: &mut Vec<CaptionCue>,
    ) {
        if let (Some(idx), Some((start, end))) = (index.take(), times.take()) {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                warn!("Skipping subtitle block {} with empty text", idx);
            } else if end <= start {
                warn!("Skipping subtitle block {} with non-positive width", idx);
            } else {
                cues.push(CaptionCue::new(idx, start, end, trimmed.to_string()));
            }
        }
        text.clear();
    }

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            flush(&mut current_index, &mut current_times, &mut current_text, &mut cues);
            continue;
        }

        if current_index.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_index = Some(num);
                continue;
            }
        }

        if current_index.is_some() && current_times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                let start = capture_to_secs(&caps, 1);
                let end = capture_to_secs(&caps, 5);
                current_times = Some((start, end));
                continue;
            }
        }

        if current_times.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!("Unexpected text before index or timestamp: {}", trimmed);
        }
    }

    flush(&mut current_index, &mut current_times, &mut current_text, &mut cues);

    Ok(cues)
}

/// Convert four numeric capture groups starting at `start_idx` to seconds
fn capture_to_secs(caps: &regex::Captures, start_idx: usize) -> f64 {
    let part = |offset: usize| -> f64 {
        caps.get(start_idx + offset)
            .map_or(0.0, |m| m.as_str().parse::<f64>().unwrap_or(0.0))
    };

    part(0) * 3600.0 + part(1) * 60.0 + part(2) + part(3) / 1000.0
}
