//! Common subtitle types shared by the assemblers.

use std::fmt;
use thiserror::Error;

/// Errors raised while interpreting subtitle payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubtitleError {
    /// An ASS/SSA block payload did not have the expected field layout.
    #[error("Invalid ASS block payload: {0}")]
    InvalidAssPayload(String),
}

/// Result type for subtitle operations.
pub type SubtitleResult<T> = Result<T, SubtitleError>;

/// Subtitle output formats, derived from the Matroska CodecID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    /// SubRip (.srt).
    Srt,
    /// Advanced SubStation Alpha (.ass).
    Ass,
    /// SubStation Alpha (.ssa).
    Ssa,
    /// WebVTT (.vtt).
    WebVtt,
}

impl SubtitleFormat {
    /// Map a Matroska CodecID to an output format.
    ///
    /// Unrecognized text codecs fall back to SRT assembly.
    pub fn from_codec_id(codec_id: &str) -> Self {
        match codec_id {
            "S_TEXT/UTF8" => SubtitleFormat::Srt,
            "S_TEXT/ASS" => SubtitleFormat::Ass,
            "S_TEXT/SSA" => SubtitleFormat::Ssa,
            "S_TEXT/WEBVTT" => SubtitleFormat::WebVtt,
            _ => SubtitleFormat::Srt,
        }
    }

    /// The typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::WebVtt => "vtt",
        }
    }

    /// Whether this format carries ASS/SSA styling (and therefore fonts).
    pub fn uses_fonts(&self) -> bool {
        matches!(self, SubtitleFormat::Ass | SubtitleFormat::Ssa)
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A timestamp with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    /// Total milliseconds from the start.
    pub milliseconds: u64,
}

impl Timestamp {
    /// Create a timestamp from total milliseconds.
    pub fn from_millis(milliseconds: u64) -> Self {
        Self { milliseconds }
    }

    /// Hours component.
    pub fn hours(&self) -> u64 {
        self.milliseconds / 3_600_000
    }

    /// Minutes component (0-59).
    pub fn minutes(&self) -> u64 {
        (self.milliseconds % 3_600_000) / 60_000
    }

    /// Seconds component (0-59).
    pub fn seconds(&self) -> u64 {
        (self.milliseconds % 60_000) / 1000
    }

    /// Milliseconds component (0-999).
    pub fn millis(&self) -> u64 {
        self.milliseconds % 1000
    }

    /// SRT format: `HH:MM:SS,mmm`.
    pub fn to_srt_string(&self) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis()
        )
    }

    /// WebVTT format: `HH:MM:SS.mmm`.
    pub fn to_vtt_string(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis()
        )
    }

    /// ASS format: `H:MM:SS.cc` (centiseconds, hours not zero-padded).
    pub fn to_ass_string(&self) -> String {
        format!(
            "{}:{:02}:{:02}.{:02}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis() / 10
        )
    }
}

/// One subtitle block extracted from a Matroska cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleBlock {
    /// Track the block belongs to.
    pub track_number: u64,
    /// Absolute presentation time in milliseconds.
    pub timestamp_ms: u64,
    /// Display duration in milliseconds, when the muxer wrote one.
    pub duration_ms: Option<u64>,
    /// The raw frame bytes (format-specific text payload).
    pub payload: Vec<u8>,
    /// BlockAdditional bytes (WebVTT cue identifier/settings/comments).
    pub additions: Option<Vec<u8>>,
}

impl SubtitleBlock {
    /// End time: start plus duration, with a zero duration when absent.
    pub fn end_ms(&self) -> u64 {
        self.timestamp_ms + self.duration_ms.unwrap_or(0)
    }
}
