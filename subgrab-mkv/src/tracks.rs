//! Tracks element parsing, filtered to subtitle tracks.

use crate::ebml;
use crate::elements;

/// A subtitle track entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    /// Track number, as referenced by block headers and Cues.
    pub number: u64,
    /// Codec ID string, e.g. `S_TEXT/ASS`.
    pub codec_id: String,
    /// Codec private data; for text subtitle codecs this is the format
    /// header that precedes the cues.
    pub codec_private: Option<Vec<u8>>,
    /// Track language. BCP 47 wins over the legacy tag when both are
    /// present; `"und"` is normalized to `None`.
    pub language: Option<String>,
    /// Track name.
    pub name: Option<String>,
    /// Default block duration in nanoseconds.
    pub default_duration: Option<u64>,
}

/// Parse the body of a Tracks element, keeping only subtitle entries.
pub fn parse_tracks(data: &[u8]) -> Vec<SubtitleTrack> {
    let mut tracks = Vec::new();
    for (header, entry) in ebml::children(data, 0, data.len()) {
        if header.id != elements::TRACK_ENTRY {
            continue;
        }
        if let Some(track) = parse_track_entry(entry) {
            tracks.push(track);
        }
    }
    tracks
}

fn parse_track_entry(entry: &[u8]) -> Option<SubtitleTrack> {
    let mut number = 0u64;
    let mut track_type = 0u64;
    let mut codec_id = None;
    let mut codec_private = None;
    let mut language_legacy = None;
    let mut language_bcp47 = None;
    let mut name = None;
    let mut default_duration = None;

    for (header, data) in ebml::children(entry, 0, entry.len()) {
        match header.id {
            elements::TRACK_NUMBER => number = ebml::read_uint(data).ok()?,
            elements::TRACK_TYPE => track_type = ebml::read_uint(data).ok()?,
            elements::CODEC_ID => codec_id = ebml::read_string(data).ok(),
            elements::CODEC_PRIVATE => codec_private = Some(data.to_vec()),
            elements::LANGUAGE => language_legacy = ebml::read_string(data).ok(),
            elements::LANGUAGE_BCP47 => language_bcp47 = ebml::read_string(data).ok(),
            elements::NAME => name = ebml::read_string(data).ok(),
            elements::DEFAULT_DURATION => default_duration = ebml::read_uint(data).ok(),
            _ => {}
        }
    }

    if track_type != elements::TRACK_TYPE_SUBTITLE || number == 0 {
        return None;
    }

    let language = language_bcp47
        .or(language_legacy)
        .filter(|lang| !lang.is_empty() && lang != "und");

    Some(SubtitleTrack {
        number,
        codec_id: codec_id.unwrap_or_default(),
        codec_private,
        language,
        name: name.filter(|n| !n.is_empty()),
        default_duration,
    })
}
