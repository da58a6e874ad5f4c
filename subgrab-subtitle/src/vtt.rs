//! WebVTT assembly.
//!
//! Matroska's `S_TEXT/WEBVTT` mapping stores the cue text as the block
//! payload and moves everything else into a BlockAdditional: line 1 is the
//! cue identifier, line 2 the cue settings, and any further lines are
//! comment blocks that preceded the cue in the original file.

use crate::types::{SubtitleBlock, Timestamp};

/// Header used when the track has no CodecPrivate.
const WEBVTT_HEADER: &str = "WEBVTT";

/// Assemble a WebVTT file from the CodecPrivate header and the extracted
/// blocks.
pub fn assemble(codec_private: Option<&[u8]>, blocks: &[SubtitleBlock]) -> Vec<u8> {
    let header = match codec_private {
        Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        None => WEBVTT_HEADER.to_string(),
    };

    let mut ordered: Vec<&SubtitleBlock> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.timestamp_ms);

    let mut out = String::new();
    out.push_str(header.trim_end());
    out.push_str("\n\n");

    for block in ordered {
        let (identifier, settings, comments) = parse_additions(block.additions.as_deref());

        for comment in &comments {
            out.push_str(comment);
            out.push('\n');
        }
        if !comments.is_empty() {
            out.push('\n');
        }

        if let Some(identifier) = identifier {
            out.push_str(identifier);
            out.push('\n');
        }

        out.push_str(&Timestamp::from_millis(block.timestamp_ms).to_vtt_string());
        out.push_str(" --> ");
        out.push_str(&Timestamp::from_millis(block.end_ms()).to_vtt_string());
        if let Some(settings) = settings {
            out.push(' ');
            out.push_str(settings);
        }
        out.push('\n');
        out.push_str(&String::from_utf8_lossy(&block.payload));
        out.push_str("\n\n");
    }

    out.into_bytes()
}

/// Split BlockAdditional bytes into (identifier, settings, comments).
fn parse_additions(additions: Option<&[u8]>) -> (Option<&str>, Option<&str>, Vec<&str>) {
    let Some(additions) = additions else {
        return (None, None, Vec::new());
    };
    // BlockAdditional is text by the WebVTT-in-Matroska mapping; treat
    // undecodable bytes as absent rather than corrupting the output.
    let Ok(text) = std::str::from_utf8(additions) else {
        return (None, None, Vec::new());
    };

    let mut lines = text.split('\n');
    let identifier = lines.next().map(str::trim_end).filter(|l| !l.is_empty());
    let settings = lines.next().map(str::trim_end).filter(|l| !l.is_empty());
    let comments: Vec<&str> = lines.map(str::trim_end).filter(|l| !l.is_empty()).collect();

    (identifier, settings, comments)
}
