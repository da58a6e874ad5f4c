//! SRT (SubRip) assembly.
//!
//! SRT is the simplest of the supported outputs: a 1-based index, a timing
//! line in `HH:MM:SS,mmm --> HH:MM:SS,mmm` format, the text, and a blank
//! line separator.

use crate::types::{SubtitleBlock, Timestamp};

/// Assemble SRT text from extracted blocks.
///
/// Blocks are ordered by start timestamp. A block without a duration gets
/// an end time equal to its start; a zero-length payload becomes an entry
/// with empty text. Every entry, including the last, is followed by a
/// blank line.
pub fn assemble(blocks: &[SubtitleBlock]) -> Vec<u8> {
    let mut ordered: Vec<&SubtitleBlock> = blocks.iter().collect();
    ordered.sort_by_key(|b| b.timestamp_ms);

    let mut out = String::new();
    for (index, block) in ordered.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n",
            index + 1,
            Timestamp::from_millis(block.timestamp_ms).to_srt_string(),
            Timestamp::from_millis(block.end_ms()).to_srt_string()
        ));
        out.push_str(&String::from_utf8_lossy(&block.payload));
        out.push_str("\n\n");
    }

    out.into_bytes()
}
