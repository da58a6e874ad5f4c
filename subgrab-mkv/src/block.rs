//! Block framing: SimpleBlock / Block payload structure and BlockGroup
//! child collection.
//!
//! A block's data starts with the track number as a VINT, then a signed
//! 16-bit big-endian timestamp relative to the enclosing cluster, then one
//! flags byte, then the frame bytes.

use crate::ebml;
use crate::elements;
use crate::error::{MkvError, Result};

/// The fixed-position fields at the front of a SimpleBlock or Block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Track number (marker bit masked out).
    pub track_number: u64,
    /// Timestamp relative to the cluster, in raw units. Signed: `0x8000`
    /// decodes to −32768.
    pub relative_timestamp: i16,
    /// Flags byte (keyframe/invisible/lacing/discardable).
    pub flags: u8,
    /// Offset of the frame bytes within the block data.
    pub payload_offset: usize,
}

impl BlockHeader {
    /// Lacing bits from the flags byte (0 = no lacing).
    pub fn lacing(&self) -> u8 {
        (self.flags >> 1) & 0x03
    }
}

/// Parse the fixed block header fields.
///
/// Lacing is not unpacked: text subtitle tracks do not lace in practice,
/// so callers treat everything after the flags byte as one payload. A
/// laced block from a broken muxer would carry its lace sizes into the
/// payload rather than fail the extraction.
pub fn parse_block_header(data: &[u8]) -> Result<BlockHeader> {
    let (track, vint_len) = ebml::read_data_size(data, 0)
        .map_err(|_| MkvError::InvalidBlock("bad track number VINT".to_string()))?;
    let track_number =
        track.ok_or_else(|| MkvError::InvalidBlock("track number VINT is all ones".to_string()))?;

    if data.len() < vint_len + 3 {
        return Err(MkvError::InvalidBlock(format!(
            "block header truncated at {} bytes",
            data.len()
        )));
    }

    let relative_timestamp = i16::from_be_bytes([data[vint_len], data[vint_len + 1]]);
    let flags = data[vint_len + 2];

    Ok(BlockHeader {
        track_number,
        relative_timestamp,
        flags,
        payload_offset: vint_len + 3,
    })
}

/// Read just the track number VINT from the front of block data.
///
/// Used to decide whether a block is worth fetching at all, from a short
/// peek of its first bytes.
pub fn block_track_number(data: &[u8]) -> Result<u64> {
    let (track, _) = ebml::read_data_size(data, 0)
        .map_err(|_| MkvError::InvalidBlock("bad track number VINT".to_string()))?;
    track.ok_or_else(|| MkvError::InvalidBlock("track number VINT is all ones".to_string()))
}

/// The pieces of a BlockGroup the extraction cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockGroupParts<'a> {
    /// The inner Block's data.
    pub block: Option<&'a [u8]>,
    /// BlockDuration in raw timestamp units.
    pub duration: Option<u64>,
    /// BlockAdditions -> BlockMore -> BlockAdditional bytes.
    pub additions: Option<Vec<u8>>,
}

/// Collect Block, BlockDuration, and BlockAdditional out of a BlockGroup's
/// data.
pub fn parse_block_group(data: &[u8]) -> BlockGroupParts<'_> {
    let mut parts = BlockGroupParts::default();

    for (header, child) in ebml::children(data, 0, data.len()) {
        match header.id {
            elements::BLOCK => parts.block = Some(child),
            elements::BLOCK_DURATION => parts.duration = ebml::read_uint(child).ok(),
            elements::BLOCK_ADDITIONS => {
                for (more, more_data) in ebml::children(child, 0, child.len()) {
                    if more.id != elements::BLOCK_MORE {
                        continue;
                    }
                    for (additional, additional_data) in
                        ebml::children(more_data, 0, more_data.len())
                    {
                        if additional.id == elements::BLOCK_ADDITIONAL {
                            parts.additions = Some(additional_data.to_vec());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    parts
}
