//! # subgrab-mkv
//!
//! Slice-based EBML/Matroska parsing for subtitle extraction.
//!
//! This crate contains the pure, synchronous half of the pipeline: given
//! byte slices (typically HTTP range responses), it decodes EBML variable
//! length integers, frames elements, and parses the handful of Matroska
//! structures subtitle extraction needs: the Segment metadata scan,
//! Tracks, Attachments, Cues, and block framing. It performs no I/O.
//!
//! ## Matroska element structure
//!
//! ```text
//! EBML Header
//! Segment
//! ├── SeekHead (index to other elements)
//! ├── Info (timestamp scale)
//! ├── Tracks (track definitions, incl. CodecPrivate)
//! ├── Attachments (embedded fonts)
//! ├── Cues (seeking index)
//! └── Cluster (media data)
//!     ├── Timestamp
//!     └── SimpleBlock / BlockGroup
//! ```
//!
//! ## Robustness policy
//!
//! Parsers trust parent-declared lengths and never attempt element repair.
//! A malformed interior stops the affected child iteration cleanly;
//! children parsed before the stop are kept. Only missing top-level
//! structure (EBML header, Segment) is an error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attachments;
pub mod block;
pub mod cues;
pub mod ebml;
pub mod elements;
pub mod error;
pub mod segment;
pub mod tracks;

pub use attachments::{is_font, parse_attachments, FontFile};
pub use block::{block_track_number, parse_block_group, parse_block_header, BlockHeader};
pub use cues::{parse_cues, CueEntry};
pub use ebml::{children, ElementHeader};
pub use error::{MkvError, Result};
pub use segment::{
    parse_segment_prefix, scan_segment, Segment, SegmentInfo, SegmentScan, SeekEntry,
    DEFAULT_TIMESTAMP_SCALE,
};
pub use tracks::{parse_tracks, SubtitleTrack};
