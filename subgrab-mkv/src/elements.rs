//! Matroska element IDs used by the subtitle extraction pipeline.
//!
//! IDs are stored with their VINT marker bit, exactly as the ID reader
//! returns them. They are `u64` because the ID reader accepts VINT widths
//! up to 8 bytes, even though every ID Matroska actually defines fits in 4.

// =============================================================================
// EBML header and Segment
// =============================================================================

/// EBML Header element.
pub const EBML: u64 = 0x1A45DFA3;
/// Segment (the root container for all Matroska data).
pub const SEGMENT: u64 = 0x18538067;

// =============================================================================
// Meta seek information
// =============================================================================

/// SeekHead (index of top-level elements).
pub const SEEK_HEAD: u64 = 0x114D9B74;
/// Seek entry.
pub const SEEK: u64 = 0x4DBB;
/// Seek ID.
pub const SEEK_ID: u64 = 0x53AB;
/// Seek Position.
pub const SEEK_POSITION: u64 = 0x53AC;

// =============================================================================
// Segment information
// =============================================================================

/// Segment Info.
pub const INFO: u64 = 0x1549A966;
/// Timestamp Scale (nanoseconds per timestamp unit, default 1000000 = 1ms).
pub const TIMESTAMP_SCALE: u64 = 0x2AD7B1;

// =============================================================================
// Cluster elements
// =============================================================================

/// Cluster (contains blocks of media data).
pub const CLUSTER: u64 = 0x1F43B675;
/// Cluster Timestamp.
pub const CLUSTER_TIMESTAMP: u64 = 0xE7;
/// SimpleBlock (block without surrounding group).
pub const SIMPLE_BLOCK: u64 = 0xA3;
/// BlockGroup (block with additional info).
pub const BLOCK_GROUP: u64 = 0xA0;
/// Block.
pub const BLOCK: u64 = 0xA1;
/// Block Duration.
pub const BLOCK_DURATION: u64 = 0x9B;
/// Block Additions.
pub const BLOCK_ADDITIONS: u64 = 0x75A1;
/// Block More.
pub const BLOCK_MORE: u64 = 0xA6;
/// Block Additional.
pub const BLOCK_ADDITIONAL: u64 = 0xA5;

// =============================================================================
// Track elements
// =============================================================================

/// Tracks.
pub const TRACKS: u64 = 0x1654AE6B;
/// Track Entry.
pub const TRACK_ENTRY: u64 = 0xAE;
/// Track Number.
pub const TRACK_NUMBER: u64 = 0xD7;
/// Track Type.
pub const TRACK_TYPE: u64 = 0x83;
/// Codec ID.
pub const CODEC_ID: u64 = 0x86;
/// Codec Private data.
pub const CODEC_PRIVATE: u64 = 0x63A2;
/// Language (legacy ISO 639-2).
pub const LANGUAGE: u64 = 0x22B59C;
/// Language (BCP 47 / IETF).
pub const LANGUAGE_BCP47: u64 = 0x22B59D;
/// Name.
pub const NAME: u64 = 0x536E;
/// Default Duration.
pub const DEFAULT_DURATION: u64 = 0x23E383;

// =============================================================================
// Attachments
// =============================================================================

/// Attachments.
pub const ATTACHMENTS: u64 = 0x1941A469;
/// Attached File.
pub const ATTACHED_FILE: u64 = 0x61A7;
/// File Name.
pub const FILE_NAME: u64 = 0x466E;
/// File MIME type.
pub const FILE_MIME_TYPE: u64 = 0x4660;
/// File Data.
pub const FILE_DATA: u64 = 0x465C;

// =============================================================================
// Cues
// =============================================================================

/// Cues (seeking index).
pub const CUES: u64 = 0x1C53BB6B;
/// Cue Point.
pub const CUE_POINT: u64 = 0xBB;
/// Cue Time.
pub const CUE_TIME: u64 = 0xB3;
/// Cue Track Positions.
pub const CUE_TRACK_POSITIONS: u64 = 0xB7;
/// Cue Track.
pub const CUE_TRACK: u64 = 0xF7;
/// Cue Cluster Position.
pub const CUE_CLUSTER_POSITION: u64 = 0xF1;
/// Cue Relative Position.
pub const CUE_RELATIVE_POSITION: u64 = 0xF0;

// =============================================================================
// Other top-level elements
// =============================================================================

/// Chapters.
pub const CHAPTERS: u64 = 0x1043A770;
/// Tags.
pub const TAGS: u64 = 0x1254C367;
/// Void filler.
pub const VOID: u64 = 0xEC;
/// CRC-32.
pub const CRC32: u64 = 0xBF;

/// Track type value for subtitle tracks.
pub const TRACK_TYPE_SUBTITLE: u64 = 17;

/// Whether `id` is one of the Segment's top-level element IDs.
///
/// Used as the end sentinel when walking an unknown-size Cluster: the next
/// top-level element terminates the cluster.
pub fn is_segment_level_id(id: u64) -> bool {
    matches!(
        id,
        SEEK_HEAD | INFO | TRACKS | ATTACHMENTS | CUES | CHAPTERS | TAGS | CLUSTER
    )
}
