//! # subgrab
//!
//! Extract subtitle tracks and their embedded fonts from remote Matroska
//! (MKV) files, downloading only the bytes the subtitles actually occupy
//! (typically around 3% of the file) via HTTP Range requests.
//!
//! ## Quick start
//!
//! ```no_run
//! use subgrab::{extract_subtitles, ExtractOptions};
//!
//! #[tokio::main]
//! async fn main() -> subgrab::Result<()> {
//!     let options = ExtractOptions::new().languages(["eng"]).concurrency(4);
//!     let tracks = extract_subtitles("https://example.com/video.mkv", options).await?;
//!
//!     for track in tracks {
//!         println!(
//!             "track {} ({}): {} bytes",
//!             track.track_number,
//!             track.format,
//!             track.subtitle.len()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How it works
//!
//! 1. A 256 KiB probe read confirms Range support, learns the file size,
//!    and covers the Segment metadata (SeekHead, Info).
//! 2. The Tracks, Attachments, and Cues elements are fetched individually,
//!    located through the SeekHead.
//! 3. When a Cue index with relative positions exists, each subtitle
//!    block's exact file offset is known up front; nearby targets are
//!    coalesced into batched range reads (optionally in parallel).
//!    Otherwise the clusters are walked linearly, peeking each block's
//!    track number before fetching any payload.
//! 4. Per track, the blocks are reassembled into a complete SRT, ASS/SSA,
//!    or WebVTT file from the raw payloads plus the track's CodecPrivate
//!    header. Font attachments ride along with ASS/SSA tracks.
//!
//! ## Architecture
//!
//! The workspace splits by concern:
//! - `subgrab-mkv`: pure slice-based EBML/Matroska parsing
//! - `subgrab-subtitle`: subtitle types and the three format assemblers
//! - `subgrab` (this crate): the HTTP capability, range reader, block
//!   fetcher, and orchestrator
//!
//! Logging goes through [`tracing`]; install a subscriber to see request
//! and batching telemetry.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod blocks;
mod error;
mod extract;
mod fetch;
mod options;
mod reader;

pub use error::{Error, Result};
pub use extract::{extract_subtitles, TrackResult};
pub use fetch::{Fetch, FetchResponse, ReqwestFetch};
pub use options::ExtractOptions;
pub use reader::{RangeReader, ReaderStats};

// Re-export the types that appear in results.
pub use subgrab_mkv::attachments::FontFile;
pub use subgrab_subtitle::SubtitleFormat;
