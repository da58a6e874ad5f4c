//! # subgrab-subtitle
//!
//! Subtitle domain types and format assemblers.
//!
//! The extraction pipeline hands this crate a list of timed
//! [`SubtitleBlock`]s per track plus the track's CodecPrivate header; the
//! assemblers reconstruct a complete subtitle file in the track's native
//! format:
//!
//! - **SRT** (`S_TEXT/UTF8`): index + timing line + text blocks.
//! - **ASS/SSA** (`S_TEXT/ASS`, `S_TEXT/SSA`): CodecPrivate script header
//!   followed by `Dialogue:` lines rebuilt from the stripped-down block
//!   payloads, ordered by ReadOrder.
//! - **WebVTT** (`S_TEXT/WEBVTT`): CodecPrivate header followed by cues,
//!   with identifier/settings/comments restored from BlockAdditions.
//!
//! All assemblers emit UTF-8 bytes and are pure functions of their inputs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ass;
pub mod srt;
pub mod types;
pub mod vtt;

pub use types::{SubtitleBlock, SubtitleError, SubtitleFormat, SubtitleResult, Timestamp};
