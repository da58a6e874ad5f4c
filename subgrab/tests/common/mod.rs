//! Test support: an in-memory Range-serving fetch and small EBML writers
//! for building synthetic MKV files.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use subgrab::{Fetch, FetchResponse};
use subgrab_mkv::ebml::{encode_element_id, encode_vint};
use subgrab_mkv::elements as el;

/// Serves a byte buffer over the `Fetch` trait, honoring `Range` headers
/// the way a well-behaved static file server does.
pub struct FakeFetch {
    data: Vec<u8>,
    range_support: bool,
    requests: Arc<AtomicU64>,
}

impl FakeFetch {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            range_support: true,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A server that ignores Range headers and always replies 200 with the
    /// full body.
    pub fn without_ranges(data: Vec<u8>) -> Self {
        Self {
            data,
            range_support: false,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn request_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.requests)
    }
}

#[async_trait::async_trait]
impl Fetch for FakeFetch {
    async fn send(&self, _url: &str, headers: &[(String, String)]) -> subgrab::Result<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let range = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("range"))
            .map(|(_, value)| value.as_str());

        let range = match range {
            Some(value) if self.range_support => value,
            _ => {
                return Ok(FetchResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Bytes::from(self.data.clone()),
                })
            }
        };

        let (start, end) = parse_range(range).expect("malformed Range header in test");
        let len = self.data.len() as u64;
        let end = end.min(len.saturating_sub(1));
        let start = start.min(end);
        let body = self.data[start as usize..=end as usize].to_vec();

        Ok(FetchResponse {
            status: 206,
            headers: vec![(
                "Content-Range".to_string(),
                format!("bytes {start}-{end}/{len}"),
            )],
            body: Bytes::from(body),
        })
    }
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// A fetch that always answers with the given status and empty body.
pub struct StatusFetch(pub u16);

#[async_trait::async_trait]
impl Fetch for StatusFetch {
    async fn send(&self, _url: &str, _headers: &[(String, String)]) -> subgrab::Result<FetchResponse> {
        Ok(FetchResponse {
            status: self.0,
            headers: Vec::new(),
            body: Bytes::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// EBML writers
// ---------------------------------------------------------------------------

pub fn element(id: u64, data: &[u8]) -> Vec<u8> {
    let mut out = encode_element_id(id);
    let (size, len) = encode_vint(data.len() as u64).unwrap();
    out.extend_from_slice(&size[..len]);
    out.extend_from_slice(data);
    out
}

/// Minimal big-endian encoding of an unsigned value (at least one byte).
pub fn uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[start..].to_vec()
}

/// Fixed 8-byte big-endian encoding, for elements whose length must not
/// depend on the value (SeekPosition back-patching).
pub fn uint8(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn ebml_file_header() -> Vec<u8> {
    element(el::EBML, &element(0x4282, b"matroska"))
}

/// A complete file: EBML header plus a known-size Segment.
pub fn mkv(segment_children: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for child in segment_children {
        body.extend_from_slice(child);
    }
    let mut out = ebml_file_header();
    out.extend_from_slice(&element(el::SEGMENT, &body));
    out
}

/// Block data: track VINT, signed 16-bit relative timestamp, flags, payload.
pub fn block_body(track: u8, relative_ts: i16, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0x80 | track];
    out.extend_from_slice(&relative_ts.to_be_bytes());
    out.push(0x00);
    out.extend_from_slice(payload);
    out
}

pub fn simple_block(track: u8, relative_ts: i16, payload: &[u8]) -> Vec<u8> {
    element(el::SIMPLE_BLOCK, &block_body(track, relative_ts, payload))
}

/// A BlockGroup wrapping one Block, with optional duration and additions.
pub fn block_group(
    track: u8,
    relative_ts: i16,
    payload: &[u8],
    duration: Option<u64>,
    additions: Option<&[u8]>,
) -> Vec<u8> {
    let mut body = element(el::BLOCK, &block_body(track, relative_ts, payload));
    if let Some(duration) = duration {
        body.extend_from_slice(&element(el::BLOCK_DURATION, &uint(duration)));
    }
    if let Some(additions) = additions {
        let additional = element(el::BLOCK_ADDITIONAL, additions);
        let more = element(el::BLOCK_MORE, &additional);
        body.extend_from_slice(&element(el::BLOCK_ADDITIONS, &more));
    }
    element(el::BLOCK_GROUP, &body)
}

pub fn cluster(timestamp: u64, blocks: &[&[u8]]) -> Vec<u8> {
    let mut body = element(el::CLUSTER_TIMESTAMP, &uint(timestamp));
    for block in blocks {
        body.extend_from_slice(block);
    }
    element(el::CLUSTER, &body)
}

pub fn info(timestamp_scale: Option<u64>) -> Vec<u8> {
    let body = match timestamp_scale {
        Some(scale) => element(el::TIMESTAMP_SCALE, &uint(scale)),
        None => Vec::new(),
    };
    element(el::INFO, &body)
}

pub struct TrackSpec<'a> {
    pub number: u8,
    pub codec: &'a str,
    pub language: Option<&'a str>,
    pub codec_private: Option<&'a [u8]>,
}

pub fn tracks(specs: &[TrackSpec<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for spec in specs {
        let mut entry = element(el::TRACK_NUMBER, &[spec.number]);
        entry.extend_from_slice(&element(el::TRACK_TYPE, &[17]));
        entry.extend_from_slice(&element(el::CODEC_ID, spec.codec.as_bytes()));
        if let Some(language) = spec.language {
            entry.extend_from_slice(&element(el::LANGUAGE, language.as_bytes()));
        }
        if let Some(private) = spec.codec_private {
            entry.extend_from_slice(&element(el::CODEC_PRIVATE, private));
        }
        body.extend_from_slice(&element(el::TRACK_ENTRY, &entry));
    }
    element(el::TRACKS, &body)
}

pub fn subtitle_track<'a>(number: u8, codec: &'a str) -> TrackSpec<'a> {
    TrackSpec {
        number,
        codec,
        language: None,
        codec_private: None,
    }
}

pub fn attached_file(name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = element(el::FILE_NAME, name.as_bytes());
    body.extend_from_slice(&element(el::FILE_MIME_TYPE, mime.as_bytes()));
    body.extend_from_slice(&element(el::FILE_DATA, data));
    element(el::ATTACHED_FILE, &body)
}

/// One SeekHead entry with an 8-byte position, so the element's length is
/// independent of the position value.
pub fn seek_head(entries: &[(u64, u64)]) -> Vec<u8> {
    let mut body = Vec::new();
    for &(id, position) in entries {
        let mut seek = element(el::SEEK_ID, &encode_element_id(id));
        seek.extend_from_slice(&element(el::SEEK_POSITION, &uint8(position)));
        body.extend_from_slice(&element(el::SEEK, &seek));
    }
    element(el::SEEK_HEAD, &body)
}

/// A Cues element from `(time, track, cluster_position, relative_position)`
/// tuples.
pub fn cues(entries: &[(u64, u64, u64, Option<u64>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for &(time, track, cluster_position, relative_position) in entries {
        let mut positions = element(el::CUE_TRACK, &uint(track));
        positions.extend_from_slice(&element(el::CUE_CLUSTER_POSITION, &uint(cluster_position)));
        if let Some(relative) = relative_position {
            positions.extend_from_slice(&element(el::CUE_RELATIVE_POSITION, &uint(relative)));
        }
        let mut point = element(el::CUE_TIME, &uint(time));
        point.extend_from_slice(&element(el::CUE_TRACK_POSITIONS, &positions));
        body.extend_from_slice(&element(el::CUE_POINT, &point));
    }
    element(el::CUES, &body)
}

pub fn void(len: usize) -> Vec<u8> {
    element(el::VOID, &vec![0u8; len])
}
