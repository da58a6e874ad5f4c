//! Segment-level parsing: EBML header validation, Segment location, and the
//! metadata scan over the start of the file.
//!
//! Everything here runs against the file prefix fetched during reader
//! initialization. The scan stops at the first Cluster (or at the first
//! unknown-size element, or when the prefix runs out); actual media data is
//! never touched at this stage.

use crate::ebml::{self, ElementHeader};
use crate::elements;
use crate::error::{MkvError, Result};

/// Default timestamp scale: 1,000,000 ns per unit, i.e. raw units are ms.
pub const DEFAULT_TIMESTAMP_SCALE: u64 = 1_000_000;

/// The located Segment element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Absolute file offset where the Segment's data begins.
    pub data_offset: u64,
    /// Size of the Segment data. An unknown-size Segment is resolved to
    /// `file_size - data_offset` at parse time.
    pub data_size: u64,
}

impl Segment {
    /// Absolute file offset just past the Segment data.
    pub fn end_offset(&self) -> u64 {
        self.data_offset + self.data_size
    }
}

/// One SeekHead entry: an element ID and its position relative to the
/// Segment data start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekEntry {
    /// The target element's ID.
    pub id: u64,
    /// Byte position relative to the Segment data start.
    pub position: u64,
}

/// Parsed Segment Info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Nanoseconds per raw timestamp unit.
    pub timestamp_scale: u64,
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self {
            timestamp_scale: DEFAULT_TIMESTAMP_SCALE,
        }
    }
}

/// Result of scanning the Segment-level children inside the prefix.
#[derive(Debug, Clone, Default)]
pub struct SegmentScan {
    /// All SeekHead entries, flattened.
    pub seeks: Vec<SeekEntry>,
    /// Segment Info (timestamp scale).
    pub info: SegmentInfo,
    /// Absolute offset of a Tracks element observed during the scan.
    pub tracks_offset: Option<u64>,
    /// Absolute offset of an Attachments element observed during the scan.
    pub attachments_offset: Option<u64>,
    /// Absolute offset of a Cues element observed during the scan.
    pub cues_offset: Option<u64>,
    /// Absolute offset of the first Cluster observed during the scan.
    pub first_cluster_offset: Option<u64>,
}

impl SegmentScan {
    /// Look up a SeekHead entry by element ID, as an absolute file offset.
    pub fn seek_position(&self, id: u64, segment: &Segment) -> Option<u64> {
        self.seeks
            .iter()
            .find(|s| s.id == id)
            .map(|s| segment.data_offset + s.position)
    }
}

/// Validate the EBML header and locate the Segment inside the file prefix.
///
/// Missing EBML header or Segment is fatal; nothing downstream can be
/// trusted without them.
pub fn parse_segment_prefix(prefix: &[u8], file_size: u64) -> Result<Segment> {
    let ebml_header = ElementHeader::parse(prefix, 0)
        .map_err(|_| MkvError::MissingElement("EBML header"))?;
    if ebml_header.id != elements::EBML {
        return Err(MkvError::MissingElement("EBML header"));
    }
    let ebml_size = ebml_header
        .size
        .ok_or(MkvError::MissingElement("EBML header"))?;

    let mut pos = ebml_header.data_offset() + ebml_size;
    loop {
        let header = ElementHeader::parse(prefix, pos as usize)
            .map_err(|_| MkvError::MissingElement("Segment"))?;
        match header.id {
            elements::SEGMENT => {
                let data_offset = header.data_offset();
                let data_size = match header.size {
                    Some(size) => size,
                    None => file_size.saturating_sub(data_offset),
                };
                return Ok(Segment {
                    data_offset,
                    data_size,
                });
            }
            // Muxers may pad between the EBML header and the Segment.
            elements::VOID | elements::CRC32 => {
                let size = header.size.ok_or(MkvError::MissingElement("Segment"))?;
                pos = header.data_offset() + size;
            }
            _ => return Err(MkvError::MissingElement("Segment")),
        }
    }
}

/// Scan the Segment-level children contained in the prefix, stopping at the
/// first Cluster.
///
/// Collects SeekHead entries and the Info timestamp scale, and remembers
/// where Tracks/Attachments/Cues/first-Cluster were seen so the caller can
/// fall back on those positions when the SeekHead is absent or incomplete.
pub fn scan_segment(prefix: &[u8], segment: &Segment) -> SegmentScan {
    let mut scan = SegmentScan::default();
    let mut pos = segment.data_offset as usize;

    while pos < prefix.len() {
        let header = match ElementHeader::parse(prefix, pos) {
            Ok(h) => h,
            Err(_) => break,
        };

        if header.id == elements::CLUSTER {
            scan.first_cluster_offset = Some(pos as u64);
            break;
        }

        // Unknown size is only legal on Segment and Cluster; anything else
        // here means the scan cannot continue.
        let size = match header.size {
            Some(size) => size,
            None => break,
        };

        let data_start = header.data_offset() as usize;
        let data_end = data_start.saturating_add(size as usize);

        match header.id {
            elements::SEEK_HEAD => {
                parse_seek_head(prefix, data_start, data_end, &mut scan.seeks);
            }
            elements::INFO => {
                scan.info = parse_info(prefix, data_start, data_end);
            }
            elements::TRACKS => {
                scan.tracks_offset.get_or_insert(pos as u64);
            }
            elements::ATTACHMENTS => {
                scan.attachments_offset.get_or_insert(pos as u64);
            }
            elements::CUES => {
                scan.cues_offset.get_or_insert(pos as u64);
            }
            _ => {}
        }

        if data_end > prefix.len() {
            break;
        }
        pos = data_end;
    }

    scan
}

fn parse_seek_head(buf: &[u8], start: usize, end: usize, seeks: &mut Vec<SeekEntry>) {
    for (header, data) in ebml::children(buf, start, end) {
        if header.id != elements::SEEK {
            continue;
        }

        let mut seek_id = None;
        let mut seek_position = None;
        for (child, child_data) in ebml::children(data, 0, data.len()) {
            match child.id {
                // SeekID is the raw bytes of the target element's ID.
                elements::SEEK_ID => seek_id = ebml::read_uint(child_data).ok(),
                elements::SEEK_POSITION => seek_position = ebml::read_uint(child_data).ok(),
                _ => {}
            }
        }

        if let (Some(id), Some(position)) = (seek_id, seek_position) {
            seeks.push(SeekEntry { id, position });
        }
    }
}

fn parse_info(buf: &[u8], start: usize, end: usize) -> SegmentInfo {
    let mut info = SegmentInfo::default();
    for (header, data) in ebml::children(buf, start, end) {
        if header.id == elements::TIMESTAMP_SCALE {
            if let Ok(scale) = ebml::read_uint(data) {
                if scale > 0 {
                    info.timestamp_scale = scale;
                }
            }
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebml::{encode_element_id, encode_vint};

    fn element(id: u64, data: &[u8]) -> Vec<u8> {
        let mut out = encode_element_id(id);
        let (size, len) = encode_vint(data.len() as u64).unwrap();
        out.extend_from_slice(&size[..len]);
        out.extend_from_slice(data);
        out
    }

    fn minimal_file(segment_children: &[u8]) -> Vec<u8> {
        let mut ebml_body = Vec::new();
        ebml_body.extend_from_slice(&element(0x4282, b"matroska")); // DocType
        let mut out = element(elements::EBML, &ebml_body);
        out.extend_from_slice(&element(elements::SEGMENT, segment_children));
        out
    }

    #[test]
    fn test_parse_segment_prefix() {
        let file = minimal_file(&[]);
        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        assert_eq!(segment.data_offset, file.len() as u64);
        assert_eq!(segment.data_size, 0);
    }

    #[test]
    fn test_parse_segment_prefix_unknown_size() {
        let mut file = element(elements::EBML, &element(0x4282, b"matroska"));
        file.extend_from_slice(&encode_element_id(elements::SEGMENT));
        file.push(0xFF); // unknown size
        file.extend_from_slice(&[0u8; 100]);

        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        assert_eq!(segment.data_size, 100);
    }

    #[test]
    fn test_missing_ebml_header() {
        let err = parse_segment_prefix(&[0x00, 0x01, 0x02], 3).unwrap_err();
        assert_eq!(err, MkvError::MissingElement("EBML header"));
    }

    #[test]
    fn test_missing_segment() {
        let file = element(elements::EBML, &element(0x4282, b"matroska"));
        let err = parse_segment_prefix(&file, file.len() as u64).unwrap_err();
        assert_eq!(err, MkvError::MissingElement("Segment"));
    }

    #[test]
    fn test_void_between_ebml_and_segment() {
        let mut file = element(elements::EBML, &element(0x4282, b"matroska"));
        file.extend_from_slice(&element(elements::VOID, &[0u8; 8]));
        file.extend_from_slice(&element(elements::SEGMENT, &[]));
        assert!(parse_segment_prefix(&file, file.len() as u64).is_ok());
    }

    #[test]
    fn test_scan_collects_seeks_and_info() {
        let seek = |id: u64, pos: u64| {
            let mut body = element(elements::SEEK_ID, &encode_element_id(id));
            body.extend_from_slice(&element(elements::SEEK_POSITION, &pos.to_be_bytes()[6..]));
            element(elements::SEEK, &body)
        };
        let mut seek_head = seek(elements::TRACKS, 0x40);
        seek_head.extend_from_slice(&seek(elements::CUES, 0x2000));

        let mut children = element(elements::SEEK_HEAD, &seek_head);
        let info = element(elements::TIMESTAMP_SCALE, &[0x0F, 0x42, 0x40]); // 1,000,000
        children.extend_from_slice(&element(elements::INFO, &info));

        let file = minimal_file(&children);
        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        let scan = scan_segment(&file, &segment);

        assert_eq!(scan.seeks.len(), 2);
        assert_eq!(scan.seeks[0].id, elements::TRACKS);
        assert_eq!(scan.seeks[0].position, 0x40);
        assert_eq!(
            scan.seek_position(elements::CUES, &segment),
            Some(segment.data_offset + 0x2000)
        );
        assert_eq!(scan.info.timestamp_scale, 1_000_000);
    }

    #[test]
    fn test_scan_default_timestamp_scale() {
        let children = element(elements::INFO, &[]);
        let file = minimal_file(&children);
        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        let scan = scan_segment(&file, &segment);
        assert_eq!(scan.info.timestamp_scale, DEFAULT_TIMESTAMP_SCALE);
    }

    #[test]
    fn test_scan_stops_at_cluster() {
        let mut children = element(elements::INFO, &[]);
        children.extend_from_slice(&element(elements::CLUSTER, &element(0xE7, &[0x01])));
        children.extend_from_slice(&element(elements::TRACKS, &[]));

        let file = minimal_file(&children);
        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        let scan = scan_segment(&file, &segment);

        assert!(scan.first_cluster_offset.is_some());
        // The Tracks element after the first cluster is not observed.
        assert!(scan.tracks_offset.is_none());
    }

    #[test]
    fn test_scan_records_observed_offsets() {
        let mut children = element(elements::TRACKS, &[]);
        children.extend_from_slice(&element(elements::ATTACHMENTS, &[]));
        let file = minimal_file(&children);
        let segment = parse_segment_prefix(&file, file.len() as u64).unwrap();
        let scan = scan_segment(&file, &segment);

        assert_eq!(scan.tracks_offset, Some(segment.data_offset));
        assert!(scan.attachments_offset.is_some());
        assert!(scan.cues_offset.is_none());
    }
}
