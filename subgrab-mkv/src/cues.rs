//! Cues index parsing.

use crate::ebml;
use crate::elements;

/// One Cue entry: a `(time, track)` pair pointing at a cluster, and
/// optionally at the exact block offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueEntry {
    /// Cue time in raw timestamp units.
    pub time: u64,
    /// Track number the entry refers to.
    pub track: u64,
    /// Cluster position relative to the Segment data start.
    pub cluster_position: u64,
    /// Block position relative to the cluster data start, when the muxer
    /// wrote CueRelativePosition.
    pub relative_position: Option<u64>,
}

/// Parse the body of a Cues element into flat cue entries, one per
/// CueTrackPositions.
pub fn parse_cues(data: &[u8]) -> Vec<CueEntry> {
    let mut entries = Vec::new();

    for (header, point) in ebml::children(data, 0, data.len()) {
        if header.id != elements::CUE_POINT {
            continue;
        }

        let mut time = None;
        for (child, child_data) in ebml::children(point, 0, point.len()) {
            match child.id {
                elements::CUE_TIME => time = ebml::read_uint(child_data).ok(),
                elements::CUE_TRACK_POSITIONS => {
                    if let (Some(time), Some(entry)) = (time, parse_positions(child_data)) {
                        entries.push(CueEntry {
                            time,
                            track: entry.0,
                            cluster_position: entry.1,
                            relative_position: entry.2,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    entries
}

fn parse_positions(data: &[u8]) -> Option<(u64, u64, Option<u64>)> {
    let mut track = None;
    let mut cluster_position = None;
    let mut relative_position = None;

    for (child, child_data) in ebml::children(data, 0, data.len()) {
        match child.id {
            elements::CUE_TRACK => track = ebml::read_uint(child_data).ok(),
            elements::CUE_CLUSTER_POSITION => {
                cluster_position = ebml::read_uint(child_data).ok()
            }
            elements::CUE_RELATIVE_POSITION => {
                relative_position = ebml::read_uint(child_data).ok()
            }
            _ => {}
        }
    }

    Some((track?, cluster_position?, relative_position))
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

    fn uint_bytes(value: u64) -> Vec<u8> {
        let bytes = value.to_be_bytes();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(7);
        bytes[start..].to_vec()
    }

    fn cue_point(time: u64, positions: &[(u64, u64, Option<u64>)]) -> Vec<u8> {
        let mut body = element(elements::CUE_TIME, &uint_bytes(time));
        for &(track, cluster, relative) in positions {
            let mut pos = element(elements::CUE_TRACK, &uint_bytes(track));
            pos.extend_from_slice(&element(
                elements::CUE_CLUSTER_POSITION,
                &uint_bytes(cluster),
            ));
            if let Some(relative) = relative {
                pos.extend_from_slice(&element(
                    elements::CUE_RELATIVE_POSITION,
                    &uint_bytes(relative),
                ));
            }
            body.extend_from_slice(&element(elements::CUE_TRACK_POSITIONS, &pos));
        }
        element(elements::CUE_POINT, &body)
    }

    #[test]
    fn test_parse_cues() {
        let mut body = cue_point(0, &[(1, 0x1000, Some(0x20))]);
        body.extend_from_slice(&cue_point(5000, &[(1, 0x8000, None), (3, 0x8000, Some(0x40))]));

        let entries = parse_cues(&body);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].time, 0);
        assert_eq!(entries[0].track, 1);
        assert_eq!(entries[0].cluster_position, 0x1000);
        assert_eq!(entries[0].relative_position, Some(0x20));

        assert_eq!(entries[1].time, 5000);
        assert_eq!(entries[1].relative_position, None);

        assert_eq!(entries[2].track, 3);
        assert_eq!(entries[2].relative_position, Some(0x40));
    }

    #[test]
    fn test_positions_without_track_dropped() {
        let body = element(
            elements::CUE_POINT,
            &[
                element(elements::CUE_TIME, &[0x01]),
                element(
                    elements::CUE_TRACK_POSITIONS,
                    &element(elements::CUE_CLUSTER_POSITION, &[0x10]),
                ),
            ]
            .concat(),
        );
        assert!(parse_cues(&body).is_empty());
    }
}
