//! Block fetching: turning the Cue index (or a linear cluster walk) into
//! extracted subtitle blocks with as few range reads as possible.
//!
//! Two modes:
//!
//! - **Targeted** (Cues present): every cue entry with a relative position
//!   gives the exact file offset of its block, so blocks are read in a
//!   handful of coalesced batch reads sized by the observed gap
//!   distribution. Clusters whose entries lack relative positions are
//!   walked whole, like the linear mode.
//! - **Linear** (no usable Cues): walk every cluster from the first one to
//!   the Segment end, peeking each block's track number before deciding
//!   whether its payload is worth fetching.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use subgrab_mkv::block::{block_track_number, parse_block_group, parse_block_header};
use subgrab_mkv::cues::CueEntry;
use subgrab_mkv::ebml::{self, ElementHeader};
use subgrab_mkv::elements;
use subgrab_mkv::segment::Segment;
use subgrab_subtitle::SubtitleBlock;

use crate::error::{Error, Result};
use crate::reader::RangeReader;

/// Bytes assumed past the last target of a batch, so the final block's
/// element usually fits without a follow-up read.
const BLOCK_SIZE_ESTIMATE: u64 = 4096;

/// Lower clamp for the adaptive batch threshold.
const MIN_BATCH_THRESHOLD: u64 = 32 * 1024;

/// Upper clamp for the adaptive batch threshold.
const MAX_BATCH_THRESHOLD: u64 = 2 * 1024 * 1024;

/// Median gap at or beyond which targets count as widely spaced.
const SPARSE_GAP_CUTOFF: u64 = 2 * 1024 * 1024;

/// Fixed threshold for widely spaced targets: only coincidentally close
/// pairs still merge.
const SPARSE_THRESHOLD: u64 = 128 * 1024;

/// Bytes peeked from a SimpleBlock to read its track number VINT.
const BLOCK_PEEK_LEN: u64 = 8;

/// Bytes peeked from a BlockGroup to find the inner Block's track number.
const GROUP_PEEK_LEN: u64 = 32;

/// Bytes fetched when parsing a lone element header (a 4-byte ID plus an
/// 8-byte size is the worst case).
const HEADER_PEEK_LEN: u64 = 16;

/// A direct read target: the absolute file offset of a block element and
/// the cue time that provides its absolute timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    offset: u64,
    time: u64,
}

/// Fetches subtitle blocks through a shared [`RangeReader`].
#[derive(Clone)]
pub(crate) struct BlockFetcher {
    reader: Arc<RangeReader>,
    segment: Segment,
    timestamp_scale: u64,
    tracks: Arc<HashSet<u64>>,
}

impl BlockFetcher {
    pub(crate) fn new(
        reader: Arc<RangeReader>,
        segment: Segment,
        timestamp_scale: u64,
        tracks: Arc<HashSet<u64>>,
    ) -> Self {
        Self {
            reader,
            segment,
            timestamp_scale,
            tracks,
        }
    }

    fn raw_to_ms(&self, raw: u64) -> u64 {
        raw.saturating_mul(self.timestamp_scale) / 1_000_000
    }

    /// Targeted fetch driven by the Cue index.
    ///
    /// Returns `None` when the cluster header probe fails, in which case
    /// the caller should fall back to the linear scan.
    ///
    /// Blocks are returned sorted by timestamp; parallel batches may
    /// complete out of order, so the sort is unconditional.
    pub(crate) async fn fetch_targeted(
        &self,
        cues: &[CueEntry],
        concurrency: usize,
    ) -> Result<Option<Vec<SubtitleBlock>>> {
        let Some(first_cluster) = cues.iter().map(|c| c.cluster_position).min() else {
            return Ok(Some(Vec::new()));
        };

        // All clusters in a valid file use the same data-size VINT width,
        // so one probe pins the header width for every target.
        let Some(header_width) = self.probe_cluster_header(first_cluster).await? else {
            return Ok(None);
        };

        let mut by_cluster: BTreeMap<u64, Vec<&CueEntry>> = BTreeMap::new();
        for cue in cues {
            by_cluster.entry(cue.cluster_position).or_default().push(cue);
        }

        let mut targets = Vec::new();
        let mut fallback_clusters = Vec::new();
        for (cluster_position, entries) in by_cluster {
            if entries.iter().all(|e| e.relative_position.is_some()) {
                for entry in entries {
                    let relative = entry.relative_position.unwrap_or(0);
                    targets.push(Target {
                        offset: self.segment.data_offset
                            + cluster_position
                            + header_width as u64
                            + relative,
                        time: entry.time,
                    });
                }
            } else {
                fallback_clusters.push(cluster_position);
            }
        }

        targets.sort_by_key(|t| t.offset);
        targets.dedup_by_key(|t| t.offset);

        let threshold = batch_threshold(&targets);
        let batches = group_batches(targets, threshold);
        debug!(
            batches = batches.len(),
            threshold,
            fallback_clusters = fallback_clusters.len(),
            "planned targeted block fetch"
        );

        let mut blocks = if concurrency > 1 && batches.len() > 1 {
            self.fetch_batches_parallel(batches, concurrency).await?
        } else {
            let mut out = Vec::new();
            for batch in &batches {
                out.extend(self.fetch_batch(batch).await?);
            }
            out
        };

        for cluster_position in fallback_clusters {
            let offset = self.segment.data_offset + cluster_position;
            let Some(header) = self.read_header(offset).await? else {
                continue;
            };
            if header.id != elements::CLUSTER {
                continue;
            }
            let data_offset = offset + header.header_size as u64;
            let (cluster_blocks, _) = self.walk_cluster(data_offset, header.size).await?;
            blocks.extend(cluster_blocks);
        }

        blocks.sort_by_key(|b| b.timestamp_ms);
        Ok(Some(blocks))
    }

    /// Dispatch batches through a sliding-window pool of `workers` tasks.
    ///
    /// Each worker claims the next un-started batch index and stores its
    /// blocks under that index, so the merged result is deterministic
    /// regardless of completion order.
    async fn fetch_batches_parallel(
        &self,
        batches: Vec<Vec<Target>>,
        workers: usize,
    ) -> Result<Vec<SubtitleBlock>> {
        let batches = Arc::new(batches);
        let next = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..workers.min(batches.len()) {
            let fetcher = self.clone();
            let batches = Arc::clone(&batches);
            let next = Arc::clone(&next);
            handles.push(tokio::spawn(async move {
                let mut results: Vec<(usize, Vec<SubtitleBlock>)> = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= batches.len() {
                        break;
                    }
                    let blocks = fetcher.fetch_batch(&batches[index]).await?;
                    results.push((index, blocks));
                }
                Ok::<_, Error>(results)
            }));
        }

        let mut indexed = Vec::new();
        for handle in handles {
            let worker_results = handle
                .await
                .map_err(|e| Error::Other(format!("fetch worker panicked: {e}")))??;
            indexed.extend(worker_results);
        }
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().flat_map(|(_, blocks)| blocks).collect())
    }

    /// Fetch one batch with a single range read and parse every target
    /// inside it.
    async fn fetch_batch(&self, batch: &[Target]) -> Result<Vec<SubtitleBlock>> {
        let Some(first) = batch.first() else {
            return Ok(Vec::new());
        };
        let last = batch[batch.len() - 1];
        let length = last.offset - first.offset + BLOCK_SIZE_ESTIMATE;
        let buf = self.reader.read(first.offset, length).await?;

        let mut blocks = Vec::new();
        for target in batch {
            let rel = (target.offset - first.offset) as usize;
            let block = match element_in_buffer(&buf, rel) {
                Some((id, data)) => self.cue_target_block(id, data, target),
                None => {
                    // The element overflows the batch buffer; read it alone,
                    // sized exactly to its declared length.
                    match self.read_element_at(target.offset).await? {
                        Some((header, data)) => self.cue_target_block(header.id, &data, target),
                        None => None,
                    }
                }
            };
            blocks.extend(block);
        }
        Ok(blocks)
    }

    /// Interpret a cue-targeted element. The cue may point at a
    /// SimpleBlock or a BlockGroup, whichever the muxer wrote.
    fn cue_target_block(&self, id: u64, data: &[u8], target: &Target) -> Option<SubtitleBlock> {
        match id {
            elements::SIMPLE_BLOCK | elements::BLOCK => self.cue_block(data, target.time, None, None),
            elements::BLOCK_GROUP => {
                let parts = parse_block_group(data);
                let block_data = parts.block?;
                self.cue_block(block_data, target.time, parts.duration, parts.additions)
            }
            _ => None,
        }
    }

    /// Build a subtitle block from cue-targeted block data. The absolute
    /// time comes from the CueTime; the in-block relative timestamp is
    /// ignored because the cue already carries absolute time.
    fn cue_block(
        &self,
        data: &[u8],
        cue_time: u64,
        duration_raw: Option<u64>,
        additions: Option<Vec<u8>>,
    ) -> Option<SubtitleBlock> {
        let header = parse_block_header(data).ok()?;
        if !self.tracks.contains(&header.track_number) {
            return None;
        }
        Some(SubtitleBlock {
            track_number: header.track_number,
            timestamp_ms: self.raw_to_ms(cue_time),
            duration_ms: duration_raw.map(|d| self.raw_to_ms(d)),
            payload: data[header.payload_offset..].to_vec(),
            additions,
        })
    }

    /// Build a subtitle block from cluster-walk block data, combining the
    /// cluster timestamp with the block's signed relative timestamp.
    fn linear_block(
        &self,
        data: &[u8],
        cluster_ts: u64,
        duration_raw: Option<u64>,
        additions: Option<Vec<u8>>,
    ) -> Option<SubtitleBlock> {
        let header = parse_block_header(data).ok()?;
        if !self.tracks.contains(&header.track_number) {
            return None;
        }
        let raw = (cluster_ts as i64 + header.relative_timestamp as i64).max(0) as u64;
        Some(SubtitleBlock {
            track_number: header.track_number,
            timestamp_ms: self.raw_to_ms(raw),
            duration_ms: duration_raw.map(|d| self.raw_to_ms(d)),
            payload: data[header.payload_offset..].to_vec(),
            additions,
        })
    }

    /// Probe the cluster header at `cluster_position` (relative to the
    /// Segment data start) and return its header width.
    async fn probe_cluster_header(&self, cluster_position: u64) -> Result<Option<usize>> {
        let offset = self.segment.data_offset + cluster_position;
        match self.read_header(offset).await? {
            Some(header) if header.id == elements::CLUSTER => Ok(Some(header.header_size)),
            _ => Ok(None),
        }
    }

    /// Parse an element header at an absolute file offset. `None` means
    /// the bytes there do not parse as a header.
    async fn read_header(&self, offset: u64) -> Result<Option<ElementHeader>> {
        let head = self.reader.read(offset, HEADER_PEEK_LEN).await?;
        Ok(ElementHeader::parse(&head, 0).ok())
    }

    /// Read one whole element (header plus data) at an absolute offset.
    async fn read_element_at(&self, offset: u64) -> Result<Option<(ElementHeader, Bytes)>> {
        let Some(header) = self.read_header(offset).await? else {
            return Ok(None);
        };
        let Some(size) = header.size else {
            return Ok(None);
        };
        let data = self
            .reader
            .read(offset + header.header_size as u64, size)
            .await?;
        Ok(Some((header, data)))
    }

    /// Linear cluster scan from `start` to the Segment end.
    pub(crate) async fn fetch_linear(&self, start: u64) -> Result<Vec<SubtitleBlock>> {
        let end = self.segment.end_offset().min(self.reader.file_size());
        let mut blocks = Vec::new();
        let mut pos = start;

        while pos < end {
            let Some(header) = self.read_header(pos).await? else {
                break;
            };
            let data_offset = pos + header.header_size as u64;

            if header.id == elements::CLUSTER {
                let (cluster_blocks, next) = self.walk_cluster(data_offset, header.size).await?;
                blocks.extend(cluster_blocks);
                pos = next;
            } else {
                match header.size {
                    Some(size) => pos = data_offset + size,
                    // Unknown size is only legal on Segment and Cluster.
                    None => break,
                }
            }
        }

        Ok(blocks)
    }

    /// Walk one cluster's children, extracting subtitle blocks.
    ///
    /// Returns the blocks and the position where the scan should resume.
    /// For an unknown-size cluster the children run until the next
    /// Segment-level element, which acts as the cluster's end sentinel.
    async fn walk_cluster(
        &self,
        data_offset: u64,
        size: Option<u64>,
    ) -> Result<(Vec<SubtitleBlock>, u64)> {
        let file_end = self.segment.end_offset().min(self.reader.file_size());
        let end = match size {
            Some(size) => (data_offset + size).min(file_end),
            None => file_end,
        };
        let unknown_size = size.is_none();

        let mut blocks = Vec::new();
        let mut cluster_ts = 0u64;
        let mut pos = data_offset;

        while pos < end {
            let Some(header) = self.read_header(pos).await? else {
                break;
            };
            if unknown_size && elements::is_segment_level_id(header.id) {
                break;
            }
            let child_offset = pos + header.header_size as u64;
            let Some(child_size) = header.size else {
                break;
            };

            match header.id {
                elements::CLUSTER_TIMESTAMP => {
                    let data = self.reader.read(child_offset, child_size).await?;
                    cluster_ts = ebml::read_uint(&data).unwrap_or(0);
                }
                elements::SIMPLE_BLOCK => {
                    let peek = self
                        .reader
                        .read(child_offset, BLOCK_PEEK_LEN.min(child_size))
                        .await?;
                    if let Ok(track) = block_track_number(&peek) {
                        if self.tracks.contains(&track) {
                            let data = self.reader.read(child_offset, child_size).await?;
                            blocks.extend(self.linear_block(&data, cluster_ts, None, None));
                        }
                    }
                }
                elements::BLOCK_GROUP => {
                    let peek = self
                        .reader
                        .read(child_offset, GROUP_PEEK_LEN.min(child_size))
                        .await?;
                    // An inconclusive peek errs on the side of fetching.
                    let wanted = match group_block_track(&peek) {
                        Some(track) => self.tracks.contains(&track),
                        None => true,
                    };
                    if wanted {
                        let data = self.reader.read(child_offset, child_size).await?;
                        let parts = parse_block_group(&data);
                        if let Some(block_data) = parts.block {
                            blocks.extend(self.linear_block(
                                block_data,
                                cluster_ts,
                                parts.duration,
                                parts.additions,
                            ));
                        }
                    }
                }
                _ => {}
            }

            pos = child_offset + child_size;
        }

        let next = if unknown_size { pos } else { end };
        Ok((blocks, next))
    }
}

/// Parse the element at `offset` if both its header and its declared data
/// fit inside the buffer.
fn element_in_buffer(buf: &[u8], offset: usize) -> Option<(u64, &[u8])> {
    let header = ElementHeader::parse(buf, offset).ok()?;
    let size = header.size? as usize;
    let start = offset + header.header_size;
    let end = start.checked_add(size)?;
    if end > buf.len() {
        return None;
    }
    Some((header.id, &buf[start..end]))
}

/// Find the inner Block's track number from a short peek of a BlockGroup.
///
/// `None` means the peek was inconclusive (the Block header lies beyond
/// the peeked bytes).
fn group_block_track(peek: &[u8]) -> Option<u64> {
    let mut pos = 0usize;
    while pos < peek.len() {
        let header = ElementHeader::parse(peek, pos).ok()?;
        let size = header.size?;
        let data_start = pos + header.header_size;
        if header.id == elements::BLOCK {
            if data_start >= peek.len() {
                return None;
            }
            return block_track_number(&peek[data_start..]).ok();
        }
        pos = data_start.checked_add(size as usize)?;
    }
    None
}

/// Pick the batch-merge threshold from the median gap between consecutive
/// targets.
///
/// Clustered data (median under 2 MiB) merges aggressively at twice the
/// median, clamped to [32 KiB, 2 MiB]. Widely spaced data keeps a fixed
/// 128 KiB threshold so only coincidentally close pairs merge.
fn batch_threshold(targets: &[Target]) -> u64 {
    let mut gaps: Vec<u64> = targets
        .windows(2)
        .map(|pair| pair[1].offset - pair[0].offset)
        .collect();
    if gaps.is_empty() {
        return MIN_BATCH_THRESHOLD;
    }
    gaps.sort_unstable();
    let median = gaps[gaps.len() / 2];

    if median < SPARSE_GAP_CUTOFF {
        (median * 2).clamp(MIN_BATCH_THRESHOLD, MAX_BATCH_THRESHOLD)
    } else {
        SPARSE_THRESHOLD
    }
}

/// Group sorted targets into batches: a new batch starts whenever the gap
/// to the previous target exceeds the threshold.
fn group_batches(targets: Vec<Target>, threshold: u64) -> Vec<Vec<Target>> {
    let mut batches: Vec<Vec<Target>> = Vec::new();
    for target in targets {
        match batches.last_mut() {
            Some(batch) => {
                let previous = batch[batch.len() - 1].offset;
                if target.offset - previous > threshold {
                    batches.push(vec![target]);
                } else {
                    batch.push(target);
                }
            }
            None => batches.push(vec![target]),
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(offsets: &[u64]) -> Vec<Target> {
        offsets.iter().map(|&offset| Target { offset, time: 0 }).collect()
    }

    #[test]
    fn test_batch_threshold_clustered() {
        // Gaps 50, 50, 189900: median 50, doubled then clamped up to 32 KiB.
        let t = targets(&[10_000, 10_050, 10_100, 200_000]);
        assert_eq!(batch_threshold(&t), MIN_BATCH_THRESHOLD);
    }

    #[test]
    fn test_batch_threshold_scales_with_median() {
        // Median gap 64 KiB: threshold is twice that.
        let t = targets(&[0, 65_536, 131_072]);
        assert_eq!(batch_threshold(&t), 131_072);
    }

    #[test]
    fn test_batch_threshold_sparse() {
        let gap = 3 * 1024 * 1024;
        let t = targets(&[0, gap, 2 * gap]);
        assert_eq!(batch_threshold(&t), SPARSE_THRESHOLD);
    }

    #[test]
    fn test_batch_threshold_upper_clamp() {
        let gap = 1_900_000; // just under the 2 MiB cutoff; doubled exceeds it
        let t = targets(&[0, gap, 2 * gap]);
        assert_eq!(batch_threshold(&t), MAX_BATCH_THRESHOLD);
    }

    #[test]
    fn test_batch_threshold_single_target() {
        assert_eq!(batch_threshold(&targets(&[42])), MIN_BATCH_THRESHOLD);
    }

    #[test]
    fn test_group_batches_two_groups() {
        // The literal batching scenario: three close targets and one far
        // away become exactly two batches (two range requests).
        let t = targets(&[10_000, 10_050, 10_100, 200_000]);
        let threshold = batch_threshold(&t);
        let batches = group_batches(t, threshold);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn test_group_batches_all_merged() {
        let t = targets(&[0, 10, 20, 30]);
        let batches = group_batches(t, 32 * 1024);
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_element_in_buffer() {
        let buf = [0xA3, 0x82, 0x01, 0x02, 0xFF];
        let (id, data) = element_in_buffer(&buf, 0).unwrap();
        assert_eq!(id, elements::SIMPLE_BLOCK);
        assert_eq!(data, &[0x01, 0x02]);

        // Declared size overflows the buffer.
        let buf = [0xA3, 0x90, 0x01, 0x02];
        assert!(element_in_buffer(&buf, 0).is_none());
    }

    #[test]
    fn test_group_block_track() {
        // BlockGroup children: a Block for track 2.
        let peek = [0xA1, 0x84, 0x82, 0x00, 0x00, 0x00];
        assert_eq!(group_block_track(&peek), Some(2));

        // A ReferenceBlock (0xFB) before the Block.
        let peek = [0xFB, 0x81, 0x01, 0xA1, 0x84, 0x83, 0x00, 0x00, 0x00];
        assert_eq!(group_block_track(&peek), Some(3));

        // No Block inside the peek.
        let peek = [0xFB, 0x81, 0x01];
        assert_eq!(group_block_track(&peek), None);
    }
}
