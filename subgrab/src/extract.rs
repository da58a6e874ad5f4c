//! The extraction orchestrator: wires the reader, the metadata parsers,
//! the block fetcher, and the assemblers into one call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use subgrab_mkv::attachments::{parse_attachments, FontFile};
use subgrab_mkv::cues::{parse_cues, CueEntry};
use subgrab_mkv::ebml::ElementHeader;
use subgrab_mkv::elements;
use subgrab_mkv::error::MkvError;
use subgrab_mkv::segment::{parse_segment_prefix, scan_segment, Segment, SegmentScan};
use subgrab_mkv::tracks::{parse_tracks, SubtitleTrack};
use subgrab_subtitle::{ass, srt, vtt, SubtitleBlock, SubtitleFormat};

use crate::blocks::BlockFetcher;
use crate::error::Result;
use crate::fetch::ReqwestFetch;
use crate::options::ExtractOptions;
use crate::reader::{RangeReader, INIT_PROBE_LEN};

/// Bytes fetched when parsing a lone element header.
const HEADER_PEEK_LEN: u64 = 16;

/// One extracted subtitle track.
#[derive(Debug, Clone)]
pub struct TrackResult {
    /// Output format, derived from the track's CodecID.
    pub format: SubtitleFormat,
    /// Matroska track number.
    pub track_number: u64,
    /// Track language, when the file declared one.
    pub language: Option<String>,
    /// Track name, when the file declared one.
    pub track_name: Option<String>,
    /// The reconstructed subtitle file (UTF-8).
    pub subtitle: Vec<u8>,
    /// Embedded fonts. `Some` only for ASS/SSA tracks; the same list is
    /// shared across all ASS/SSA results of a call.
    pub fonts: Option<Arc<[FontFile]>>,
}

/// Extract all subtitle tracks (and their fonts) from a remote MKV.
///
/// Only the bytes needed for metadata and subtitle blocks are downloaded,
/// via HTTP Range requests. On any error the whole call fails; no partial
/// track list is returned.
pub async fn extract_subtitles(url: &str, options: ExtractOptions) -> Result<Vec<TrackResult>> {
    let fetch = options
        .fetch
        .clone()
        .unwrap_or_else(|| Arc::new(ReqwestFetch::new()));
    let reader = Arc::new(
        RangeReader::open(
            url,
            fetch,
            options.headers.clone(),
            options.allow_full_download,
        )
        .await?,
    );

    // The prefix is a cache hit: initialization primed the line at 0.
    let prefix = reader.read(0, INIT_PROBE_LEN).await?;
    let segment = parse_segment_prefix(&prefix, reader.file_size())?;
    let scan = scan_segment(&prefix, &segment);
    debug!(
        segment_data_offset = segment.data_offset,
        segment_data_size = segment.data_size,
        timestamp_scale = scan.info.timestamp_scale,
        seeks = scan.seeks.len(),
        "parsed segment metadata"
    );

    let tracks_offset = scan
        .seek_position(elements::TRACKS, &segment)
        .or(scan.tracks_offset)
        .ok_or(MkvError::MissingElement("Tracks"))?;
    let tracks_body = read_element_body(&reader, tracks_offset, elements::TRACKS)
        .await?
        .ok_or(MkvError::MissingElement("Tracks"))?;
    let mut tracks = parse_tracks(&tracks_body);
    debug!(tracks = tracks.len(), "parsed subtitle tracks");

    if let Some(languages) = &options.languages {
        let wanted: HashSet<String> = languages.iter().map(|l| l.to_lowercase()).collect();
        tracks.retain(|track| {
            track
                .language
                .as_ref()
                .is_some_and(|l| wanted.contains(&l.to_lowercase()))
        });
    }
    if tracks.is_empty() {
        return Ok(Vec::new());
    }

    let fonts = load_fonts(&reader, &segment, &scan).await?;

    let track_set: Arc<HashSet<u64>> = Arc::new(tracks.iter().map(|t| t.number).collect());
    let cues = load_cues(&reader, &segment, &scan, &track_set).await?;

    let fetcher = BlockFetcher::new(
        Arc::clone(&reader),
        segment,
        scan.info.timestamp_scale,
        Arc::clone(&track_set),
    );
    let first_cluster = scan
        .first_cluster_offset
        .or_else(|| scan.seek_position(elements::CLUSTER, &segment))
        .unwrap_or(segment.data_offset);

    let blocks = if cues.is_empty() {
        fetcher.fetch_linear(first_cluster).await?
    } else {
        match fetcher
            .fetch_targeted(&cues, options.effective_concurrency())
            .await?
        {
            Some(blocks) => blocks,
            None => {
                debug!("cluster probe failed, falling back to linear scan");
                fetcher.fetch_linear(first_cluster).await?
            }
        }
    };

    let mut by_track: HashMap<u64, Vec<SubtitleBlock>> = HashMap::new();
    for block in blocks {
        by_track.entry(block.track_number).or_default().push(block);
    }

    let results: Vec<TrackResult> = tracks
        .iter()
        .map(|track| assemble_track(track, by_track.remove(&track.number).unwrap_or_default(), &fonts))
        .collect();

    let stats = reader.stats();
    info!(
        tracks = results.len(),
        bytes_downloaded = stats.bytes_downloaded,
        requests = stats.request_count,
        "extraction complete"
    );
    Ok(results)
}

fn assemble_track(
    track: &SubtitleTrack,
    blocks: Vec<SubtitleBlock>,
    fonts: &Arc<[FontFile]>,
) -> TrackResult {
    let format = SubtitleFormat::from_codec_id(&track.codec_id);
    let codec_private = track.codec_private.as_deref();

    let subtitle = match format {
        SubtitleFormat::Srt => srt::assemble(&blocks),
        SubtitleFormat::Ass | SubtitleFormat::Ssa => ass::assemble(codec_private, &blocks),
        SubtitleFormat::WebVtt => vtt::assemble(codec_private, &blocks),
    };

    TrackResult {
        format,
        track_number: track.number,
        language: track.language.clone(),
        track_name: track.name.clone(),
        subtitle,
        fonts: format.uses_fonts().then(|| Arc::clone(fonts)),
    }
}

async fn load_fonts(
    reader: &RangeReader,
    segment: &Segment,
    scan: &SegmentScan,
) -> Result<Arc<[FontFile]>> {
    let offset = scan
        .seek_position(elements::ATTACHMENTS, segment)
        .or(scan.attachments_offset);
    let Some(offset) = offset else {
        return Ok(Arc::from(Vec::<FontFile>::new()));
    };
    let Some(body) = read_element_body(reader, offset, elements::ATTACHMENTS).await? else {
        return Ok(Arc::from(Vec::<FontFile>::new()));
    };
    let fonts = parse_attachments(&body);
    debug!(fonts = fonts.len(), "parsed font attachments");
    Ok(Arc::from(fonts))
}

async fn load_cues(
    reader: &RangeReader,
    segment: &Segment,
    scan: &SegmentScan,
    track_set: &HashSet<u64>,
) -> Result<Vec<CueEntry>> {
    let offset = scan
        .seek_position(elements::CUES, segment)
        .or(scan.cues_offset);
    let Some(offset) = offset else {
        return Ok(Vec::new());
    };
    let Some(body) = read_element_body(reader, offset, elements::CUES).await? else {
        return Ok(Vec::new());
    };
    let cues: Vec<CueEntry> = parse_cues(&body)
        .into_iter()
        .filter(|cue| track_set.contains(&cue.track))
        .collect();
    debug!(cues = cues.len(), "parsed cue index");
    Ok(cues)
}

/// Read one element's body in two fetches: header first, then the body
/// sized to the header's declared length.
///
/// `None` when the bytes at `offset` are not the expected element; the
/// caller decides whether that is fatal.
async fn read_element_body(
    reader: &RangeReader,
    offset: u64,
    expected_id: u64,
) -> Result<Option<Bytes>> {
    let head = reader.read(offset, HEADER_PEEK_LEN).await?;
    let Ok(header) = ElementHeader::parse(&head, 0) else {
        return Ok(None);
    };
    if header.id != expected_id {
        return Ok(None);
    }
    let Some(size) = header.size else {
        return Ok(None);
    };
    let body = reader.read(offset + header.header_size as u64, size).await?;
    Ok(Some(body))
}
