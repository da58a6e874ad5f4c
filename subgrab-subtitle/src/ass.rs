//! ASS/SSA assembly.
//!
//! Matroska stores ASS events with the timing stripped: the block payload
//! is `ReadOrder,Layer,Style,Name,MarginL,MarginR,MarginV,Effect,Text` and
//! the timing lives in the block itself. Assembly reverses that: the
//! CodecPrivate header is emitted first, then one `Dialogue:` line per
//! block with the timing put back, ordered by ReadOrder.

use crate::types::{SubtitleBlock, SubtitleError, SubtitleResult, Timestamp};

/// The canonical Events format line written when the CodecPrivate header
/// does not already carry an `[Events]` section.
const FORMAT_LINE: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// A decoded ASS block payload.
///
/// All fields except `read_order` are kept verbatim; the text keeps any
/// commas beyond the first eight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssPayload {
    /// Original muxing order among Dialogue events.
    pub read_order: i64,
    /// Layer field, verbatim.
    pub layer: String,
    /// Style name, verbatim.
    pub style: String,
    /// Actor/name field, verbatim.
    pub name: String,
    /// Left margin, verbatim.
    pub margin_l: String,
    /// Right margin, verbatim.
    pub margin_r: String,
    /// Vertical margin, verbatim.
    pub margin_v: String,
    /// Effect field, verbatim.
    pub effect: String,
    /// Event text, verbatim, embedded commas included.
    pub text: String,
}

/// Split an ASS block payload on its first eight commas.
pub fn parse_block_payload(payload: &str) -> SubtitleResult<AssPayload> {
    let mut parts = payload.splitn(9, ',');
    let mut field = || parts.next().map(str::to_owned);

    let read_order_raw = field();
    let layer = field();
    let style = field();
    let name = field();
    let margin_l = field();
    let margin_r = field();
    let margin_v = field();
    let effect = field();
    let text = field();

    let (Some(read_order_raw), Some(text)) = (read_order_raw, text) else {
        return Err(SubtitleError::InvalidAssPayload(format!(
            "expected 9 comma-separated fields, got: {payload:?}"
        )));
    };

    Ok(AssPayload {
        read_order: read_order_raw.trim().parse().unwrap_or(0),
        layer: layer.unwrap_or_default(),
        style: style.unwrap_or_default(),
        name: name.unwrap_or_default(),
        margin_l: margin_l.unwrap_or_default(),
        margin_r: margin_r.unwrap_or_default(),
        margin_v: margin_v.unwrap_or_default(),
        effect: effect.unwrap_or_default(),
        text,
    })
}

/// Assemble an ASS/SSA file from the CodecPrivate header and the extracted
/// blocks.
///
/// The header decides the line-ending style (`\r\n` when it contains one,
/// `\n` otherwise). Dialogue lines are ordered by ReadOrder, not by
/// timestamp. Blocks whose payload does not parse are dropped.
pub fn assemble(codec_private: Option<&[u8]>, blocks: &[SubtitleBlock]) -> Vec<u8> {
    let header = codec_private
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default();
    let le = if header.contains("\r\n") { "\r\n" } else { "\n" };

    let mut events: Vec<(AssPayload, u64, u64)> = blocks
        .iter()
        .filter_map(|block| {
            let payload = String::from_utf8_lossy(&block.payload);
            let parsed = parse_block_payload(&payload).ok()?;
            Some((parsed, block.timestamp_ms, block.end_ms()))
        })
        .collect();
    events.sort_by_key(|(payload, _, _)| payload.read_order);

    let mut out = String::new();
    out.push_str(header.trim_end());
    out.push_str(le);
    if !header.contains("[Events]") {
        out.push_str(le);
        out.push_str("[Events]");
        out.push_str(le);
        out.push_str(FORMAT_LINE);
        out.push_str(le);
    }

    for (payload, start_ms, end_ms) in &events {
        out.push_str(&format!(
            "Dialogue: {},{},{},{},{},{},{},{},{},{}",
            payload.layer,
            Timestamp::from_millis(*start_ms).to_ass_string(),
            Timestamp::from_millis(*end_ms).to_ass_string(),
            payload.style,
            payload.name,
            payload.margin_l,
            payload.margin_r,
            payload.margin_v,
            payload.effect,
            payload.text
        ));
        out.push_str(le);
    }

    out.push_str(le);
    out.into_bytes()
}
