//! Attachments parsing: embedded font extraction.

use crate::ebml;
use crate::elements;

/// An embedded font file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFile {
    /// Original attachment file name.
    pub name: String,
    /// Raw font bytes.
    pub data: Vec<u8>,
}

/// Font MIME types, compared case-insensitively.
const FONT_MIME_TYPES: &[&str] = &[
    "font/ttf",
    "font/otf",
    "font/woff",
    "font/woff2",
    "font/sfnt",
    "application/x-truetype-font",
    "application/vnd.ms-opentype",
    "application/font-sfnt",
    "application/x-font-ttf",
    "application/x-font-otf",
];

/// Font file extensions, compared case-insensitively.
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "woff", "woff2"];

/// Parse the body of an Attachments element, keeping only fonts.
pub fn parse_attachments(data: &[u8]) -> Vec<FontFile> {
    let mut fonts = Vec::new();
    for (header, entry) in ebml::children(data, 0, data.len()) {
        if header.id != elements::ATTACHED_FILE {
            continue;
        }
        if let Some(font) = parse_attached_file(entry) {
            fonts.push(font);
        }
    }
    fonts
}

fn parse_attached_file(entry: &[u8]) -> Option<FontFile> {
    let mut name = None;
    let mut mime = None;
    let mut data = None;

    for (header, child) in ebml::children(entry, 0, entry.len()) {
        match header.id {
            elements::FILE_NAME => name = ebml::read_string(child).ok(),
            elements::FILE_MIME_TYPE => mime = ebml::read_string(child).ok(),
            elements::FILE_DATA => data = Some(child.to_vec()),
            _ => {}
        }
    }

    let name = name.unwrap_or_default();
    let data = data?;
    if !is_font(mime.as_deref(), &name) {
        return None;
    }

    Some(FontFile { name, data })
}

/// Whether an attachment is a font, by MIME type or by file extension.
///
/// The extension fallback catches the common case of fonts attached with a
/// generic MIME like `application/octet-stream`.
pub fn is_font(mime: Option<&str>, name: &str) -> bool {
    if let Some(mime) = mime {
        let mime = mime.trim().to_ascii_lowercase();
        if FONT_MIME_TYPES.contains(&mime.as_str()) || mime.starts_with("application/font-") {
            return true;
        }
    }

    match name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            FONT_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}
