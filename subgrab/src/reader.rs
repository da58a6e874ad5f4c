//! Seekable byte access over a remote resource via HTTP Range requests.
//!
//! The reader's only operation is `read(offset, length)`. A single
//! read-ahead cache line absorbs the small sequential reads the metadata
//! parsers issue; the block fetcher coalesces its own reads into batches,
//! so one line is all the caching this pipeline needs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fetch::Fetch;

/// Size of the initial probe read (also primes the cache at offset 0).
pub const INIT_PROBE_LEN: u64 = 256 * 1024;

/// Minimum size of a cache-miss read.
const MIN_READ_LEN: u64 = 32 * 1024;

/// Download counters, monotonically increasing over the reader's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    /// Total body bytes received.
    pub bytes_downloaded: u64,
    /// Total HTTP requests issued.
    pub request_count: u64,
}

#[derive(Debug)]
struct CacheLine {
    offset: u64,
    data: Bytes,
}

/// A seekable view over a remote byte-addressed resource.
pub struct RangeReader {
    fetch: Arc<dyn Fetch>,
    url: String,
    extra_headers: Vec<(String, String)>,
    file_size: u64,
    /// Entire body, retained when the server ignored the Range probe and
    /// full download was opted into.
    full_body: Option<Bytes>,
    cache: Mutex<Option<CacheLine>>,
    bytes_downloaded: AtomicU64,
    request_count: AtomicU64,
}

impl std::fmt::Debug for RangeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeReader")
            .field("url", &self.url)
            .field("extra_headers", &self.extra_headers)
            .field("file_size", &self.file_size)
            .field("full_body", &self.full_body)
            .field("cache", &self.cache)
            .field("bytes_downloaded", &self.bytes_downloaded)
            .field("request_count", &self.request_count)
            .finish()
    }
}

impl RangeReader {
    /// Probe the URL for Range support and build a reader.
    ///
    /// A 206 confirms Range support and yields the file size from
    /// `Content-Range`. A 200 means the server sent the whole file: kept
    /// in memory when `allow_full_download` is set, rejected with
    /// [`Error::RangeNotSupported`] otherwise.
    pub async fn open(
        url: impl Into<String>,
        fetch: Arc<dyn Fetch>,
        extra_headers: Vec<(String, String)>,
        allow_full_download: bool,
    ) -> Result<Self> {
        let url = url.into();

        let mut headers = extra_headers.clone();
        headers.push(("Range".to_string(), format!("bytes=0-{}", INIT_PROBE_LEN - 1)));
        let response = fetch.send(&url, &headers).await?;

        let bytes_downloaded = response.body.len() as u64;
        let (file_size, full_body, cache) = match response.status {
            206 => {
                let content_range = response.header("content-range").ok_or_else(|| {
                    Error::InvalidResponse("206 without Content-Range header".to_string())
                })?;
                let file_size = parse_content_range_total(content_range).ok_or_else(|| {
                    Error::InvalidResponse(format!("unparseable Content-Range: {content_range}"))
                })?;
                debug!(url = %url, file_size, "range support confirmed");
                let line = CacheLine {
                    offset: 0,
                    data: response.body,
                };
                (file_size, None, Some(line))
            }
            200 if allow_full_download => {
                let file_size = response.body.len() as u64;
                debug!(url = %url, file_size, "no range support, using full download");
                (file_size, Some(response.body), None)
            }
            200 => return Err(Error::RangeNotSupported { url }),
            status => {
                return Err(Error::Transport {
                    status,
                    start: 0,
                    end: INIT_PROBE_LEN - 1,
                })
            }
        };

        Ok(Self {
            fetch,
            url,
            extra_headers,
            file_size,
            full_body,
            cache: Mutex::new(cache),
            bytes_downloaded: AtomicU64::new(bytes_downloaded),
            request_count: AtomicU64::new(1),
        })
    }

    /// Total size of the remote file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The URL this reader is bound to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current download counters.
    pub fn stats(&self) -> ReaderStats {
        ReaderStats {
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            request_count: self.request_count.load(Ordering::Relaxed),
        }
    }

    /// Read up to `length` bytes starting at `offset`.
    ///
    /// Reads past the end of file are clipped; a truncated response is
    /// returned verbatim so callers can retry with a larger read.
    pub async fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        if let Some(full) = &self.full_body {
            let start = offset.min(self.file_size) as usize;
            let end = offset.saturating_add(length).min(self.file_size) as usize;
            return Ok(full.slice(start..end));
        }

        if length == 0 || offset >= self.file_size {
            return Ok(Bytes::new());
        }
        let length = length.min(self.file_size - offset);

        if let Some(line) = &*self.cache.lock() {
            let line_end = line.offset + line.data.len() as u64;
            if offset >= line.offset && offset + length <= line_end {
                let start = (offset - line.offset) as usize;
                return Ok(line.data.slice(start..start + length as usize));
            }
        }

        let want = length.max(MIN_READ_LEN);
        let end = offset.saturating_add(want).min(self.file_size);
        let body = self.fetch_range(offset, end - 1).await?;

        let result = body.slice(0..(length as usize).min(body.len()));
        *self.cache.lock() = Some(CacheLine { offset, data: body });
        Ok(result)
    }

    async fn fetch_range(&self, start: u64, end: u64) -> Result<Bytes> {
        let mut headers = self.extra_headers.clone();
        headers.push(("Range".to_string(), format!("bytes={start}-{end}")));

        self.request_count.fetch_add(1, Ordering::Relaxed);
        let response = self.fetch.send(&self.url, &headers).await?;

        if response.status != 206 {
            return Err(Error::Transport {
                status: response.status,
                start,
                end,
            });
        }

        self.bytes_downloaded
            .fetch_add(response.body.len() as u64, Ordering::Relaxed);
        Ok(response.body)
    }
}

/// Parse the total size out of `Content-Range: bytes a-b/N`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-99/1000"), Some(1000));
        assert_eq!(parse_content_range_total("bytes 0-261143/52428800"), Some(52_428_800));
        assert_eq!(parse_content_range_total("bytes */1000"), Some(1000));
        assert_eq!(parse_content_range_total("bytes 0-99/*"), None);
        assert_eq!(parse_content_range_total("items 0-99/1000"), None);
        assert_eq!(parse_content_range_total(""), None);
    }
}
