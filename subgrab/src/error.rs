//! Error types for the extraction pipeline.

use subgrab_mkv::MkvError;
use thiserror::Error;

/// Errors raised by subtitle extraction.
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered the initial probe without Range support, and
    /// full download was not opted into.
    #[error("Server does not support range requests: {url}")]
    RangeNotSupported {
        /// The URL that was probed.
        url: String,
    },

    /// Structural Matroska parse failure (missing EBML header, Segment, or
    /// Tracks). Element-level malformations never surface here; parsers
    /// stop the affected iteration and keep what they collected.
    #[error("MKV parse error: {0}")]
    Parse(#[from] MkvError),

    /// Unexpected HTTP status on a read after initialization.
    #[error("HTTP status {status} reading bytes {start}-{end}")]
    Transport {
        /// The HTTP status code received.
        status: u16,
        /// First byte of the requested range.
        start: u64,
        /// Last byte of the requested range (inclusive).
        end: u64,
    },

    /// A response was missing or malformed where the protocol requires it
    /// (e.g. a 206 without a parseable `Content-Range`).
    #[error("Invalid HTTP response: {0}")]
    InvalidResponse(String),

    /// Transport failure from the default HTTP client.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure from an injected fetch implementation or the task runtime.
    #[error("{0}")]
    Other(String),
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::RangeNotSupported {
            url: "https://example.com/video.mkv".into(),
        };
        assert!(err.to_string().contains("https://example.com/video.mkv"));

        let err = Error::Transport {
            status: 503,
            start: 1024,
            end: 2047,
        };
        assert_eq!(err.to_string(), "HTTP status 503 reading bytes 1024-2047");
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = MkvError::MissingElement("Tracks").into();
        assert!(matches!(err, Error::Parse(MkvError::MissingElement("Tracks"))));
    }
}
