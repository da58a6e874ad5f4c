//! Matroska-specific error types.

use thiserror::Error;

/// Errors raised while parsing Matroska/EBML structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MkvError {
    /// Invalid variable-length integer.
    #[error("Invalid VINT encoding at offset {offset}")]
    InvalidVint {
        /// Byte offset where the invalid VINT was found.
        offset: u64,
    },

    /// Invalid element ID.
    #[error("Invalid element ID at offset {offset}")]
    InvalidElementId {
        /// Byte offset where the invalid ID was found.
        offset: u64,
    },

    /// VINT overflow (width larger than 8 bytes).
    #[error("VINT overflow: width exceeds 8 bytes")]
    VintOverflow,

    /// Buffer ended before the element did.
    #[error("Unexpected end of buffer at offset {offset} (needed {needed} bytes)")]
    UnexpectedEof {
        /// Byte offset where the read started.
        offset: u64,
        /// How many bytes the read needed.
        needed: u64,
    },

    /// Missing required element.
    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    /// Invalid element value (wrong length for the type, bad UTF-8, ...).
    #[error("Invalid {kind} value at offset {offset}: {message}")]
    InvalidValue {
        /// The EBML value type being read.
        kind: &'static str,
        /// Byte offset of the value data.
        offset: u64,
        /// Description of the problem.
        message: String,
    },

    /// Invalid block structure.
    #[error("Invalid block structure: {0}")]
    InvalidBlock(String),
}

/// Result type for Matroska parsing operations.
pub type Result<T> = std::result::Result<T, MkvError>;
