//! Error types for reading tar archives.

use std::io;

use tar_header::HeaderError;
use thiserror::Error;

/// Errors that can occur while reading an archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header decoding error (malformed numeric field, checksum, etc.).
    #[error("header error: {0}")]
    Header(#[from] HeaderError),

    /// The reader or entry is closed, or an earlier error left it unusable.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// The operation is not supported on entry content.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The stream ended inside a header, payload or padding (strict mode only).
    #[error("unexpected EOF at position {pos}")]
    UnexpectedEof {
        /// Position in the stream where EOF occurred.
        pos: u64,
    },

    /// Entry size in header is invalid (overflow when computing padded size).
    #[error("invalid entry size: {0}")]
    InvalidSize(u64),
}

/// Result type for archive reading operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Io(inner) => return inner,
            Error::Header(_) | Error::InvalidSize(_) => io::ErrorKind::InvalidData,
            Error::Unsupported(_) => io::ErrorKind::Unsupported,
            Error::UnexpectedEof { .. } => io::ErrorKind::UnexpectedEof,
            Error::InvalidState(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
