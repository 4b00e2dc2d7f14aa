//! Sequential, forward-only reader for tar archives.
//!
//! A tar archive is a run of 512-byte header blocks, each followed by the
//! entry's payload padded to the next block boundary, terminated by two
//! all-zero blocks (or simply by the end of the stream). This crate walks
//! such a stream exactly once, without seeking and without buffering whole
//! entries:
//!
//! - [`TarReader`] works over any [`std::io::Read`].
//! - [`AsyncTarReader`] works over any [`tokio::io::AsyncRead`].
//!
//! Both hand out one entry at a time. An entry's payload is read through a
//! bounded view ([`Content`] / [`AsyncContent`]) that never returns bytes
//! past the declared size, and whatever the caller leaves unread is skipped
//! when advancing to the next entry.
//!
//! Header decoding lives in the [`tar_header`] crate; the types callers see
//! are re-exported here.
//!
//! # Leniency
//!
//! By default the reader follows what most archivers tolerate: checksums
//! are not verified and an archive that stops early simply ends. Use
//! [`ReaderOptions`] to tighten either behavior.

mod aio;
mod archive;
mod cursor;
mod error;
mod options;
mod sync;

pub use aio::{AsyncContent, AsyncEntry, AsyncTarReader};
pub use error::{Error, Result};
pub use options::ReaderOptions;
pub use sync::{Content, Entry, TarReader};
pub use tar_header::{EntryHeader, EntryType, HeaderError};
