//! Blocking reader over [`std::io::Read`].

use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use tar_header::EntryHeader;

use crate::archive::{Archive, Next, DRAIN_BUF_SIZE};
use crate::error::{Error, Result};
use crate::options::ReaderOptions;

/// Sequential reader yielding one entry at a time from a tar stream.
///
/// Each [`Entry`] mutably borrows the reader, so at most one entry is live.
/// Whatever part of an entry was not read is skipped automatically by the
/// next call to [`next_entry`](TarReader::next_entry).
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use tar_reader::TarReader;
///
/// # let mut data = Vec::new();
/// # {
/// #     let mut builder = tar::Builder::new(&mut data);
/// #     let mut header = tar::Header::new_ustar();
/// #     header.set_size(5);
/// #     builder.append_data(&mut header, "hello.txt", &b"hello"[..]).unwrap();
/// #     builder.finish().unwrap();
/// # }
/// let mut reader = TarReader::new(&data[..]);
/// while let Some(mut entry) = reader.next_entry()? {
///     let mut content = String::new();
///     entry.content().read_to_string(&mut content)?;
///     println!("{}: {content}", entry.header().name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TarReader<R> {
    inner: Option<R>,
    archive: Archive,
}

fn stream<R>(inner: &mut Option<R>) -> Result<&mut R> {
    inner
        .as_mut()
        .ok_or(Error::InvalidState("reader is closed"))
}

impl<R: Read> TarReader<R> {
    /// Create a reader with default options.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    /// Create a reader with the given options.
    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Self {
            inner: Some(reader),
            archive: Archive::new(options),
        }
    }

    /// Advance to the next entry.
    ///
    /// The previous entry, if any, is closed first and its unread payload
    /// and padding skipped. Returns `Ok(None)` at the end of the archive:
    /// two consecutive empty blocks or the end of the stream. After that
    /// every call returns `Ok(None)` without reading.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the reader was closed or failed earlier.
    /// - [`Error::Header`] if the header block cannot be decoded; the reader
    ///   is unusable afterwards.
    /// - [`Error::UnexpectedEof`] for truncation when
    ///   [`ReaderOptions::strict_eof`] is set.
    /// - [`Error::Io`] for errors from the underlying reader.
    pub fn next_entry(&mut self) -> Result<Option<Entry<'_, R>>> {
        if !self.archive.begin_next()? || !self.drain()? {
            return Ok(None);
        }

        loop {
            let n = match stream(&mut self.inner)?.read(self.archive.block_unfilled()) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            match self.archive.on_block_read(n)? {
                None => continue,
                Some(Next::End) => return Ok(None),
                Some(Next::Entry(header)) => {
                    return Ok(Some(Entry {
                        reader: self,
                        header,
                    }))
                }
            }
        }
    }

    /// Skip whatever is left of a closed entry.
    ///
    /// Returns `false` if the stream ended first and the archive is over.
    fn drain(&mut self) -> Result<bool> {
        let mut buf = [0u8; DRAIN_BUF_SIZE];
        while self.archive.drain_remaining() > 0 {
            let want = self.archive.drain_limit(buf.len());
            let n = match stream(&mut self.inner)?.read(&mut buf[..want]) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if !self.archive.on_drained(n)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<R> TarReader<R> {
    /// Close the reader and drop the underlying stream.
    ///
    /// Closing twice is harmless. Any later [`next_entry`](Self::next_entry)
    /// fails with [`Error::InvalidState`].
    pub fn close(&mut self) {
        self.archive.close();
        self.inner = None;
    }

    /// Consume the reader, returning the underlying stream unless it was
    /// closed.
    ///
    /// The stream is left wherever reading stopped, possibly in the middle
    /// of an entry.
    pub fn into_inner(self) -> Option<R> {
        self.inner
    }

    /// Number of bytes consumed from the underlying stream.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.archive.position()
    }

    /// Get the options this reader was created with.
    #[must_use]
    pub fn options(&self) -> &ReaderOptions {
        self.archive.options()
    }
}

/// The entry most recently returned by [`TarReader::next_entry`].
#[derive(Debug)]
pub struct Entry<'a, R> {
    reader: &'a mut TarReader<R>,
    header: EntryHeader,
}

impl<R: Read> Entry<'_, R> {
    /// The decoded header.
    #[must_use]
    pub fn header(&self) -> &EntryHeader {
        &self.header
    }

    /// A view of this entry's payload.
    ///
    /// Views created one after another share the read position.
    pub fn content(&mut self) -> Content<'_, R> {
        Content {
            reader: &mut *self.reader,
        }
    }

    /// Close the entry, skipping its unread payload and padding now rather
    /// than on the next [`TarReader::next_entry`].
    pub fn close(self) -> Result<()> {
        self.reader.archive.close_entry();
        self.reader.drain().map(drop)
    }

    /// Release the reader borrow, keeping only the header.
    #[must_use]
    pub fn into_header(self) -> EntryHeader {
        self.header
    }
}

/// Read-only, forward-only view of one entry's payload.
///
/// Reads never go past the payload length declared in the header. Writing
/// and seeking are rejected with [`Error::Unsupported`], except that
/// `seek(SeekFrom::Current(0))` reports the current position.
#[derive(Debug)]
pub struct Content<'a, R> {
    reader: &'a mut TarReader<R>,
}

impl<R: Read> Content<'_, R> {
    /// Bytes of payload read so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.reader.archive.content_position()
    }

    /// Declared payload length.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.reader.archive.content_len()
    }

    /// Returns true if the entry has no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes of payload not yet read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.reader.archive.content_remaining()
    }

    /// Close the entry, skipping to the start of the next header.
    ///
    /// Closing again is a no-op. Reads after closing fail with
    /// [`Error::InvalidState`].
    pub fn close(&mut self) -> Result<()> {
        self.reader.archive.close_entry();
        self.reader.drain().map(drop)
    }
}

impl<R: Read> Read for Content<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = self.reader.archive.content_limit(buf.len())?;
        if limit == 0 {
            return Ok(0);
        }
        let n = stream(&mut self.reader.inner)?.read(&mut buf[..limit])?;
        Ok(self.reader.archive.on_content_read(limit, n)?)
    }
}

impl<R: Read> Write for Content<'_, R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(Error::Unsupported("write").into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.reader.archive.ensure_entry_open()?)
    }
}

impl<R: Read> Seek for Content<'_, R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Current(0) => {
                self.reader.archive.ensure_entry_open()?;
                Ok(self.position())
            }
            _ => Err(Error::Unsupported("seek").into()),
        }
    }
}
