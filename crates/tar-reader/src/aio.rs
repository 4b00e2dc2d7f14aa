//! Async reader over [`tokio::io::AsyncRead`].
//!
//! This mirrors the blocking [`TarReader`](crate::TarReader). Dropping any
//! future here part way through leaves the reader describing exactly what
//! was consumed, and the next call picks up where it stopped (mid-drain or
//! mid-header).

use std::io::{self, ErrorKind, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tar_header::EntryHeader;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncWrite, ReadBuf};

use crate::archive::{Archive, Next, DRAIN_BUF_SIZE};
use crate::error::{Error, Result};
use crate::options::ReaderOptions;

/// Async counterpart of [`TarReader`](crate::TarReader).
///
/// # Example
///
/// ```
/// use tokio::io::AsyncReadExt;
/// use tar_reader::AsyncTarReader;
///
/// # let mut data = Vec::new();
/// # {
/// #     let mut builder = tar::Builder::new(&mut data);
/// #     let mut header = tar::Header::new_ustar();
/// #     header.set_size(5);
/// #     builder.append_data(&mut header, "hello.txt", &b"hello"[..]).unwrap();
/// #     builder.finish().unwrap();
/// # }
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let mut reader = AsyncTarReader::new(&data[..]);
/// while let Some(mut entry) = reader.next_entry().await? {
///     let mut content = String::new();
///     entry.content().read_to_string(&mut content).await?;
///     println!("{}: {content}", entry.header().name());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
#[derive(Debug)]
pub struct AsyncTarReader<R> {
    inner: Option<R>,
    archive: Archive,
}

fn stream<R>(inner: &mut Option<R>) -> Result<&mut R> {
    inner
        .as_mut()
        .ok_or(Error::InvalidState("reader is closed"))
}

impl<R: AsyncRead + Unpin> AsyncTarReader<R> {
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
    /// See [`TarReader::next_entry`](crate::TarReader::next_entry).
    pub async fn next_entry(&mut self) -> Result<Option<AsyncEntry<'_, R>>> {
        if !self.archive.begin_next()? || !self.drain().await? {
            return Ok(None);
        }

        loop {
            let n = match stream(&mut self.inner)?
                .read(self.archive.block_unfilled())
                .await
            {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            match self.archive.on_block_read(n)? {
                None => continue,
                Some(Next::End) => return Ok(None),
                Some(Next::Entry(header)) => {
                    return Ok(Some(AsyncEntry {
                        reader: self,
                        header,
                    }))
                }
            }
        }
    }

    async fn drain(&mut self) -> Result<bool> {
        let mut buf = [0u8; DRAIN_BUF_SIZE];
        while self.archive.drain_remaining() > 0 {
            let want = self.archive.drain_limit(buf.len());
            let n = match stream(&mut self.inner)?.read(&mut buf[..want]).await {
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

impl<R> AsyncTarReader<R> {
    /// Close the reader and drop the underlying stream.
    pub fn close(&mut self) {
        self.archive.close();
        self.inner = None;
    }

    /// Consume the reader, returning the underlying stream unless it was
    /// closed.
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

/// The entry most recently returned by [`AsyncTarReader::next_entry`].
#[derive(Debug)]
pub struct AsyncEntry<'a, R> {
    reader: &'a mut AsyncTarReader<R>,
    header: EntryHeader,
}

impl<R: AsyncRead + Unpin> AsyncEntry<'_, R> {
    /// The decoded header.
    #[must_use]
    pub fn header(&self) -> &EntryHeader {
        &self.header
    }

    /// A view of this entry's payload.
    pub fn content(&mut self) -> AsyncContent<'_, R> {
        AsyncContent {
            reader: &mut *self.reader,
        }
    }

    /// Close the entry, skipping its unread payload and padding now.
    pub async fn close(self) -> Result<()> {
        self.reader.archive.close_entry();
        self.reader.drain().await.map(drop)
    }

    /// Release the reader borrow, keeping only the header.
    #[must_use]
    pub fn into_header(self) -> EntryHeader {
        self.header
    }
}

/// Async view of one entry's payload; see [`Content`](crate::Content).
#[derive(Debug)]
pub struct AsyncContent<'a, R> {
    reader: &'a mut AsyncTarReader<R>,
}

impl<R: AsyncRead + Unpin> AsyncContent<'_, R> {
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
    pub async fn close(&mut self) -> Result<()> {
        self.reader.archive.close_entry();
        self.reader.drain().await.map(drop)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for AsyncContent<'_, R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let limit = this.reader.archive.content_limit(buf.remaining())?;
        if limit == 0 {
            return Poll::Ready(Ok(()));
        }

        let inner = stream(&mut this.reader.inner)?;
        let n = {
            let mut limited = ReadBuf::new(buf.initialize_unfilled_to(limit));
            ready!(Pin::new(inner).poll_read(cx, &mut limited))?;
            limited.filled().len()
        };
        let n = this.reader.archive.on_content_read(limit, n)?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl<R: AsyncRead + Unpin> AsyncWrite for AsyncContent<'_, R> {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(Error::Unsupported("write").into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(self.reader.archive.ensure_entry_open()?))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(Error::Unsupported("shutdown").into()))
    }
}

impl<R: AsyncRead + Unpin> AsyncSeek for AsyncContent<'_, R> {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        match position {
            SeekFrom::Current(0) => Ok(()),
            _ => Err(Error::Unsupported("seek").into()),
        }
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        self.reader.archive.ensure_entry_open()?;
        Poll::Ready(Ok(self.position()))
    }
}
