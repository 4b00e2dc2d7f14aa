//! Archive sequencing shared by the blocking and async readers.
//!
//! [`Archive`] owns every piece of reader state except the stream itself.
//! The frontends only move bytes: they ask where to read into and how much,
//! do the read in their own I/O model, and report the byte count back. All
//! decisions (decoding, end-of-archive detection, truncation policy) are
//! made here, so both frontends behave identically.

use log::{debug, trace, warn};
use tar_header::{decode_block, Block, EntryHeader, Header, HEADER_SIZE};

use crate::cursor::EntryCursor;
use crate::error::{Error, Result};
use crate::options::ReaderOptions;

/// Size of the scratch buffer used when skipping payload and padding.
pub(crate) const DRAIN_BUF_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    EndOfArchive,
    Closed,
    /// A decode error or strict-mode truncation; the stream position is
    /// no longer trustworthy.
    Failed,
}

/// A header block that may be filled across several reads.
#[derive(Debug)]
struct BlockBuffer {
    buf: [u8; HEADER_SIZE],
    filled: usize,
}

/// What a completed header read produced.
#[derive(Debug)]
pub(crate) enum Next {
    Entry(EntryHeader),
    End,
}

#[derive(Debug)]
pub(crate) struct Archive {
    options: ReaderOptions,
    phase: Phase,
    cursor: EntryCursor,
    block: BlockBuffer,
    /// Consecutive empty blocks seen since the last entry.
    empty_run: u8,
    /// Bytes consumed from the underlying stream.
    pos: u64,
}

impl Archive {
    pub(crate) fn new(options: ReaderOptions) -> Self {
        Self {
            options,
            phase: Phase::Active,
            cursor: EntryCursor::default(),
            block: BlockBuffer {
                buf: [0u8; HEADER_SIZE],
                filled: 0,
            },
            empty_run: 0,
            pos: 0,
        }
    }

    pub(crate) fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    fn check_usable(&self) -> Result<()> {
        match self.phase {
            Phase::Closed => Err(Error::InvalidState("reader is closed")),
            Phase::Failed => Err(Error::InvalidState("reader failed on an earlier error")),
            Phase::Active | Phase::EndOfArchive => Ok(()),
        }
    }

    /// Start advancing to the next entry.
    ///
    /// Returns `false` once the archive has ended; the caller must not touch
    /// the stream in that case. Otherwise the current entry is closed and
    /// its leftovers must be drained before reading the next header.
    pub(crate) fn begin_next(&mut self) -> Result<bool> {
        self.check_usable()?;
        if self.phase == Phase::EndOfArchive {
            return Ok(false);
        }
        self.cursor.close();
        Ok(true)
    }

    fn end(&mut self) {
        debug!("end of archive at position {}", self.pos);
        self.phase = Phase::EndOfArchive;
        self.cursor.invalidate();
        self.block.filled = 0;
    }

    fn fail(&mut self) {
        self.phase = Phase::Failed;
        self.cursor.invalidate();
        self.block.filled = 0;
    }

    /// The stream ended inside `what`.
    fn truncated(&mut self, what: &str) -> Result<()> {
        if self.options.strict_eof {
            self.fail();
            return Err(Error::UnexpectedEof { pos: self.pos });
        }
        warn!("archive truncated in {what} at position {}", self.pos);
        self.end();
        Ok(())
    }

    // =========================================================================
    // Draining
    // =========================================================================

    /// Close the current entry so that only draining is possible.
    pub(crate) fn close_entry(&mut self) {
        self.cursor.close();
    }

    pub(crate) fn drain_remaining(&self) -> u64 {
        self.cursor.drain_remaining()
    }

    /// How much of a scratch buffer of `buf_len` bytes the next drain read
    /// may fill.
    pub(crate) fn drain_limit(&self, buf_len: usize) -> usize {
        usize::try_from(self.drain_remaining()).map_or(buf_len, |r| r.min(buf_len))
    }

    /// Record a drain read of `n` bytes.
    ///
    /// Returns `false` if the stream ended and the archive is now over.
    pub(crate) fn on_drained(&mut self, n: usize) -> Result<bool> {
        if n == 0 {
            self.truncated("entry payload")?;
            return Ok(false);
        }
        self.cursor.drained(n);
        self.pos += n as u64;
        if self.cursor.drain_remaining() == 0 {
            trace!("skipped to next header at position {}", self.pos);
        }
        Ok(true)
    }

    // =========================================================================
    // Header blocks
    // =========================================================================

    /// The part of the header block still waiting for bytes.
    pub(crate) fn block_unfilled(&mut self) -> &mut [u8] {
        &mut self.block.buf[self.block.filled..]
    }

    /// Record a header read of `n` bytes; zero means end of stream.
    ///
    /// Returns `None` while more bytes are needed, including after a single
    /// empty block.
    pub(crate) fn on_block_read(&mut self, n: usize) -> Result<Option<Next>> {
        if n > 0 {
            self.block.filled += n;
            self.pos += n as u64;
            if self.block.filled < HEADER_SIZE {
                return Ok(None);
            }
        }

        let filled = std::mem::take(&mut self.block.filled);
        let result = self.decode(filled);
        if result.is_err() && self.phase == Phase::Active {
            self.fail();
        }
        result
    }

    fn decode(&mut self, filled: usize) -> Result<Option<Next>> {
        let bytes = &self.block.buf[..filled];
        match decode_block(bytes)? {
            Block::EndOfStream => {
                if filled > 0 {
                    self.truncated("header block")?;
                } else {
                    self.end();
                }
                Ok(Some(Next::End))
            }
            Block::Empty => {
                self.empty_run += 1;
                if self.empty_run >= 2 {
                    self.end();
                    Ok(Some(Next::End))
                } else {
                    Ok(None)
                }
            }
            Block::Entry(header) => {
                if self.options.verify_checksums {
                    Header::from_bytes(bytes)?.verify_checksum()?;
                }
                self.cursor.bind(header.size())?;
                self.empty_run = 0;
                trace!(
                    "entry {:?} ({:?}, {} bytes) at position {}",
                    header.name(),
                    header.entry_type(),
                    header.size(),
                    self.pos - HEADER_SIZE as u64
                );
                Ok(Some(Next::Entry(header)))
            }
        }
    }

    // =========================================================================
    // Entry content
    // =========================================================================

    /// How many bytes a content read into `buf_len` bytes may request.
    pub(crate) fn content_limit(&self, buf_len: usize) -> Result<usize> {
        self.check_usable()?;
        self.cursor.ensure_open()?;
        Ok(self.cursor.read_limit(buf_len))
    }

    /// Record a content read of `n` bytes out of `requested`.
    pub(crate) fn on_content_read(&mut self, requested: usize, n: usize) -> Result<usize> {
        if n == 0 && requested > 0 {
            if self.options.strict_eof {
                self.fail();
                return Err(Error::UnexpectedEof { pos: self.pos });
            }
            debug!(
                "stream ended with {} bytes of entry content outstanding",
                self.cursor.remaining()
            );
            return Ok(0);
        }
        self.cursor.advance(n);
        self.pos += n as u64;
        Ok(n)
    }

    pub(crate) fn ensure_entry_open(&self) -> Result<()> {
        self.check_usable()?;
        self.cursor.ensure_open()
    }

    pub(crate) fn content_position(&self) -> u64 {
        self.cursor.position()
    }

    pub(crate) fn content_len(&self) -> u64 {
        self.cursor.len()
    }

    pub(crate) fn content_remaining(&self) -> u64 {
        self.cursor.remaining()
    }

    pub(crate) fn close(&mut self) {
        if self.phase != Phase::Closed {
            debug!("closing reader at position {}", self.pos);
        }
        self.phase = Phase::Closed;
        self.cursor.invalidate();
        self.block.filled = 0;
    }
}
