//! Bookkeeping for the payload of the current entry.

use tar_header::BLOCK_SIZE;

use crate::error::{Error, Result};

/// Tracks how far the current entry's payload and padding have been consumed.
///
/// The cursor never touches the stream itself. Frontends ask it how many
/// bytes they may read, perform the read, then report how many arrived. The
/// counters are only changed by those reports, so an interrupted read
/// leaves them describing the stream exactly.
#[derive(Debug, Default)]
pub(crate) struct EntryCursor {
    len: u64,
    position: u64,
    padding: u64,
    open: bool,
}

impl EntryCursor {
    /// Start a new entry of `size` payload bytes.
    ///
    /// Any unconsumed bytes of the previous entry must have been drained.
    pub(crate) fn bind(&mut self, size: u64) -> Result<()> {
        debug_assert_eq!(self.drain_remaining(), 0);
        let padded = size
            .checked_next_multiple_of(BLOCK_SIZE)
            .ok_or(Error::InvalidSize(size))?;
        *self = Self {
            len: size,
            position: 0,
            padding: padded - size,
            open: true,
        };
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::InvalidState("entry is closed"))
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    /// Stop handing out payload; the rest is left for draining.
    pub(crate) fn close(&mut self) {
        self.open = false;
    }

    /// Forget the entry without draining, for when the stream is gone.
    pub(crate) fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// How many bytes a read into a buffer of `buf_len` may request.
    pub(crate) fn read_limit(&self, buf_len: usize) -> usize {
        let remaining = self.remaining();
        usize::try_from(remaining).map_or(buf_len, |r| r.min(buf_len))
    }

    pub(crate) fn advance(&mut self, n: usize) {
        let n = n as u64;
        debug_assert!(n <= self.remaining());
        self.position += n;
    }

    /// Payload plus padding still between the stream and the next header.
    pub(crate) fn drain_remaining(&self) -> u64 {
        self.remaining() + self.padding
    }

    /// Record `n` drained bytes, payload first and then padding.
    pub(crate) fn drained(&mut self, n: usize) {
        let n = n as u64;
        debug_assert!(n <= self.drain_remaining());
        let from_payload = n.min(self.remaining());
        self.position += from_payload;
        self.padding -= n - from_payload;
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.len - self.position
    }
}
