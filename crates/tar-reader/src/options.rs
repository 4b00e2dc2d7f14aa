//! Reader configuration.

/// Options controlling how strictly an archive is validated.
///
/// The defaults accept everything a lenient archiver would: checksums are
/// not looked at, and a stream that ends early simply ends the archive.
///
/// # Example
///
/// ```
/// use tar_reader::ReaderOptions;
///
/// // Use defaults
/// let options = ReaderOptions::default();
/// assert!(!options.strict_eof);
///
/// // Only reject truncated archives
/// let options = ReaderOptions {
///     strict_eof: true,
///     ..Default::default()
/// };
/// assert!(!options.verify_checksums);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Verify each header's checksum before returning the entry.
    ///
    /// A mismatch is reported as [`HeaderError::ChecksumMismatch`] wrapped
    /// in [`Error::Header`].
    ///
    /// Default: `false`.
    ///
    /// [`HeaderError::ChecksumMismatch`]: tar_header::HeaderError::ChecksumMismatch
    /// [`Error::Header`]: crate::Error::Header
    pub verify_checksums: bool,

    /// Treat a stream that ends inside a header block, a payload or its
    /// padding as [`Error::UnexpectedEof`].
    ///
    /// When unset the archive just ends there, and a content read that runs
    /// out of data returns `Ok(0)` early.
    ///
    /// Default: `false`.
    ///
    /// [`Error::UnexpectedEof`]: crate::Error::UnexpectedEof
    pub strict_eof: bool,
}

impl ReaderOptions {
    /// Create a new `ReaderOptions` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for untrusted archives: verify checksums and reject
    /// truncation.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            verify_checksums: true,
            strict_eof: true,
        }
    }

    /// Options that accept damaged archives as far as they can be read.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            verify_checksums: false,
            strict_eof: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ReaderOptions::default();
        assert!(!options.verify_checksums);
        assert!(!options.strict_eof);
        assert_eq!(options, ReaderOptions::new());
    }

    #[test]
    fn test_lenient_is_default() {
        assert_eq!(ReaderOptions::lenient(), ReaderOptions::default());
    }

    #[test]
    fn test_strict_options() {
        let options = ReaderOptions::strict();
        assert!(options.verify_checksums);
        assert!(options.strict_eof);
    }
}
