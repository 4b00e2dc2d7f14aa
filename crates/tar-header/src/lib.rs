//! Zerocopy-based decoding of tar header blocks.
//!
//! This crate turns one 512-byte tar header block into an [`EntryHeader`]
//! without performing any I/O. It understands the original POSIX.1-1988
//! layout and the UStar (POSIX.1-2001) extension, which adds owner/group
//! names, device numbers and a path prefix for names longer than 100 bytes.
//!
//! # Header Field Layout
//!
//! | Offset | Size | Field     | Encoding                                 |
//! |--------|------|-----------|------------------------------------------|
//! | 0      | 100  | name      | NUL-padded text                          |
//! | 100    | 8    | mode      | octal ASCII                              |
//! | 108    | 8    | uid       | octal ASCII                              |
//! | 116    | 8    | gid       | octal ASCII                              |
//! | 124    | 12   | size      | octal ASCII                              |
//! | 136    | 12   | mtime     | octal ASCII (Unix epoch seconds)         |
//! | 148    | 8    | checksum  | octal ASCII                              |
//! | 156    | 1    | typeflag  | single character (see [`EntryType`])     |
//! | 157    | 100  | linkname  | NUL-padded text                          |
//!
//! **UStar extension**:
//!
//! | Offset | Size | Field     |
//! |--------|------|-----------|
//! | 257    | 6    | magic     | "ustar\0"                                |
//! | 263    | 2    | version   | "00"                                     |
//! | 265    | 32   | uname     | owner user name                          |
//! | 297    | 32   | gname     | owner group name                         |
//! | 329    | 8    | devmajor  | device major number                      |
//! | 337    | 8    | devminor  | device minor number                      |
//! | 345    | 155  | prefix    | path prefix for long names               |
//!
//! # Example
//!
//! ```
//! use tar_header::{decode_block, Block};
//!
//! let block = [0u8; 512];
//! assert!(matches!(decode_block(&block).unwrap(), Block::Empty));
//!
//! // Anything shorter than a full block means the stream ended early.
//! assert!(matches!(decode_block(&block[..100]).unwrap(), Block::EndOfStream));
//! ```

mod entry;

use std::fmt;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub use entry::{decode_block, Block, EntryHeader};

/// Size of a tar header block in bytes.
pub const HEADER_SIZE: usize = 512;

/// Block size used for padding entry content.
pub const BLOCK_SIZE: u64 = 512;

/// Magic string for UStar format headers ("ustar\0").
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version field for UStar format headers ("00").
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Magic string for GNU tar format headers ("ustar ").
pub const GNU_MAGIC: &[u8; 6] = b"ustar ";

/// Errors that can occur when decoding tar headers.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The provided data is too short to contain a header.
    #[error("insufficient data: expected {HEADER_SIZE} bytes, got {0}")]
    InsufficientData(usize),

    /// A numeric field is not valid octal text.
    #[error("invalid octal in {field} field: {value:?}")]
    InvalidOctal {
        /// Name of the offending header field.
        field: &'static str,
        /// Raw bytes of the field.
        value: Vec<u8>,
    },

    /// The header checksum does not match the computed value.
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        /// The checksum value stored in the header.
        expected: u64,
        /// The checksum computed from the header bytes.
        computed: u64,
    },
}

/// Result type for header decoding operations.
pub type Result<T> = std::result::Result<T, HeaderError>;

// ============================================================================
// Raw header block
// ============================================================================

/// A 512-byte tar header block with named fields.
///
/// The layout is the UStar one; for old-style headers the fields after
/// `linkname` are undefined and only consulted once the magic says UStar
/// (or GNU, for the owner/group names). See the module-level documentation
/// for the field table.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Header {
    /// File path name (NUL-padded).
    pub name: [u8; 100],
    /// File mode in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// File size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time as Unix timestamp in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Link target name for hard/symbolic links.
    pub linkname: [u8; 100],
    /// Magic string identifying the format.
    pub magic: [u8; 6],
    /// Format version.
    pub version: [u8; 2],
    /// Owner user name.
    pub uname: [u8; 32],
    /// Owner group name.
    pub gname: [u8; 32],
    /// Device major number in octal ASCII.
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII.
    pub devminor: [u8; 8],
    /// Path prefix for names longer than 100 bytes.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

impl Header {
    /// View the first [`HEADER_SIZE`] bytes of `bytes` as a header.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InsufficientData`] if the slice is too short.
    pub fn from_bytes(bytes: &[u8]) -> Result<&Header> {
        Header::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| HeaderError::InsufficientData(bytes.len()))
    }

    /// Check if this header carries the UStar magic.
    ///
    /// Only trailing NULs are ignored, so the GNU magic (`"ustar "`) does
    /// not count: GNU headers reuse the prefix area for other fields.
    #[must_use]
    pub fn is_ustar(&self) -> bool {
        trim_nul(&self.magic) == b"ustar"
    }

    /// Check if this header uses the GNU tar magic.
    #[must_use]
    pub fn is_gnu(&self) -> bool {
        self.magic == *GNU_MAGIC
    }

    /// Get the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.typeflag)
    }

    /// Get the entry size (file content length) in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the size field is not valid.
    pub fn entry_size(&self) -> Result<u64> {
        parse_octal("size", &self.size)
    }

    /// Get the file mode (permissions).
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the mode field is not valid.
    pub fn mode(&self) -> Result<u32> {
        parse_octal_u32("mode", &self.mode)
    }

    /// Get the owner user ID.
    pub fn uid(&self) -> Result<u64> {
        parse_octal("uid", &self.uid)
    }

    /// Get the owner group ID.
    pub fn gid(&self) -> Result<u64> {
        parse_octal("gid", &self.gid)
    }

    /// Get the modification time as a Unix timestamp.
    pub fn mtime(&self) -> Result<u64> {
        parse_octal("mtime", &self.mtime)
    }

    /// Get the stored checksum.
    pub fn checksum(&self) -> Result<u32> {
        parse_octal_u32("checksum", &self.checksum)
    }

    /// Get the device major number, `None` for non-UStar headers.
    pub fn device_major(&self) -> Result<Option<u32>> {
        if !self.is_ustar() && !self.is_gnu() {
            return Ok(None);
        }
        parse_octal_u32("devmajor", &self.devmajor).map(Some)
    }

    /// Get the device minor number, `None` for non-UStar headers.
    pub fn device_minor(&self) -> Result<Option<u32>> {
        if !self.is_ustar() && !self.is_gnu() {
            return Ok(None);
        }
        parse_octal_u32("devminor", &self.devminor).map(Some)
    }

    /// Get the owner user name.
    ///
    /// Returns `None` for old-style headers without user/group name fields.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        if !self.is_ustar() && !self.is_gnu() {
            return None;
        }
        Some(decode_text(&self.uname))
    }

    /// Get the owner group name.
    ///
    /// Returns `None` for old-style headers without user/group name fields.
    #[must_use]
    pub fn groupname(&self) -> Option<String> {
        if !self.is_ustar() && !self.is_gnu() {
            return None;
        }
        Some(decode_text(&self.gname))
    }

    /// Get the resolved entry path.
    ///
    /// For UStar headers with a non-empty prefix the result is
    /// `prefix/name`: a separator is added only if the prefix lacks one and
    /// leading slashes on the name are dropped.
    #[must_use]
    pub fn path(&self) -> String {
        let name = decode_text(&self.name);
        if !self.is_ustar() {
            return name;
        }

        let mut path = decode_text(&self.prefix);
        if path.is_empty() {
            return name;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(name.trim_start_matches('/'));
        path
    }

    /// Get the link target.
    #[must_use]
    pub fn link_name(&self) -> String {
        decode_text(&self.linkname)
    }

    /// Verify the header checksum.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::ChecksumMismatch`] if the checksum is invalid,
    /// or [`HeaderError::InvalidOctal`] if the stored checksum cannot be parsed.
    pub fn verify_checksum(&self) -> Result<()> {
        let expected = parse_octal("checksum", &self.checksum)?;
        let computed = self.compute_checksum();
        if expected == computed {
            Ok(())
        } else {
            Err(HeaderError::ChecksumMismatch { expected, computed })
        }
    }

    /// Compute the header checksum.
    ///
    /// This is the unsigned sum of all header bytes, with the checksum field
    /// (bytes 148..156) counted as spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let mut sum: u64 = 0;
        for (i, &byte) in self.as_bytes().iter().enumerate() {
            if (148..156).contains(&i) {
                sum += u64::from(b' ');
            } else {
                sum += u64::from(byte);
            }
        }
        sum
    }

    /// Check if this header is an empty block (all zeros).
    ///
    /// Two consecutive empty blocks mark the end of a tar archive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("path", &self.path())
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size().ok())
            .field("mode", &self.mode().ok().map(|m| format!("{m:04o}")))
            .field("is_ustar", &self.is_ustar())
            .field("is_gnu", &self.is_gnu())
            .finish()
    }
}

// ============================================================================
// Entry Type
// ============================================================================

/// Kind of file system object an entry describes.
///
/// The type is stored as a single ASCII byte in the header. Bytes `'1'` to
/// `'7'` select the special kinds; every other byte, including `'0'` and
/// NUL, is a regular file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (type '0', NUL, or any unrecognised byte).
    #[default]
    Normal,
    /// Hard link to another file in the archive (type '1').
    HardLink,
    /// Symbolic link (type '2').
    SymbolicLink,
    /// Character device (type '3').
    CharacterDevice,
    /// Block device (type '4').
    BlockDevice,
    /// Directory (type '5').
    Directory,
    /// FIFO/named pipe (type '6').
    Fifo,
    /// Contiguous file (type '7').
    ContiguousFile,
}

impl EntryType {
    /// Map a type flag byte to an entry type.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'1' => EntryType::HardLink,
            b'2' => EntryType::SymbolicLink,
            b'3' => EntryType::CharacterDevice,
            b'4' => EntryType::BlockDevice,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::ContiguousFile,
            _ => EntryType::Normal,
        }
    }

    /// The canonical type flag byte; `Normal` is written as `'0'`.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EntryType::Normal => b'0',
            EntryType::HardLink => b'1',
            EntryType::SymbolicLink => b'2',
            EntryType::CharacterDevice => b'3',
            EntryType::BlockDevice => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::ContiguousFile => b'7',
        }
    }

    /// Returns true if this is a regular (or contiguous) file entry.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, EntryType::Normal | EntryType::ContiguousFile)
    }

    /// Returns true if this is a directory entry.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self == EntryType::Directory
    }

    /// Returns true if this is a hard or symbolic link.
    #[must_use]
    pub fn is_link(self) -> bool {
        matches!(self, EntryType::HardLink | EntryType::SymbolicLink)
    }

    /// Returns true if this is a character or block device node.
    #[must_use]
    pub fn is_device(self) -> bool {
        matches!(self, EntryType::CharacterDevice | EntryType::BlockDevice)
    }
}

impl From<u8> for EntryType {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse an octal ASCII field into a u64.
///
/// Trailing spaces and NULs are trimmed, as are leading spaces (older
/// archivers right-align their numbers). An empty field is zero. For example:
/// - `"0000644\0"` -> 420 (file mode 0644)
/// - `"     123 "` -> 83
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if anything other than the digits
/// 0-7 remains after trimming, or if the value overflows.
pub fn parse_octal(field: &'static str, bytes: &[u8]) -> Result<u64> {
    let invalid = || HeaderError::InvalidOctal {
        field,
        value: bytes.to_vec(),
    };

    let trimmed = trim_trailing(bytes);
    let start = trimmed
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(trimmed.len());

    let mut value: u64 = 0;
    for &byte in &trimmed[start..] {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(invalid());
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(invalid)?;
    }

    Ok(value)
}

fn parse_octal_u32(field: &'static str, bytes: &[u8]) -> Result<u32> {
    let value = parse_octal(field, bytes)?;
    u32::try_from(value).map_err(|_| HeaderError::InvalidOctal {
        field,
        value: bytes.to_vec(),
    })
}

/// Decode a text field, dropping trailing NUL and space padding.
///
/// Invalid UTF-8 sequences are replaced with the Unicode replacement
/// character.
///
/// # Example
///
/// ```
/// use tar_header::decode_text;
///
/// assert_eq!(decode_text(b"hello\0\0\0"), "hello");
/// assert_eq!(decode_text(b"root  \0"), "root");
/// assert_eq!(decode_text(b"\0\0"), "");
/// ```
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(trim_trailing(bytes)).into_owned()
}

fn trim_trailing(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != b'\0' && b != b' ')
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != b'\0').map_or(0, |i| i + 1);
    &bytes[..end]
}
