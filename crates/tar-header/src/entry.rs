//! Decoded entry metadata.

use std::time::{Duration, SystemTime};

use crate::{EntryType, Header, Result, BLOCK_SIZE};

/// Outcome of decoding one header block.
#[derive(Debug)]
pub enum Block {
    /// A fully decoded entry header.
    Entry(EntryHeader),
    /// An all-zero block; two in a row end the archive.
    Empty,
    /// Fewer than 512 bytes were available.
    EndOfStream,
}

/// Metadata for one archive member.
///
/// Every field is decoded up front, so the name is already joined with the
/// UStar prefix and numeric fields have been validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryHeader {
    name: String,
    mode: u32,
    uid: u64,
    gid: u64,
    owner_name: Option<String>,
    group_name: Option<String>,
    size: u64,
    mtime: u64,
    checksum: u32,
    entry_type: EntryType,
    link_name: String,
    device_major: Option<u32>,
    device_minor: Option<u32>,
}

impl EntryHeader {
    /// Decode all fields of `header`.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`](crate::HeaderError::InvalidOctal)
    /// if any numeric field is malformed.
    pub fn from_header(header: &Header) -> Result<Self> {
        let entry_type = header.entry_type();
        let (device_major, device_minor) = if entry_type.is_device() {
            (header.device_major()?, header.device_minor()?)
        } else {
            (None, None)
        };

        Ok(Self {
            name: header.path(),
            mode: header.mode()?,
            uid: header.uid()?,
            gid: header.gid()?,
            owner_name: header.username(),
            group_name: header.groupname(),
            size: header.entry_size()?,
            mtime: header.mtime()?,
            checksum: header.checksum()?,
            entry_type,
            link_name: header.link_name(),
            device_major,
            device_minor,
        })
    }

    /// The resolved path of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permission bits.
    #[must_use]
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Owner user ID.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Owner group ID.
    #[must_use]
    pub fn gid(&self) -> u64 {
        self.gid
    }

    /// Owner user name; `None` unless the header is UStar or GNU.
    #[must_use]
    pub fn owner_name(&self) -> Option<&str> {
        self.owner_name.as_deref()
    }

    /// Owner group name; `None` unless the header is UStar or GNU.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Payload length rounded up to the next block boundary, or `None` if
    /// that does not fit in a `u64`.
    #[must_use]
    pub fn padded_size(&self) -> Option<u64> {
        self.size.checked_next_multiple_of(BLOCK_SIZE)
    }

    /// Modification time in seconds since the Unix epoch (UTC).
    #[must_use]
    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Modification time as a [`SystemTime`].
    #[must_use]
    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(self.mtime)
    }

    /// The checksum stored in the header. It is not verified here.
    #[must_use]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Kind of file system object.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Link target for hard and symbolic links; empty otherwise.
    #[must_use]
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Device major number for UStar character and block devices.
    #[must_use]
    pub fn device_major(&self) -> Option<u32> {
        self.device_major
    }

    /// Device minor number for UStar character and block devices.
    #[must_use]
    pub fn device_minor(&self) -> Option<u32> {
        self.device_minor
    }
}

/// Decode the next header block.
///
/// `block` is whatever could be read for the next header: anything shorter
/// than 512 bytes is reported as [`Block::EndOfStream`], and bytes beyond
/// the first 512 are ignored. No payload is consumed; the caller positions
/// itself after the header and reads [`EntryHeader::size`] bytes from there.
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`](crate::HeaderError::InvalidOctal)
/// for malformed numeric fields.
pub fn decode_block(block: &[u8]) -> Result<Block> {
    let Ok(header) = Header::from_bytes(block) else {
        return Ok(Block::EndOfStream);
    };

    if header.is_empty() {
        return Ok(Block::Empty);
    }

    EntryHeader::from_header(header).map(Block::Entry)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::HeaderError;

    fn ustar(path: &str, entry_type: tar::EntryType, size: u64) -> tar::Header {
        let mut header = tar::Header::new_ustar();
        header.set_path(path).unwrap();
        header.set_entry_type(entry_type);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_uid(1000);
        header.set_gid(100);
        header.set_mtime(1234567890);
        header.set_username("alice").unwrap();
        header.set_groupname("users").unwrap();
        header.set_cksum();
        header
    }

    fn decode_entry(bytes: &[u8]) -> EntryHeader {
        match decode_block(bytes).unwrap() {
            Block::Entry(entry) => entry,
            other => panic!("expected an entry, got {other:?}"),
        }
    }

    /// Build a UStar block with explicit prefix and name fields.
    fn with_prefix(prefix: &[u8], name: &[u8]) -> [u8; 512] {
        let header = ustar("placeholder", tar::EntryType::Regular, 0);
        let mut bytes = *header.as_bytes();
        bytes[0..100].fill(0);
        bytes[..name.len()].copy_from_slice(name);
        bytes[345..500].fill(0);
        bytes[345..345 + prefix.len()].copy_from_slice(prefix);
        bytes
    }

    #[test]
    fn test_short_block_is_end_of_stream() {
        assert!(matches!(decode_block(&[]).unwrap(), Block::EndOfStream));
        assert!(matches!(
            decode_block(&[0u8; 511]).unwrap(),
            Block::EndOfStream
        ));
    }

    #[test]
    fn test_zero_block_is_empty() {
        assert!(matches!(decode_block(&[0u8; 512]).unwrap(), Block::Empty));
    }

    #[test]
    fn test_single_nonzero_byte_is_not_empty() {
        let mut bytes = [0u8; 512];
        bytes[511] = 1;
        let entry = decode_entry(&bytes);
        assert_eq!(entry.name(), "");
        assert_eq!(entry.size(), 0);
    }

    #[test]
    fn test_regular_file_fields() {
        let header = ustar("dir/hello.txt", tar::EntryType::Regular, 13);
        let entry = decode_entry(header.as_bytes());

        assert_eq!(entry.name(), "dir/hello.txt");
        assert_eq!(entry.entry_type(), EntryType::Normal);
        assert_eq!(entry.size(), 13);
        assert_eq!(entry.padded_size(), Some(512));
        assert_eq!(entry.mode(), 0o644);
        assert_eq!(entry.uid(), 1000);
        assert_eq!(entry.gid(), 100);
        assert_eq!(entry.mtime(), 1234567890);
        assert_eq!(
            entry.modified(),
            SystemTime::UNIX_EPOCH + Duration::from_secs(1234567890)
        );
        assert_eq!(entry.owner_name(), Some("alice"));
        assert_eq!(entry.group_name(), Some("users"));
        assert_eq!(entry.link_name(), "");
        assert_eq!(entry.device_major(), None);
        assert_eq!(
            u64::from(entry.checksum()),
            Header::from_bytes(header.as_bytes())
                .unwrap()
                .compute_checksum()
        );
    }

    #[test]
    fn test_directory_type_flag() {
        let header = ustar("mydir/", tar::EntryType::Directory, 0);
        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.entry_type(), EntryType::Directory);
        assert_eq!(entry.size(), 0);
        assert_eq!(entry.padded_size(), Some(0));
    }

    #[test]
    fn test_symlink_target() {
        let mut header = ustar("link", tar::EntryType::Symlink, 0);
        header.set_link_name("target/file").unwrap();
        header.set_cksum();

        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.entry_type(), EntryType::SymbolicLink);
        assert_eq!(entry.link_name(), "target/file");
    }

    #[test]
    fn test_device_numbers() {
        let mut header = ustar("dev/null", tar::EntryType::Char, 0);
        header.set_device_major(1).unwrap();
        header.set_device_minor(3).unwrap();
        header.set_cksum();

        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.entry_type(), EntryType::CharacterDevice);
        assert_eq!(entry.device_major(), Some(1));
        assert_eq!(entry.device_minor(), Some(3));
    }

    #[test]
    fn test_old_header_has_no_names() {
        let mut header = tar::Header::new_old();
        header.set_path("old.txt").unwrap();
        header.set_size(5);
        header.set_cksum();

        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.name(), "old.txt");
        assert_eq!(entry.owner_name(), None);
        assert_eq!(entry.group_name(), None);
    }

    #[test]
    fn test_gnu_header_names_without_prefix() {
        let mut header = tar::Header::new_gnu();
        header.set_path("gnu.txt").unwrap();
        header.set_username("bob").unwrap();
        header.set_cksum();
        let mut bytes = *header.as_bytes();
        // atime lives where UStar keeps the prefix
        bytes[345..356].copy_from_slice(b"14000000000");

        let entry = decode_entry(&bytes);
        assert_eq!(entry.name(), "gnu.txt");
        assert_eq!(entry.owner_name(), Some("bob"));
    }

    #[test]
    fn test_long_name_uses_prefix() {
        let dir = "d".repeat(80);
        let file = "f".repeat(40);
        let path = format!("{dir}/{file}");
        assert_eq!(path.len(), 121);

        let header = ustar(&path, tar::EntryType::Regular, 0);
        assert!(header.as_bytes()[345] != 0, "tar should have split the path");

        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.name(), path);
    }

    #[test]
    fn test_prefix_separator_added_once() {
        let name = "n".repeat(100);
        let entry = decode_entry(&with_prefix(b"some/dir", name.as_bytes()));
        assert_eq!(entry.name(), format!("some/dir/{name}"));

        let entry = decode_entry(&with_prefix(b"some/dir/", b"file"));
        assert_eq!(entry.name(), "some/dir/file");
    }

    #[test]
    fn test_prefix_strips_leading_slash_from_name() {
        let entry = decode_entry(&with_prefix(b"some/dir", b"/file"));
        assert_eq!(entry.name(), "some/dir/file");

        let entry = decode_entry(&with_prefix(b"some/dir/", b"//file"));
        assert_eq!(entry.name(), "some/dir/file");
    }

    #[test]
    fn test_empty_prefix_keeps_leading_slash() {
        let entry = decode_entry(&with_prefix(b"", b"/abs/file"));
        assert_eq!(entry.name(), "/abs/file");
    }

    #[test]
    fn test_malformed_size_is_an_error() {
        let header = ustar("bad", tar::EntryType::Regular, 0);
        let mut bytes = *header.as_bytes();
        bytes[124..136].copy_from_slice(b"0000000001x\0");

        let err = decode_block(&bytes).unwrap_err();
        assert!(matches!(err, HeaderError::InvalidOctal { field: "size", .. }));
    }

    #[test]
    fn test_checksum_not_verified() {
        let header = ustar("file", tar::EntryType::Regular, 0);
        let mut bytes = *header.as_bytes();
        bytes[148..156].copy_from_slice(b"0000001\0");

        let entry = decode_entry(&bytes);
        assert_eq!(entry.checksum(), 1);
    }

    #[test]
    fn test_unknown_type_flag_is_normal() {
        let header = ustar("pax", tar::EntryType::XHeader, 0);
        let entry = decode_entry(header.as_bytes());
        assert_eq!(entry.entry_type(), EntryType::Normal);
    }
}
