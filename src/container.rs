//! The entry model exposed by an opened container.

use crate::codec::MethodId;
use crate::format::UNIX_EXTENSION;
use crate::{EntryName, Error, Result, Timestamp};

/// One named payload inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The entry name.
    pub name: EntryName,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Modification time.
    pub modified: Timestamp,
    /// Windows attributes in the low 16 bits; a Unix mode in the high 16
    /// bits when [`UNIX_EXTENSION`] is set.
    pub attributes: u32,
    /// CRC-32 of the uncompressed bytes.
    pub crc32: u32,
    /// Offset of this entry within the decoded payload.
    pub offset: u64,
}

impl Entry {
    /// Returns the Unix permission bits, if recorded.
    pub fn unix_mode(&self) -> Option<u32> {
        (self.attributes & UNIX_EXTENSION != 0).then_some(self.attributes >> 16)
    }

    /// Returns true if the read-only attribute is set.
    pub fn is_read_only(&self) -> bool {
        self.attributes & 0x01 != 0
    }
}

/// Summary of an opened container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Format version.
    pub version: u8,
    /// Compression method.
    pub method: MethodId,
    /// Whether the payload is encrypted.
    pub encrypted: bool,
    /// Number of entries.
    pub entry_count: usize,
    /// Size of the stored payload in bytes (after compression and encryption).
    pub packed_size: u64,
    /// Total uncompressed size of all entries.
    pub unpacked_size: u64,
}

impl ContainerInfo {
    /// Returns packed size / unpacked size, or 1.0 for empty containers.
    pub fn compression_ratio(&self) -> f64 {
        if self.unpacked_size == 0 {
            1.0
        } else {
            self.packed_size as f64 / self.unpacked_size as f64
        }
    }
}

/// Iterator over the entries of an opened container.
///
/// Single pass; call `Archive::entries` again to restart.
#[derive(Debug, Clone)]
pub struct EntryIter<'a> {
    inner: std::slice::Iter<'a, Entry>,
}

impl<'a> EntryIter<'a> {
    pub(crate) fn new(entries: &'a [Entry]) -> Self {
        Self {
            inner: entries.iter(),
        }
    }
}

impl<'a> Iterator for EntryIter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for EntryIter<'_> {}

/// Finds an entry by exact name.
pub fn find_entry<'a>(entries: &'a [Entry], name: &str) -> Result<&'a Entry> {
    entries
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| Error::EntryNotFound {
            name: name.to_owned(),
        })
}
