//! Entry metadata and write results.

use std::path::Path;

use crate::format::DEFAULT_ATTRIBUTES;
#[cfg(unix)]
use crate::format::UNIX_EXTENSION;
use crate::{Result, Timestamp};

/// `FILE_ATTRIBUTE_READONLY`.
const READ_ONLY_ATTRIBUTE: u32 = 0x01;

/// Metadata recorded for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    /// Modification time.
    pub modified: Timestamp,
    /// Attributes, see [`Entry::attributes`](crate::Entry::attributes).
    pub attributes: u32,
}

impl Default for EntryMeta {
    fn default() -> Self {
        Self {
            modified: Timestamp::now(),
            attributes: DEFAULT_ATTRIBUTES,
        }
    }
}

impl EntryMeta {
    /// Creates metadata stamped with the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the modification time.
    pub fn modified(mut self, modified: Timestamp) -> Self {
        self.modified = modified;
        self
    }

    /// Sets the attributes.
    pub fn attributes(mut self, attributes: u32) -> Self {
        self.attributes = attributes;
        self
    }

    /// Reads metadata from a file on disk.
    ///
    /// On Unix the permission bits are kept in the high 16 bits of the
    /// attributes, the way 7-Zip records them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the path cannot be read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let metadata = std::fs::metadata(path.as_ref())?;

        let modified = metadata
            .modified()
            .ok()
            .and_then(Timestamp::from_system_time)
            .unwrap_or_default();

        let mut attributes = DEFAULT_ATTRIBUTES;
        if metadata.permissions().readonly() {
            attributes |= READ_ONLY_ATTRIBUTE;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            attributes |= UNIX_EXTENSION | (metadata.permissions().mode() << 16);
        }

        Ok(Self {
            modified,
            attributes,
        })
    }
}

/// Result of writing a container.
#[must_use = "write result should be checked to verify the container was written as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Number of entries written.
    pub entries_written: usize,
    /// Total uncompressed bytes.
    pub total_size: u64,
    /// Stored payload bytes (after compression and encryption).
    pub packed_size: u64,
    /// Size of the whole container file.
    pub container_size: u64,
    /// Whether the payload was encrypted.
    pub encrypted: bool,
}

impl WriteResult {
    /// Returns the compression ratio (packed / uncompressed).
    pub fn compression_ratio(&self) -> f64 {
        if self.total_size == 0 {
            1.0
        } else {
            self.packed_size as f64 / self.total_size as f64
        }
    }

    /// Returns the space savings as a fraction.
    pub fn space_savings(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            1.0 - self.compression_ratio()
        }
    }
}
