//! Replacing and adding entries in an existing container.
//!
//! The container is decoded completely, modified in memory and rewritten
//! through the same atomic commit as a fresh write, so an interrupted update
//! never damages the original.
//!
//! # Example
//!
//! ```rust,no_run
//! use docseal::write::ArchiveUpdater;
//! use docseal::Password;
//!
//! let password = Password::new("secret");
//! let mut updater = ArchiveUpdater::open("notes.ctz", Some(&password))?;
//! updater.upsert("notes.ctd", b"<cherrytree/>".to_vec())?;
//! let result = updater.finish()?;
//! println!("replaced {}, added {}", result.entries_replaced, result.entries_added);
//! # Ok::<(), docseal::Error>(())
//! ```

use std::path::{Path, PathBuf};

use super::{ArchiveWriter, EntryMeta, WriteResult};
use crate::format::CodecParams;
use crate::fs::{SharedFileSystem, StdFileSystem};
use crate::read::Archive;
use crate::{EntryName, Password, Result};

/// Result of an update.
#[must_use = "update result should be checked to verify operation completed as expected"]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Entries whose data was replaced.
    pub entries_replaced: usize,
    /// Entries that did not exist before.
    pub entries_added: usize,
    /// Entries in the rewritten container.
    pub total_entries: usize,
    /// Details of the rewritten container.
    pub write: WriteResult,
}

/// Rewrites an existing container with replaced or added entries.
///
/// Existing entries keep their order; new entries are appended. The
/// rewritten container is encrypted with the password used to open it
/// unless [`password`](Self::password) changes it.
pub struct ArchiveUpdater {
    path: PathBuf,
    writer: ArchiveWriter,
    entries_replaced: usize,
    entries_added: usize,
}

impl std::fmt::Debug for ArchiveUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveUpdater")
            .field("path", &self.path)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl ArchiveUpdater {
    /// Opens and decodes `path`.
    ///
    /// # Errors
    ///
    /// Any error [`Archive::read_all`] reports, including
    /// [`Error::PasswordRequired`](crate::Error::PasswordRequired) and
    /// [`Error::WrongPassword`](crate::Error::WrongPassword).
    pub fn open(path: impl AsRef<Path>, password: Option<&Password>) -> Result<Self> {
        Self::open_with(StdFileSystem::shared(), path, password)
    }

    /// Opens `path` through the given file system.
    pub fn open_with(
        fs: SharedFileSystem,
        path: impl AsRef<Path>,
        password: Option<&Password>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut archive = Archive::open_with(fs.clone(), path)?;
        archive.set_password(password.cloned());
        let method = archive.info().method;

        let mut writer = ArchiveWriter::new()
            .with_file_system(fs)
            .params(CodecParams::DOCUMENT.with_method(method));
        writer.set_password(password.cloned());

        for (entry, data) in archive.read_all()? {
            let meta = EntryMeta::new()
                .modified(entry.modified)
                .attributes(entry.attributes);
            writer.add_entry(entry.name, data, meta)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entries_replaced: 0,
            entries_added: 0,
        })
    }

    /// Sets the codec parameters for the rewritten container.
    pub fn params(mut self, params: CodecParams) -> Self {
        self.writer = self.writer.params(params);
        self
    }

    /// Sets the password for the rewritten container. `None` or an empty
    /// password writes it unencrypted.
    pub fn password(mut self, password: Option<Password>) -> Self {
        self.writer.set_password(password);
        self
    }

    /// Number of entries after the pending changes.
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    /// Always false: containers hold at least one entry.
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Replaces the entry called `name`, or appends it if there is none.
    ///
    /// The entry's modification time is set to now.
    pub fn upsert(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let name = EntryName::new(name)?;
        if self.writer.contains(name.as_str()) {
            self.entries_replaced += 1;
        } else {
            self.entries_added += 1;
        }
        self.writer.upsert(name, data.into(), EntryMeta::new());
        Ok(())
    }

    /// Rewrites the container atomically.
    pub fn finish(self) -> Result<UpdateResult> {
        let total_entries = self.writer.len();
        let write = self.writer.commit(&self.path)?;
        log::debug!(
            "updated '{}': {} replaced, {} added",
            self.path.display(),
            self.entries_replaced,
            self.entries_added
        );
        Ok(UpdateResult {
            entries_replaced: self.entries_replaced,
            entries_added: self.entries_added,
            total_entries,
            write,
        })
    }
}

/// Replaces entries with matching names and appends the rest, then rewrites
/// `path` atomically.
///
/// The rewritten container is encrypted iff `password` is non-empty.
pub fn update<I, N>(path: impl AsRef<Path>, password: Option<&Password>, entries: I) -> Result<UpdateResult>
where
    I: IntoIterator<Item = (N, Vec<u8>)>,
    N: AsRef<str>,
{
    let mut updater = ArchiveUpdater::open(path, password)?;
    for (name, data) in entries {
        updater.upsert(name.as_ref(), data)?;
    }
    updater.finish()
}
