//! Filesystem access used by the writer, workspaces and document sessions.
//!
//! Every mutation of the user's files goes through the [`FileSystem`] trait
//! so the commit and backup paths can be exercised against injected
//! failures. [`StdFileSystem`] is the real implementation.
//!
//! Workspaces hold decrypted documents, so they are created with the
//! `*_private` operations: on Unix, directories get mode `0700` and files
//! mode `0600`.

use std::fmt::Debug;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// The file operations needed by this crate.
pub trait FileSystem: Send + Sync + Debug {
    /// Creates a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Removes a directory tree.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Reads a whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Creates or truncates a file, writes `data` and syncs it to disk.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Creates a file that must not exist yet, readable only by its owner,
    /// writes `data` and syncs it.
    fn write_private(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Creates a directory accessible only by its owner.
    ///
    /// Missing parents are created with default permissions. The directory
    /// itself must not exist yet.
    fn create_private_dir(&self, path: &Path) -> io::Result<()>;

    /// Returns the user id owning `path`, without following symlinks.
    ///
    /// `None` on platforms without Unix ownership.
    fn owner(&self, path: &Path) -> io::Result<Option<u32>>;

    /// Gives `to` the permissions of `from`.
    fn copy_permissions(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Flushes a directory's entries (for example a rename) to disk.
    fn sync_dir(&self, path: &Path) -> io::Result<()>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copies a file.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Returns true if `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Returns the modification time of `path`.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Sets the modification time of `path`.
    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()>;
}

/// A shareable file system handle.
pub type SharedFileSystem = Arc<dyn FileSystem>;

/// Returns the effective user id of this process on Unix.
#[cfg(unix)]
pub fn current_uid() -> Option<u32> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    Some(unsafe { libc::geteuid() })
}

/// Returns the effective user id of this process on Unix.
#[cfg(not(unix))]
pub fn current_uid() -> Option<u32> {
    None
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Returns a shared handle to the real file system.
    pub fn shared() -> SharedFileSystem {
        Arc::new(StdFileSystem)
    }
}

impl FileSystem for StdFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(data)?;
        file.sync_all()
    }

    fn write_private(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(data)?;
        file.sync_all()
    }

    fn create_private_dir(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut builder = std::fs::DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(path)
    }

    #[cfg(unix)]
    fn owner(&self, path: &Path) -> io::Result<Option<u32>> {
        use std::os::unix::fs::MetadataExt;
        Ok(Some(std::fs::symlink_metadata(path)?.uid()))
    }

    #[cfg(not(unix))]
    fn owner(&self, path: &Path) -> io::Result<Option<u32>> {
        std::fs::symlink_metadata(path).map(|_| None)
    }

    fn copy_permissions(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::set_permissions(to, std::fs::metadata(from)?.permissions())
    }

    #[cfg(unix)]
    fn sync_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::File::open(path)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time))
    }
}
