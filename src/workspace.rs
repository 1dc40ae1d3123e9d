//! Per-document scratch directories.
//!
//! An open document is extracted into a private workspace directory where
//! the editor works on a plain file. The directory name is derived from the
//! SHA-256 of the document's absolute path, so the same document always gets
//! the same workspace and two documents never share one, even when their
//! base names match.
//!
//! Ownership is recorded twice: in a `.lock` file holding the owner's process
//! id (visible to other processes) and in an in-process registry (which
//! catches a second open from the same process). Workspaces left behind by
//! a crashed process are reclaimed on the next acquire.
//!
//! The directory is private to the current user (mode `0700` on Unix), and
//! a directory with the workspace's name owned by another user is never
//! reused.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::fs::{SharedFileSystem, StdFileSystem, current_uid};
use crate::{Error, Result};

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = ".docseal-";

/// Name of the lock file inside a workspace.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Workspace directories held by live [`Workspace`] values in this process.
static LIVE: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("workspace registry mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Returns true if a process with this id is running.
fn process_alive(pid: u32) -> bool {
    let pid = sysinfo::Pid::from_u32(pid);
    let mut sys = sysinfo::System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

/// Returns the name of the plain file staged for `document`.
///
/// Archived note formats map to their unarchived counterparts:
/// `.ctz` to `.ctd` (XML) and `.ctx` to `.ctb` (SQLite). Other names are
/// kept as they are.
pub fn staged_file_name(document: &Path) -> Result<PathBuf> {
    let name = document.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' has no file name", document.display()),
        ))
    })?;
    let name = Path::new(name);

    let plain = match name.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ctz") => "ctd",
        Some(ext) if ext.eq_ignore_ascii_case("ctx") => "ctb",
        _ => return Ok(name.to_path_buf()),
    };
    Ok(name.with_extension(plain))
}

/// Hands out workspaces below a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    fs: SharedFileSystem,
}

impl WorkspaceManager {
    /// Creates a manager placing workspaces under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fs: StdFileSystem::shared(),
        }
    }

    /// Creates a manager using the system temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Routes all file access through `fs`.
    pub fn with_file_system(mut self, fs: SharedFileSystem) -> Self {
        self.fs = fs;
        self
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the workspace directory for `document`, without creating it.
    pub fn workspace_dir(&self, document: &Path) -> Result<PathBuf> {
        let absolute = std::path::absolute(document)?;
        let digest = Sha256::digest(absolute.as_os_str().as_encoded_bytes());
        let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        Ok(self.root.join(format!("{}{}", WORKSPACE_PREFIX, hex)))
    }

    /// Creates (or reclaims) the workspace for `document`.
    ///
    /// # Errors
    ///
    /// - [`Error::WorkspaceBusy`] if a live session owns the workspace
    /// - [`Error::WorkspaceCreateFailed`] if the directory or its lock
    ///   cannot be created, or if a directory with the workspace's name
    ///   belongs to another user
    pub fn acquire(&self, document: &Path) -> Result<Workspace> {
        let document = std::path::absolute(document)?;
        let dir = self.workspace_dir(&document)?;
        let staged_path = dir.join(staged_file_name(&document)?);
        let own_pid = std::process::id();

        let mut live = lock_or_recover(&LIVE);
        if live.contains(&dir) {
            return Err(Error::WorkspaceBusy { path: dir, pid: own_pid });
        }

        let create_failed = |source: io::Error| Error::WorkspaceCreateFailed {
            path: dir.clone(),
            source,
        };

        if self.fs.exists(&dir) {
            let uid = self.fs.owner(&dir).map_err(create_failed)?;
            if let (Some(uid), Some(own_uid)) = (uid, current_uid()) {
                if uid != own_uid {
                    return Err(create_failed(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("directory belongs to user {}", uid),
                    )));
                }
            }

            let owner = self
                .fs
                .read(&dir.join(LOCK_FILE_NAME))
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .and_then(|text| text.trim().parse::<u32>().ok());

            match owner {
                Some(pid) if pid != own_pid && process_alive(pid) => {
                    return Err(Error::WorkspaceBusy {
                        path: dir.clone(),
                        pid,
                    });
                }
                Some(pid) => log::warn!(
                    "reclaiming stale workspace '{}' left by process {}",
                    dir.display(),
                    pid
                ),
                None => log::warn!(
                    "reclaiming workspace '{}' without a valid lock",
                    dir.display()
                ),
            }
            self.fs.remove_dir_all(&dir).map_err(create_failed)?;
        }

        self.fs.create_private_dir(&dir).map_err(create_failed)?;
        self.fs
            .write_private(&dir.join(LOCK_FILE_NAME), own_pid.to_string().as_bytes())
            .map_err(create_failed)?;

        live.insert(dir.clone());
        log::debug!(
            "acquired workspace '{}' for '{}'",
            dir.display(),
            document.display()
        );

        Ok(Workspace {
            dir,
            staged_path,
            document_path: document,
            fs: self.fs.clone(),
            released: false,
        })
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::system()
    }
}

/// An exclusively owned scratch directory for one document.
///
/// Dropping a workspace removes it; use [`release`](Self::release) to
/// observe cleanup errors.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    staged_path: PathBuf,
    document_path: PathBuf,
    fs: SharedFileSystem,
    released: bool,
}

impl Workspace {
    /// The workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the plain file the editor works on.
    pub fn staged_path(&self) -> &Path {
        &self.staged_path
    }

    /// Absolute path of the document this workspace belongs to.
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Removes the workspace and everything in it.
    ///
    /// The workspace is no longer registered as live even if removal fails.
    ///
    /// # Errors
    ///
    /// [`Error::CleanupFailed`] if the directory could not be removed.
    pub fn release(mut self) -> Result<()> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        lock_or_recover(&LIVE).remove(&self.dir);

        if !self.fs.exists(&self.dir) {
            return Ok(());
        }
        match self.fs.remove_dir_all(&self.dir) {
            Ok(()) => {
                log::debug!("released workspace '{}'", self.dir.display());
                Ok(())
            }
            Err(source) => {
                log::warn!(
                    "failed to remove workspace '{}': {}",
                    self.dir.display(),
                    source
                );
                Err(Error::CleanupFailed {
                    path: self.dir.clone(),
                    source,
                })
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
