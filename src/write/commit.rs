//! Atomic replacement of container files.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fs::FileSystem;
use crate::{Error, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Returns a hidden, unique sibling of `destination` for staging a write.
///
/// The name is `.<file name>.<pid>-<counter>.tmp`, so concurrent writers in
/// one process and across processes never share a temporary file.
pub(crate) fn temp_sibling(destination: &Path) -> Result<PathBuf> {
    let file_name = destination.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' has no file name", destination.display()),
        ))
    })?;

    let mut name = OsString::from(".");
    name.push(file_name);
    name.push(format!(
        ".{}-{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    Ok(destination.with_file_name(name))
}

/// Writes `data` to `destination` through a synced temporary sibling and a
/// rename.
///
/// The temporary file is created readable only by its owner. When
/// `destination` already exists, its permissions are carried over before
/// the rename, so a save never widens access to a document. After the
/// rename the parent directory is synced.
///
/// If anything fails before the rename completes, `destination` keeps its
/// previous content and the temporary file is removed.
pub fn commit_atomic(fs: &dyn FileSystem, destination: &Path, data: &[u8]) -> Result<()> {
    let temp = temp_sibling(destination)?;

    let outcome = fs
        .write_private(&temp, data)
        .and_then(|()| {
            if fs.exists(destination) {
                fs.copy_permissions(destination, &temp)
            } else {
                Ok(())
            }
        })
        .and_then(|()| fs.rename(&temp, destination));

    match outcome {
        Ok(()) => {
            let parent = destination
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            if let Err(e) = fs.sync_dir(parent) {
                log::warn!("failed to sync directory '{}': {}", parent.display(), e);
            }
            log::debug!(
                "committed {} bytes to '{}'",
                data.len(),
                destination.display()
            );
            Ok(())
        }
        Err(e) => {
            if fs.exists(&temp) {
                if let Err(cleanup) = fs.remove_file(&temp) {
                    log::warn!(
                        "failed to remove temporary file '{}': {}",
                        temp.display(),
                        cleanup
                    );
                }
            }
            Err(Error::Io(e))
        }
    }
}
