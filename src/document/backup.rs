//! Rotating backup copies of saved documents.
//!
//! Before a save the current document is copied to `<doc>!`. Once the new
//! container is committed, that copy becomes `<doc>~` and older copies move
//! to `<doc>~~`, `<doc>~~~` and so on, keeping at most
//! [`BackupPolicy::copies`] generations. If the save fails, `<doc>!` is
//! removed and the document is untouched.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::BackupPolicy;
use crate::Result;
use crate::fs::FileSystem;

/// Characters replaced when a document path is turned into a directory name.
const MANGLED_CHARS: [char; 4] = ['\\', '/', ':', '?'];

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the pre-save copy, always next to the document.
pub(crate) fn pending_path(document: &Path) -> PathBuf {
    with_suffix(document, "!")
}

/// Directory and base path the `~` suffixes are appended to.
///
/// With a custom directory, backups of `/a/b/notes.ctz` live in
/// `<custom_dir>/_a_b_notes.ctz/notes.ctz~`.
pub(crate) fn backup_base(document: &Path, policy: &BackupPolicy) -> PathBuf {
    match (&policy.custom_dir, document.file_name()) {
        (Some(dir), Some(name)) => {
            let mangled: String = document
                .to_string_lossy()
                .chars()
                .map(|c| if MANGLED_CHARS.contains(&c) { '_' } else { c })
                .collect();
            dir.join(mangled).join(name)
        }
        _ => document.to_path_buf(),
    }
}

/// Path of backup generation `generation` (1 = newest).
pub(crate) fn backup_path(base: &Path, generation: u32) -> PathBuf {
    with_suffix(base, &"~".repeat(generation as usize))
}

/// Copies the current document to its pending backup path.
pub(crate) fn stage(fs: &dyn FileSystem, document: &Path) -> Result<PathBuf> {
    let pending = pending_path(document);
    fs.copy(document, &pending)?;
    Ok(pending)
}

/// Removes a pending backup after a failed save.
pub(crate) fn discard(fs: &dyn FileSystem, pending: &Path) {
    if let Err(e) = fs.remove_file(pending) {
        log::warn!(
            "failed to remove pending backup '{}': {}",
            pending.display(),
            e
        );
    }
}

/// Moves `from` to `to`, copying when a rename is not possible (for
/// example across file systems).
fn move_file(fs: &dyn FileSystem, from: &Path, to: &Path) -> std::io::Result<()> {
    match fs.rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs.copy(from, to)?;
            fs.remove_file(from)
        }
    }
}

/// Shifts existing backups one generation down and turns the pending copy
/// into the newest one.
pub(crate) fn rotate(
    fs: &dyn FileSystem,
    document: &Path,
    pending: &Path,
    policy: &BackupPolicy,
) -> Result<()> {
    let mut base = backup_base(document, policy);
    if let Some(parent) = base.parent() {
        if let Err(e) = fs.create_dir_all(parent) {
            log::warn!(
                "cannot create backup directory '{}', keeping backups next to the document: {}",
                parent.display(),
                e
            );
            base = document.to_path_buf();
        }
    }

    for generation in (1..policy.copies).rev() {
        let older = backup_path(&base, generation);
        if fs.exists(&older) {
            move_file(fs, &older, &backup_path(&base, generation + 1))?;
        }
    }
    move_file(fs, pending, &backup_path(&base, 1))?;
    log::debug!("rotated backups of '{}'", document.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StdFileSystem;

    #[test]
    fn test_paths() {
        let doc = Path::new("/docs/notes.ctz");
        assert_eq!(pending_path(doc), PathBuf::from("/docs/notes.ctz!"));
        assert_eq!(backup_path(doc, 1), PathBuf::from("/docs/notes.ctz~"));
        assert_eq!(backup_path(doc, 3), PathBuf::from("/docs/notes.ctz~~~"));

        let policy = BackupPolicy::new(2).custom_dir("/backups");
        assert_eq!(
            backup_base(doc, &policy),
            PathBuf::from("/backups/_docs_notes.ctz/notes.ctz")
        );
    }

    #[test]
    fn test_rotation_keeps_limited_generations() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        let policy = BackupPolicy::new(2);

        for version in ["v1", "v2", "v3", "v4"] {
            std::fs::write(&doc, version).unwrap();
            let pending = stage(&StdFileSystem, &doc).unwrap();
            rotate(&StdFileSystem, &doc, &pending, &policy).unwrap();
            assert!(!pending.exists());
        }

        assert_eq!(std::fs::read_to_string(backup_path(&doc, 1)).unwrap(), "v4");
        assert_eq!(std::fs::read_to_string(backup_path(&doc, 2)).unwrap(), "v3");
        assert!(!backup_path(&doc, 3).exists());
    }

    #[test]
    fn test_rotation_into_custom_dir() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("notes.ctz");
        let backups = dir.path().join("backups");
        let policy = BackupPolicy::new(1).custom_dir(&backups);

        std::fs::write(&doc, "v1").unwrap();
        let pending = stage(&StdFileSystem, &doc).unwrap();
        rotate(&StdFileSystem, &doc, &pending, &policy).unwrap();

        let newest = backup_path(&backup_base(&doc, &policy), 1);
        assert!(newest.starts_with(&backups));
        assert_eq!(std::fs::read_to_string(newest).unwrap(), "v1");
    }
}
