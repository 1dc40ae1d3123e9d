//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use docseal::fs::{FileSystem, StdFileSystem};
use docseal::{ArchiveWriter, CodecParams, Password};

/// Key derivation cost used throughout the tests; the production cost of
/// 2^19 rounds makes byte-flip sweeps far too slow.
pub const TEST_KDF_POWER: u8 = 4;

/// Document codec settings with a cheap key derivation.
pub fn fast_params() -> CodecParams {
    CodecParams::DOCUMENT.with_kdf_cycles_power(TEST_KDF_POWER)
}

/// Creates an in-memory container from `(name, data)` pairs.
pub fn create_container(entries: &[(&str, &[u8])], password: Option<&str>) -> docseal::Result<Vec<u8>> {
    let mut writer = ArchiveWriter::new().params(fast_params());
    writer.set_password(password.map(Password::new));
    for (name, data) in entries {
        writer.add_bytes(name, *data)?;
    }
    writer.encode()
}

/// A small cherrytree-style XML document.
pub fn sample_document() -> Vec<u8> {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<cherrytree>\n");
    for i in 0..25 {
        xml.push_str(&format!(
            "  <node name=\"Node {i}\" unique_id=\"{i}\" prog_lang=\"custom-colors\">\
             <rich_text>NodeContent {i}</rich_text></node>\n"
        ));
    }
    xml.push_str("</cherrytree>\n");
    xml.into_bytes()
}

/// A [`FileSystem`] that delegates to the real one but can be told to fail
/// renames, simulating a crash or a full disk at commit time, or to report
/// another user as the owner of every path.
#[derive(Debug, Default)]
pub struct FlakyFileSystem {
    fail_renames: AtomicBool,
    owner: Mutex<Option<u32>>,
}

impl FlakyFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    pub fn report_owner(&self, uid: Option<u32>) {
        *self.owner.lock().unwrap() = uid;
    }
}

impl FileSystem for FlakyFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.create_dir_all(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.remove_dir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        StdFileSystem.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        StdFileSystem.write(path, data)
    }

    fn write_private(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        StdFileSystem.write_private(path, data)
    }

    fn create_private_dir(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.create_private_dir(path)
    }

    fn owner(&self, path: &Path) -> io::Result<Option<u32>> {
        match *self.owner.lock().unwrap() {
            Some(uid) => Ok(Some(uid)),
            None => StdFileSystem.owner(path),
        }
    }

    fn copy_permissions(&self, from: &Path, to: &Path) -> io::Result<()> {
        StdFileSystem.copy_permissions(from, to)
    }

    fn sync_dir(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.sync_dir(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail_renames.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected rename failure"));
        }
        StdFileSystem.rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        StdFileSystem.copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFileSystem.remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        StdFileSystem.exists(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        StdFileSystem.modified(path)
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> io::Result<()> {
        StdFileSystem.set_modified(path, time)
    }
}

/// Lists the names in `dir`, sorted.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
