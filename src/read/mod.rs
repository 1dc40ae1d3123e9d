//! Reading containers: listing entries and extracting them.
//!
//! # Example
//!
//! ```rust,no_run
//! use docseal::read::{Archive, ExtractOptions};
//! use docseal::Password;
//!
//! let archive = Archive::open("notes.ctz")?.with_password(Password::new("secret"));
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//! archive.extract_all("out", &ExtractOptions::default())?;
//! # Ok::<(), docseal::Error>(())
//! ```

mod options;

pub use options::{ExtractOptions, ExtractResult, OverwritePolicy};

use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::codec;
use crate::container::{self, ContainerInfo, Entry, EntryIter};
use crate::crypto::{ContainerKeys, TAG_LEN};
use crate::format::{FORMAT_VERSION, Header};
use crate::fs::{SharedFileSystem, StdFileSystem};
use crate::{Error, Password, Result};

/// An opened container.
///
/// Opening parses and checks the header only; nothing is decrypted or
/// decompressed until an extraction method is called. The container bytes
/// are held in memory, so the archive stays valid if the file is replaced.
pub struct Archive {
    path: Option<PathBuf>,
    data: Vec<u8>,
    header: Header,
    header_len: usize,
    password: Option<Password>,
    fs: SharedFileSystem,
}

impl std::fmt::Debug for Archive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archive")
            .field("path", &self.path)
            .field("entries", &self.header.entries.len())
            .field("encrypted", &self.is_encrypted())
            .finish_non_exhaustive()
    }
}

impl Archive {
    /// Opens a container file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read and
    /// [`Error::CorruptArchive`] if it is not a well-formed container,
    /// including truncated files and files with trailing data.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(StdFileSystem::shared(), path)
    }

    /// Opens a container file through the given file system.
    pub fn open_with(fs: SharedFileSystem, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs.read(path)?;
        let mut archive = Self::parse(data, fs)?;
        archive.path = Some(path.to_path_buf());
        log::debug!(
            "opened '{}': {} entries, encrypted: {}",
            path.display(),
            archive.header.entries.len(),
            archive.is_encrypted()
        );
        Ok(archive)
    }

    /// Opens a container held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::parse(data, StdFileSystem::shared())
    }

    fn parse(data: Vec<u8>, fs: SharedFileSystem) -> Result<Self> {
        let (header, header_len) = Header::parse(&data)?;

        let tag_len = if header.encryption.is_some() { TAG_LEN } else { 0 };
        let expected = (header_len as u64)
            .checked_add(header.packed_size)
            .and_then(|n| n.checked_add(tag_len as u64))
            .ok_or_else(|| Error::corrupt("packed size overflows"))?;
        let actual = data.len() as u64;
        if actual < expected {
            return Err(Error::corrupt(format!(
                "truncated payload: {} bytes present, {} expected",
                actual, expected
            )));
        }
        if actual > expected {
            return Err(Error::corrupt(format!(
                "{} unexpected bytes after payload",
                actual - expected
            )));
        }

        Ok(Self {
            path: None,
            data,
            header,
            header_len,
            password: None,
            fs,
        })
    }

    /// Sets the password used for extraction.
    ///
    /// Empty passwords are treated as no password.
    pub fn with_password(mut self, password: impl Into<Password>) -> Self {
        self.set_password(Some(password.into()));
        self
    }

    /// Sets or clears the password used for extraction.
    pub fn set_password(&mut self, password: Option<Password>) {
        self.password = password.and_then(Password::non_empty);
    }

    /// Returns the file path, if opened from disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true if the payload is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.header.encryption.is_some()
    }

    /// Returns a summary of the container.
    pub fn info(&self) -> ContainerInfo {
        ContainerInfo {
            version: FORMAT_VERSION,
            method: self.header.method,
            encrypted: self.is_encrypted(),
            entry_count: self.header.entries.len(),
            packed_size: self.header.packed_size,
            unpacked_size: self.header.unpacked_size(),
        }
    }

    /// Returns an iterator over the entries in payload order.
    pub fn entries(&self) -> EntryIter<'_> {
        EntryIter::new(&self.header.entries)
    }

    /// Returns the number of entries. Always at least one.
    pub fn len(&self) -> usize {
        self.header.entries.len()
    }

    /// Returns true if the container has no entries, which never happens
    /// for a successfully opened container.
    pub fn is_empty(&self) -> bool {
        self.header.entries.is_empty()
    }

    /// Finds an entry by exact name.
    pub fn find_entry(&self, name: &str) -> Result<&Entry> {
        container::find_entry(&self.header.entries, name)
    }

    /// Checks a password against the stored key check without decrypting
    /// the payload.
    ///
    /// # Errors
    ///
    /// [`Error::WrongPassword`] on mismatch. Unencrypted containers accept
    /// any password.
    pub fn verify_password(&self, password: &Password) -> Result<()> {
        match &self.header.encryption {
            None => Ok(()),
            Some(enc) => {
                let keys = ContainerKeys::derive(password, &enc.salt, enc.kdf_cycles_power)?;
                if keys.verify_key_check(&enc.key_check)? {
                    Ok(())
                } else {
                    Err(Error::WrongPassword)
                }
            }
        }
    }

    /// Decrypts, authenticates and decompresses the whole payload.
    fn decode_payload(&self) -> Result<Zeroizing<Vec<u8>>> {
        let header_bytes = &self.data[..self.header_len];
        let payload_end = self.header_len + self.header.packed_size as usize;
        let payload = &self.data[self.header_len..payload_end];

        let compressed = match &self.header.encryption {
            None => Zeroizing::new(payload.to_vec()),
            Some(enc) => {
                let password = self.password.as_ref().ok_or(Error::PasswordRequired)?;
                let keys = ContainerKeys::derive(password, &enc.salt, enc.kdf_cycles_power)?;
                if !keys.verify_key_check(&enc.key_check)? {
                    return Err(Error::WrongPassword);
                }
                let tag = &self.data[payload_end..];
                if !keys.verify_tag(header_bytes, payload, tag)? {
                    return Err(Error::corrupt("authentication tag mismatch"));
                }
                Zeroizing::new(keys.decrypt(&enc.iv, payload)?)
            }
        };

        let decoded = Zeroizing::new(codec::decompress(
            self.header.method,
            self.header.method_property,
            &compressed,
            self.header.unpacked_size(),
        )?);

        for entry in &self.header.entries {
            let crc = crc32fast::hash(entry_slice(&decoded, entry));
            if crc != entry.crc32 {
                return Err(Error::corrupt(format!(
                    "CRC mismatch for '{}': stored {:#010x}, computed {:#010x}",
                    entry.name, entry.crc32, crc
                )));
            }
        }
        Ok(decoded)
    }

    /// Extracts one entry into memory.
    ///
    /// # Errors
    ///
    /// - [`Error::EntryNotFound`] if no entry has this name
    /// - [`Error::PasswordRequired`] / [`Error::WrongPassword`] for encrypted
    ///   containers
    /// - [`Error::CorruptArchive`] if any integrity check fails
    pub fn extract_entry(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.find_entry(name)?;
        let decoded = self.decode_payload()?;
        Ok(entry_slice(&decoded, entry).to_vec())
    }

    /// Extracts the first entry into memory.
    pub fn extract_first(&self) -> Result<(Entry, Vec<u8>)> {
        let entry = self
            .header
            .entries
            .first()
            .ok_or_else(|| Error::corrupt("container has no entries"))?;
        let decoded = self.decode_payload()?;
        Ok((entry.clone(), entry_slice(&decoded, entry).to_vec()))
    }

    /// Extracts every entry into memory, in payload order.
    pub fn read_all(&self) -> Result<Vec<(Entry, Vec<u8>)>> {
        let decoded = self.decode_payload()?;
        Ok(self
            .header
            .entries
            .iter()
            .map(|entry| (entry.clone(), entry_slice(&decoded, entry).to_vec()))
            .collect())
    }

    /// Writes one entry to `destination`.
    pub fn extract_entry_to(
        &self,
        name: &str,
        destination: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<bool> {
        let entry = self.find_entry(name)?;
        let decoded = self.decode_payload()?;
        self.write_entry(entry, &decoded, destination.as_ref(), options)
    }

    /// Extracts every entry below `dir`, creating it if needed.
    ///
    /// Entry names are resolved with [`EntryName::to_path`], which never
    /// leaves `dir`.
    ///
    /// [`EntryName::to_path`]: crate::EntryName::to_path
    pub fn extract_all(&self, dir: impl AsRef<Path>, options: &ExtractOptions) -> Result<ExtractResult> {
        let dir = dir.as_ref();
        let decoded = self.decode_payload()?;
        self.fs.create_dir_all(dir)?;

        let mut result = ExtractResult::default();
        for entry in &self.header.entries {
            let target = entry.name.to_path(dir)?;
            if self.write_entry(entry, &decoded, &target, options)? {
                result.entries_extracted += 1;
                result.bytes_extracted += entry.size;
            } else {
                result.entries_skipped += 1;
            }
        }
        log::debug!(
            "extracted {} entries ({} bytes) to '{}'",
            result.entries_extracted,
            result.bytes_extracted,
            dir.display()
        );
        Ok(result)
    }

    /// Returns false if the entry was skipped.
    fn write_entry(
        &self,
        entry: &Entry,
        decoded: &[u8],
        target: &Path,
        options: &ExtractOptions,
    ) -> Result<bool> {
        if self.fs.exists(target) {
            match options.overwrite {
                OverwritePolicy::Skip => return Ok(false),
                OverwritePolicy::Error => {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        format!("'{}' already exists", target.display()),
                    )));
                }
                OverwritePolicy::Overwrite => {}
            }
        }

        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write(target, entry_slice(decoded, entry))?;

        if options.preserve_mtime {
            if let Err(e) = self.fs.set_modified(target, entry.modified.as_system_time()) {
                log::warn!(
                    "failed to set modification time on '{}': {}",
                    target.display(),
                    e
                );
            }
        }
        Ok(true)
    }
}

/// Offsets were validated against the decoded length by `decompress`.
fn entry_slice<'a>(decoded: &'a [u8], entry: &Entry) -> &'a [u8] {
    let start = entry.offset as usize;
    &decoded[start..start + entry.size as usize]
}

/// Reads the first entry of a container.
///
/// Documents hold exactly one entry; this is the form the document façade
/// uses.
///
/// # Errors
///
/// See [`Archive::extract_entry`].
pub fn extract(path: impl AsRef<Path>, password: Option<&Password>) -> Result<Vec<u8>> {
    let mut archive = Archive::open(path)?;
    archive.set_password(password.cloned());
    archive.extract_first().map(|(_, bytes)| bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CodecParams;
    use crate::write::ArchiveWriter;

    fn params() -> CodecParams {
        CodecParams::DOCUMENT.with_kdf_cycles_power(4)
    }

    fn sealed(password: Option<&str>) -> Vec<u8> {
        let mut writer = ArchiveWriter::new().params(params());
        if let Some(p) = password {
            writer = writer.password(Password::new(p));
        }
        writer.add_bytes("a.txt", b"alpha".to_vec()).unwrap();
        writer.add_bytes("dir/b.txt", Vec::new()).unwrap();
        writer.add_bytes("c.txt", b"gamma gamma".to_vec()).unwrap();
        writer.encode().unwrap()
    }

    #[test]
    fn test_list_and_extract() {
        let archive = Archive::from_bytes(sealed(None)).unwrap();
        let names: Vec<&str> = archive.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "dir/b.txt", "c.txt"]);
        assert_eq!(archive.len(), 3);
        assert!(!archive.is_encrypted());
        assert_eq!(archive.extract_entry("c.txt").unwrap(), b"gamma gamma");
        assert!(archive.extract_entry("dir/b.txt").unwrap().is_empty());
        assert_eq!(archive.info().unpacked_size, 16);
    }

    #[test]
    fn test_missing_entry() {
        let archive = Archive::from_bytes(sealed(None)).unwrap();
        let err = archive.extract_entry("nope").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound { .. }));
    }

    #[test]
    fn test_password_required_then_accepted() {
        let data = sealed(Some("pw"));
        let archive = Archive::from_bytes(data).unwrap();
        assert!(archive.is_encrypted());
        assert!(matches!(
            archive.extract_entry("a.txt"),
            Err(Error::PasswordRequired)
        ));

        let archive = archive.with_password("pw");
        assert_eq!(archive.extract_entry("a.txt").unwrap(), b"alpha");
        archive.verify_password(&Password::new("pw")).unwrap();
        assert!(matches!(
            archive.verify_password(&Password::new("PW")),
            Err(Error::WrongPassword)
        ));
    }

    #[test]
    fn test_empty_password_means_none() {
        let archive = Archive::from_bytes(sealed(Some("pw"))).unwrap().with_password("");
        assert!(matches!(
            archive.extract_first(),
            Err(Error::PasswordRequired)
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut data = sealed(None);
        data.push(0);
        assert!(Archive::from_bytes(data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_extract_all_policies() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::from_bytes(sealed(None)).unwrap();

        let result = archive.extract_all(dir.path(), &ExtractOptions::new()).unwrap();
        assert_eq!(result.entries_extracted, 3);
        assert_eq!(result.bytes_extracted, 16);
        assert_eq!(std::fs::read(dir.path().join("dir").join("b.txt")).unwrap(), b"");

        let err = archive.extract_all(dir.path(), &ExtractOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::AlreadyExists));

        let skip = ExtractOptions::new().overwrite(OverwritePolicy::Skip);
        let result = archive.extract_all(dir.path(), &skip).unwrap();
        assert_eq!(result.entries_skipped, 3);

        std::fs::write(dir.path().join("a.txt"), b"changed").unwrap();
        let over = ExtractOptions::new().overwrite(OverwritePolicy::Overwrite);
        archive.extract_all(dir.path(), &over).unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"alpha");
    }
}
