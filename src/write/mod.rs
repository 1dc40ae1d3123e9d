//! Creating and rewriting containers.
//!
//! A container is always written whole: entries are buffered in memory,
//! concatenated, compressed as one stream, optionally encrypted, and
//! committed through a temporary sibling file and a rename.
//!
//! # Example
//!
//! ```rust,no_run
//! use docseal::write::ArchiveWriter;
//! use docseal::Password;
//!
//! let mut writer = ArchiveWriter::new().password(Password::new("secret"));
//! writer.add_bytes("notes.ctd", b"<cherrytree/>".to_vec())?;
//! let result = writer.commit("notes.ctz")?;
//! println!("wrote {} bytes", result.container_size);
//! # Ok::<(), docseal::Error>(())
//! ```

mod commit;
mod options;
mod update;

pub use commit::commit_atomic;
pub use options::{EntryMeta, WriteResult};
pub use update::{ArchiveUpdater, UpdateResult, update};

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use zeroize::Zeroizing;

use crate::codec;
use crate::container::Entry;
use crate::crypto::{ContainerKeys, NoncePolicy};
use crate::format::{CodecParams, EncryptionHeader, Header};
use crate::fs::{SharedFileSystem, StdFileSystem};
use crate::{EntryName, Error, Password, Result};

/// An entry waiting to be written.
#[derive(Debug)]
struct PendingEntry {
    name: EntryName,
    data: Zeroizing<Vec<u8>>,
    meta: EntryMeta,
}

/// Builds a container from in-memory entries.
///
/// Entries are written in the order they were added. Names must be unique.
pub struct ArchiveWriter {
    fs: SharedFileSystem,
    params: CodecParams,
    password: Option<Password>,
    nonce_policy: NoncePolicy,
    entries: Vec<PendingEntry>,
    names: HashSet<EntryName>,
}

impl std::fmt::Debug for ArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("params", &self.params)
            .field("encrypted", &self.password.is_some())
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    /// Creates an empty writer with [`CodecParams::DOCUMENT`] settings.
    pub fn new() -> Self {
        Self {
            fs: StdFileSystem::shared(),
            params: CodecParams::DOCUMENT,
            password: None,
            nonce_policy: NoncePolicy::default(),
            entries: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Routes all file access through `fs`.
    pub fn with_file_system(mut self, fs: SharedFileSystem) -> Self {
        self.fs = fs;
        self
    }

    /// Sets compression and encryption parameters.
    pub fn params(mut self, params: CodecParams) -> Self {
        self.params = params;
        self
    }

    /// Encrypts the container with `password`. An empty password disables
    /// encryption.
    pub fn password(mut self, password: impl Into<Password>) -> Self {
        self.set_password(Some(password.into()));
        self
    }

    /// Sets or clears the password.
    pub fn set_password(&mut self, password: Option<Password>) {
        self.password = password.and_then(Password::non_empty);
    }

    /// Sets how the salt and IV are chosen. Defaults to fresh random values.
    pub fn nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = policy;
        self
    }

    /// Returns true if a password is set.
    pub fn is_encrypted(&self) -> bool {
        self.password.is_some()
    }

    /// Returns the number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if an entry with this name was added.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Adds an entry from memory, stamped with the current time.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidEntryName`] for unusable names and
    /// [`Error::EntryExists`] for duplicates.
    pub fn add_bytes(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        self.add_entry(EntryName::new(name)?, data, EntryMeta::default())
    }

    /// Adds an entry with explicit metadata.
    pub fn add_entry(
        &mut self,
        name: EntryName,
        data: impl Into<Vec<u8>>,
        meta: EntryMeta,
    ) -> Result<()> {
        if !self.names.insert(name.clone()) {
            return Err(Error::EntryExists {
                name: name.as_str().to_owned(),
            });
        }
        self.entries.push(PendingEntry {
            name,
            data: Zeroizing::new(data.into()),
            meta,
        });
        Ok(())
    }

    /// Adds a file from disk under `name`, keeping its modification time
    /// and permissions.
    pub fn add_path(&mut self, source: impl AsRef<Path>, name: &str) -> Result<()> {
        let source = source.as_ref();
        let name = EntryName::new(name)?;
        let meta = EntryMeta::from_path(source)?;
        let data = self.fs.read(source)?;
        self.add_entry(name, data, meta)
    }

    /// Replaces the data of an existing entry or adds a new one.
    pub(crate) fn upsert(&mut self, name: EntryName, data: Vec<u8>, meta: EntryMeta) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                existing.data = Zeroizing::new(data);
                existing.meta = meta;
            }
            None => {
                self.names.insert(name.clone());
                self.entries.push(PendingEntry {
                    name,
                    data: Zeroizing::new(data),
                    meta,
                });
            }
        }
    }

    /// Encodes the complete container.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no entries were added; compression and
    /// key derivation errors otherwise.
    pub fn encode(&self) -> Result<Vec<u8>> {
        self.seal().map(|(bytes, _)| bytes)
    }

    /// Encodes the container into `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<WriteResult> {
        let (bytes, result) = self.seal()?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(result)
    }

    /// Encodes the container and atomically replaces `destination`.
    ///
    /// On failure `destination` is left as it was.
    pub fn commit(self, destination: impl AsRef<Path>) -> Result<WriteResult> {
        let destination = destination.as_ref();
        let (bytes, result) = self.seal()?;
        commit_atomic(self.fs.as_ref(), destination, &bytes)?;
        Ok(result)
    }

    fn seal(&self) -> Result<(Vec<u8>, WriteResult)> {
        if self.entries.is_empty() {
            return Err(Error::InvalidState {
                operation: "encode",
                state: "empty",
            });
        }

        let total_size: usize = self.entries.iter().map(|e| e.data.len()).sum();
        let mut plain = Zeroizing::new(Vec::with_capacity(total_size));
        let mut entries = Vec::with_capacity(self.entries.len());
        for pending in &self.entries {
            entries.push(Entry {
                name: pending.name.clone(),
                size: pending.data.len() as u64,
                modified: pending.meta.modified,
                attributes: pending.meta.attributes,
                crc32: crc32fast::hash(&pending.data),
                offset: plain.len() as u64,
            });
            plain.extend_from_slice(&pending.data);
        }

        let (compressed, method_property) = codec::compress(&plain, &self.params)?;

        let (header, payload, keys) = match &self.password {
            None => {
                let header = Header {
                    method: self.params.method,
                    method_property,
                    encryption: None,
                    entries,
                    packed_size: compressed.len() as u64,
                };
                (header, compressed, None)
            }
            Some(password) => {
                let (salt, iv) = self.nonce_policy.generate(self.params.salt_len as usize)?;
                let keys =
                    ContainerKeys::derive(password, &salt, self.params.kdf_cycles_power)?;
                let ciphertext = keys.encrypt(&iv, &Zeroizing::new(compressed))?;
                let header = Header {
                    method: self.params.method,
                    method_property,
                    encryption: Some(EncryptionHeader {
                        cipher: self.params.cipher,
                        kdf_cycles_power: self.params.kdf_cycles_power,
                        salt,
                        iv,
                        key_check: keys.key_check()?,
                    }),
                    entries,
                    packed_size: ciphertext.len() as u64,
                };
                (header, ciphertext, Some(keys))
            }
        };

        let mut out = header.encode()?;
        let header_len = out.len();
        out.extend_from_slice(&payload);
        if let Some(keys) = keys {
            let tag = keys.tag(&out[..header_len], &payload)?;
            out.extend_from_slice(&tag);
        }

        let result = WriteResult {
            entries_written: header.entries.len(),
            total_size: total_size as u64,
            packed_size: header.packed_size,
            container_size: out.len() as u64,
            encrypted: header.encryption.is_some(),
        };
        Ok((out, result))
    }
}

/// Writes a single-entry container to `destination`.
///
/// This is the form documents are saved in: one entry holding the document
/// bytes, LZMA2-compressed and encrypted when `password` is non-empty.
///
/// # Errors
///
/// [`Error::InvalidEntryName`] for a bad `entry_name`, or any write error.
/// On failure `destination` is left as it was.
pub fn create(
    plaintext: &[u8],
    entry_name: &str,
    password: Option<&Password>,
    destination: impl AsRef<Path>,
) -> Result<WriteResult> {
    create_with(CodecParams::DOCUMENT, plaintext, entry_name, password, destination)
}

/// [`create`] with explicit codec parameters.
pub fn create_with(
    params: CodecParams,
    plaintext: &[u8],
    entry_name: &str,
    password: Option<&Password>,
    destination: impl AsRef<Path>,
) -> Result<WriteResult> {
    let mut writer = ArchiveWriter::new().params(params);
    writer.set_password(password.cloned());
    writer.add_bytes(entry_name, plaintext)?;
    writer.commit(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::Archive;

    fn fast() -> CodecParams {
        CodecParams::DOCUMENT.with_kdf_cycles_power(4)
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut writer = ArchiveWriter::new();
        writer.add_bytes("a", b"1".to_vec()).unwrap();
        let err = writer.add_bytes("a", b"2".to_vec()).unwrap_err();
        assert!(matches!(err, Error::EntryExists { name } if name == "a"));
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_bad_name_rejected() {
        let mut writer = ArchiveWriter::new();
        let err = writer.add_bytes("../escape", b"x".to_vec()).unwrap_err();
        assert!(matches!(err, Error::InvalidEntryName(_)));
        assert!(writer.is_empty());
    }

    #[test]
    fn test_empty_writer_refuses_to_encode() {
        let err = ArchiveWriter::new().encode().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_explicit_nonce_is_deterministic() {
        let build = || {
            let mut writer = ArchiveWriter::new()
                .params(fast())
                .password("pw")
                .nonce_policy(NoncePolicy::explicit(vec![7; 16], [9; 16]));
            writer
                .add_entry(
                    EntryName::new("content.xml").unwrap(),
                    b"NodeContent".to_vec(),
                    EntryMeta::new().modified(crate::Timestamp::UNIX_EPOCH),
                )
                .unwrap();
            writer.encode().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_random_nonce_differs() {
        let build = || {
            let mut writer = ArchiveWriter::new().params(fast()).password("pw");
            writer.add_bytes("a", b"same".to_vec()).unwrap();
            writer.encode().unwrap()
        };
        assert_ne!(build(), build());
    }

    #[test]
    fn test_write_result() {
        let mut writer = ArchiveWriter::new().params(fast()).password("pw");
        writer.add_bytes("a", vec![b'x'; 4096]).unwrap();
        let mut sink = Vec::new();
        let result = writer.write_to(&mut sink).unwrap();
        assert_eq!(result.entries_written, 1);
        assert_eq!(result.total_size, 4096);
        assert!(result.encrypted);
        assert_eq!(result.container_size, sink.len() as u64);
        assert!(result.packed_size < 4096);
        assert_eq!(result.packed_size % 16, 0);
    }

    #[test]
    fn test_copy_method_roundtrip() {
        let params = fast().with_method(codec::MethodId::Copy);
        let mut writer = ArchiveWriter::new().params(params);
        writer.add_bytes("a", b"stored".to_vec()).unwrap();
        let archive = Archive::from_bytes(writer.encode().unwrap()).unwrap();
        assert_eq!(archive.info().method, codec::MethodId::Copy);
        assert_eq!(archive.extract_entry("a").unwrap(), b"stored");
    }

    #[test]
    fn test_create_and_extract() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.ctz");
        let password = Password::new("secret");
        create_with(fast(), b"<cherrytree/>", "doc.ctd", Some(&password), &path).unwrap();
        let bytes = crate::read::extract(&path, Some(&password)).unwrap();
        assert_eq!(bytes, b"<cherrytree/>");
    }
}
