//! Container header structures, encoding and parsing.

use std::collections::HashSet;
use std::io::{self, Cursor};

use super::reader::{read_array, read_bytes, read_u8, read_u16_le, read_u32_le, read_u64_le};
use super::{CipherId, FLAG_ENCRYPTED, FORMAT_VERSION, KNOWN_FLAGS, MAGIC};
use crate::codec::MethodId;
use crate::container::Entry;
use crate::crypto::{IV_LEN, KEY_CHECK_LEN, MAX_SALT_LEN};
use crate::{EntryName, Error, Result, Timestamp};

/// Smallest possible encoded entry descriptor: a one-byte name plus the
/// fixed fields.
const MIN_ENTRY_LEN: u64 = 2 + 1 + 8 + 8 + 4 + 4;

/// Encryption parameters stored in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionHeader {
    /// Cipher suite.
    pub cipher: CipherId,
    /// Key derivation cost exponent.
    pub kdf_cycles_power: u8,
    /// Key derivation salt.
    pub salt: Vec<u8>,
    /// CBC initialization vector.
    pub iv: [u8; IV_LEN],
    /// Truncated password check value.
    pub key_check: [u8; KEY_CHECK_LEN],
}

/// A parsed container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Compression method.
    pub method: MethodId,
    /// Method property byte.
    pub method_property: u8,
    /// Encryption parameters, if the payload is encrypted.
    pub encryption: Option<EncryptionHeader>,
    /// Entry descriptors in payload order.
    pub entries: Vec<Entry>,
    /// Stored payload size in bytes.
    pub packed_size: u64,
}

impl Header {
    /// Total uncompressed size of all entries.
    pub fn unpacked_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Serializes the header, including its trailing CRC-32.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(64 + self.entries.len() * 64);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);

        let flags = if self.encryption.is_some() {
            FLAG_ENCRYPTED
        } else {
            0
        };
        out.push(flags);
        out.push(self.method.id());
        out.push(self.method_property);

        if let Some(enc) = &self.encryption {
            if enc.salt.len() > MAX_SALT_LEN {
                return Err(Error::CryptoError(format!(
                    "salt of {} bytes exceeds {} bytes",
                    enc.salt.len(),
                    MAX_SALT_LEN
                )));
            }
            out.push(enc.cipher.id());
            out.push(enc.kdf_cycles_power);
            out.push(enc.salt.len() as u8);
            out.extend_from_slice(&enc.salt);
            out.extend_from_slice(&enc.iv);
            out.extend_from_slice(&enc.key_check);
        }

        let count = u32::try_from(self.entries.len()).map_err(|_| {
            Error::ResourceLimitExceeded(format!("{} entries", self.entries.len()))
        })?;
        out.extend_from_slice(&count.to_le_bytes());

        for entry in &self.entries {
            let name = entry.name.as_str().as_bytes();
            // EntryName guarantees the length fits the u16 field.
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(name);
            out.extend_from_slice(&entry.size.to_le_bytes());
            out.extend_from_slice(&entry.modified.as_filetime().to_le_bytes());
            out.extend_from_slice(&entry.attributes.to_le_bytes());
            out.extend_from_slice(&entry.crc32.to_le_bytes());
        }

        out.extend_from_slice(&self.packed_size.to_le_bytes());
        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    /// Parses a header from the start of `data`.
    ///
    /// Returns the header and its encoded length (including the CRC).
    ///
    /// # Errors
    ///
    /// Every structural problem, including a CRC mismatch, an unknown
    /// version or unknown flags, is reported as [`Error::CorruptArchive`].
    /// A well-formed header naming an unknown compression method yields
    /// [`Error::UnsupportedMethod`].
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
            return Err(Error::corrupt("not a docseal container (bad signature)"));
        }

        let mut r = Cursor::new(data);
        let raw = RawHeader::read(&mut r).map_err(|e| Error::from_read(e, "header"))?;
        let body_len = r.position() as usize;
        let stored_crc = read_u32_le(&mut r).map_err(|e| Error::from_read(e, "header"))?;

        let actual_crc = crc32fast::hash(&data[..body_len]);
        if stored_crc != actual_crc {
            return Err(Error::corrupt(format!(
                "header CRC mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, actual_crc
            )));
        }

        Ok((raw.validate()?, body_len + 4))
    }
}

/// Header fields as read from disk, before semantic checks.
struct RawHeader {
    version: u8,
    flags: u8,
    method: u8,
    method_property: u8,
    encryption: Option<RawEncryption>,
    entries: Vec<RawEntry>,
    packed_size: u64,
}

struct RawEncryption {
    cipher: u8,
    kdf_cycles_power: u8,
    salt: Vec<u8>,
    iv: [u8; IV_LEN],
    key_check: [u8; KEY_CHECK_LEN],
}

struct RawEntry {
    name: Vec<u8>,
    size: u64,
    modified: u64,
    attributes: u32,
    crc32: u32,
}

impl RawHeader {
    fn read(r: &mut Cursor<&[u8]>) -> io::Result<Self> {
        let _magic: [u8; 6] = read_array(r)?;
        let version = read_u8(r)?;
        let flags = read_u8(r)?;
        let method = read_u8(r)?;
        let method_property = read_u8(r)?;

        let encryption = if flags & FLAG_ENCRYPTED != 0 {
            let cipher = read_u8(r)?;
            let kdf_cycles_power = read_u8(r)?;
            let salt_len = read_u8(r)?;
            Some(RawEncryption {
                cipher,
                kdf_cycles_power,
                salt: read_bytes(r, salt_len as usize)?,
                iv: read_array(r)?,
                key_check: read_array(r)?,
            })
        } else {
            None
        };

        let count = read_u32_le(r)?;
        let remaining = (r.get_ref().len() as u64).saturating_sub(r.position());
        if u64::from(count).saturating_mul(MIN_ENTRY_LEN) > remaining {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "entry table larger than the file",
            ));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_len = read_u16_le(r)?;
            entries.push(RawEntry {
                name: read_bytes(r, name_len as usize)?,
                size: read_u64_le(r)?,
                modified: read_u64_le(r)?,
                attributes: read_u32_le(r)?,
                crc32: read_u32_le(r)?,
            });
        }

        let packed_size = read_u64_le(r)?;
        Ok(Self {
            version,
            flags,
            method,
            method_property,
            encryption,
            entries,
            packed_size,
        })
    }

    fn validate(self) -> Result<Header> {
        if self.version != FORMAT_VERSION {
            return Err(Error::corrupt(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        if self.flags & !KNOWN_FLAGS != 0 {
            return Err(Error::corrupt(format!(
                "unknown header flags {:#04x}",
                self.flags
            )));
        }
        if self.entries.is_empty() {
            return Err(Error::corrupt("container has no entries"));
        }

        let method = MethodId::try_from(self.method)?;

        let encryption = match self.encryption {
            Some(raw) => {
                if raw.salt.len() > MAX_SALT_LEN {
                    return Err(Error::corrupt(format!(
                        "salt of {} bytes exceeds {} bytes",
                        raw.salt.len(),
                        MAX_SALT_LEN
                    )));
                }
                Some(EncryptionHeader {
                    cipher: CipherId::try_from(raw.cipher)?,
                    kdf_cycles_power: raw.kdf_cycles_power,
                    salt: raw.salt,
                    iv: raw.iv,
                    key_check: raw.key_check,
                })
            }
            None => None,
        };

        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut offset = 0u64;
        let mut entries = Vec::with_capacity(self.entries.len());
        for raw in self.entries {
            let name = String::from_utf8(raw.name)
                .map_err(|_| Error::corrupt("entry name is not valid UTF-8"))?;
            let name = EntryName::try_from(name)
                .map_err(|e| Error::corrupt(format!("bad entry name: {}", e)))?;
            if !seen.insert(name.clone()) {
                return Err(Error::corrupt(format!("duplicate entry '{}'", name)));
            }

            entries.push(Entry {
                name,
                size: raw.size,
                modified: Timestamp::from_filetime(raw.modified),
                attributes: raw.attributes,
                crc32: raw.crc32,
                offset,
            });
            offset = offset
                .checked_add(raw.size)
                .ok_or_else(|| Error::corrupt("entry sizes overflow"))?;
        }

        Ok(Header {
            method,
            method_property: self.method_property,
            encryption,
            entries,
            packed_size: self.packed_size,
        })
    }
}
