//! Container format constants, codec parameters and header encoding.
//!
//! A container is laid out as a fixed prelude, optional encryption
//! parameters, the entry descriptors, a header CRC-32, the payload and, for
//! encrypted containers, an HMAC-SHA256 tag. All integers are little-endian.
//!
//! ```text
//! magic "DSEAL\x1a" | version | flags | method | method property
//! [cipher | kdf cycles power | salt len | salt | iv | key check]
//! entry count | { name len | name | size | mtime | attributes | crc32 }*
//! packed size | header crc32 | payload | [tag]
//! ```

pub mod header;
pub mod reader;

use crate::codec::MethodId;
use crate::{Error, Result};

pub use header::{EncryptionHeader, Header};

/// The container file signature.
pub const MAGIC: &[u8; 6] = b"DSEAL\x1a";

/// The only format version this crate reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// Header flag: the payload is encrypted and followed by a tag.
pub const FLAG_ENCRYPTED: u8 = 0x01;

/// All defined flag bits.
pub const KNOWN_FLAGS: u8 = FLAG_ENCRYPTED;

/// Default attributes for entries added from memory: `FILE_ATTRIBUTE_ARCHIVE`.
pub const DEFAULT_ATTRIBUTES: u32 = 0x20;

/// Marks that the high 16 bits of the attributes hold a Unix mode, as 7-Zip
/// does.
pub const UNIX_EXTENSION: u32 = 0x8000;

/// Cipher suites for encrypted containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CipherId {
    /// AES-256-CBC with PKCS#7 padding, authenticated with HMAC-SHA256.
    Aes256CbcHmacSha256 = 0x01,
}

impl CipherId {
    /// Returns the id byte.
    pub const fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CipherId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(CipherId::Aes256CbcHmacSha256),
            other => Err(Error::corrupt(format!("unknown cipher id {:#04x}", other))),
        }
    }
}

/// Compression and encryption settings used when sealing a container.
///
/// Readers never consult these; every value they need is recorded in the
/// header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Compression method.
    pub method: MethodId,
    /// Compression level (0-9).
    pub level: u32,
    /// LZMA2 dictionary size in bytes.
    pub dict_size: u32,
    /// Cipher suite used when a password is set.
    pub cipher: CipherId,
    /// Key derivation runs `2^kdf_cycles_power` SHA-256 rounds.
    pub kdf_cycles_power: u8,
    /// Salt length in bytes (at most 16).
    pub salt_len: u8,
}

impl CodecParams {
    /// Settings for note documents: fast LZMA2 with a 64 KiB dictionary,
    /// 2^19 key derivation rounds and a 16-byte salt.
    pub const DOCUMENT: CodecParams = CodecParams {
        method: MethodId::Lzma2,
        level: 1,
        dict_size: 64 * 1024,
        cipher: CipherId::Aes256CbcHmacSha256,
        kdf_cycles_power: 19,
        salt_len: 16,
    };

    /// Returns a copy with a different key derivation cost.
    pub const fn with_kdf_cycles_power(mut self, power: u8) -> Self {
        self.kdf_cycles_power = power;
        self
    }

    /// Returns a copy with a different compression method.
    pub const fn with_method(mut self, method: MethodId) -> Self {
        self.method = method;
        self
    }

    /// Returns a copy with a different compression level and dictionary.
    pub const fn with_level(mut self, level: u32, dict_size: u32) -> Self {
        self.level = level;
        self.dict_size = dict_size;
        self
    }
}

impl Default for CodecParams {
    fn default() -> Self {
        Self::DOCUMENT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_params() {
        let p = CodecParams::DOCUMENT;
        assert_eq!(p.method, MethodId::Lzma2);
        assert_eq!(p.dict_size, 64 * 1024);
        assert_eq!(p.salt_len, 16);
        assert_eq!(CodecParams::default(), p);
    }

    #[test]
    fn test_builders_only_touch_their_field() {
        let p = CodecParams::DOCUMENT.with_kdf_cycles_power(4);
        assert_eq!(p.kdf_cycles_power, 4);
        assert_eq!(p.method, MethodId::Lzma2);
        let p = p.with_level(9, 1 << 20);
        assert_eq!((p.level, p.dict_size, p.kdf_cycles_power), (9, 1 << 20, 4));
    }

    #[test]
    fn test_cipher_id() {
        assert_eq!(CipherId::try_from(0x01).unwrap(), CipherId::Aes256CbcHmacSha256);
        assert!(CipherId::try_from(0x02).unwrap_err().is_corruption());
    }
}
