//! Compression codecs and the method registry.
//!
//! A container names its compression method with a single id byte plus one
//! property byte. [`REGISTRY`] maps each known id to the constructors for its
//! encoder and decoder; there is no runtime registration.
//!
//! ```rust
//! use docseal::codec::{self, MethodId};
//!
//! let entry = codec::lookup(0x21).unwrap();
//! assert_eq!(entry.method, MethodId::Lzma2);
//! assert!(codec::lookup(0x7f).is_err());
//! ```

mod copy;
mod lzma;

use std::fmt;
use std::io::{self, Read, Write};

use crate::format::CodecParams;
use crate::{Error, Result};

pub use copy::{CopyDecoder, CopyEncoder};
pub use lzma::{
    Lzma2Decoder, Lzma2Encoder, MAX_DICT_SIZE, decode_lzma2_dict_size, encode_lzma2_dict_size,
};

/// A decoder that reads compressed data and produces uncompressed output.
pub trait Decoder: Read + Send {
    /// Returns the method this decoder implements.
    fn method(&self) -> MethodId;
}

/// An encoder that takes uncompressed data and produces compressed output.
pub trait Encoder: Write + Send {
    /// Returns the method this encoder implements.
    fn method(&self) -> MethodId;

    /// Finishes encoding and flushes any remaining data.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Compression method ids as stored in the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MethodId {
    /// Stored without compression.
    Copy = 0x00,
    /// LZMA2.
    Lzma2 = 0x21,
}

impl MethodId {
    /// Returns the id byte.
    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Returns the human-readable method name.
    pub fn name(self) -> &'static str {
        match self {
            MethodId::Copy => "Copy",
            MethodId::Lzma2 => "LZMA2",
        }
    }
}

impl TryFrom<u8> for MethodId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self> {
        lookup(id).map(|entry| entry.method)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds an encoder writing into `output`.
pub type EncoderFn = for<'a> fn(&'a mut Vec<u8>, &CodecParams) -> Box<dyn Encoder + 'a>;

/// Builds a decoder reading `input`, given the stored property byte.
pub type DecoderFn = for<'a> fn(&'a [u8], u8) -> Result<Box<dyn Decoder + 'a>>;

/// One row of the codec table.
pub struct CodecEntry {
    /// Method id.
    pub method: MethodId,
    /// Property byte recorded in the header for the given parameters.
    pub property: fn(&CodecParams) -> u8,
    /// Encoder constructor.
    pub new_encoder: EncoderFn,
    /// Decoder constructor.
    pub new_decoder: DecoderFn,
}

impl fmt::Debug for CodecEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecEntry")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Every compression method this build can read and write.
pub static REGISTRY: &[CodecEntry] = &[
    CodecEntry {
        method: MethodId::Copy,
        property: copy::property,
        new_encoder: copy::new_encoder,
        new_decoder: copy::new_decoder,
    },
    CodecEntry {
        method: MethodId::Lzma2,
        property: lzma::property,
        new_encoder: lzma::new_encoder,
        new_decoder: lzma::new_decoder,
    },
];

/// Finds the registry row for a method id.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMethod`] for ids not in [`REGISTRY`].
pub fn lookup(id: u8) -> Result<&'static CodecEntry> {
    REGISTRY
        .iter()
        .find(|entry| entry.method.id() == id)
        .ok_or(Error::UnsupportedMethod { method_id: id })
}

/// Compresses `data` with the method and settings in `params`.
///
/// Returns the compressed bytes and the property byte to record.
pub fn compress(data: &[u8], params: &CodecParams) -> Result<(Vec<u8>, u8)> {
    let entry = lookup(params.method.id())?;
    let mut output = Vec::new();
    let mut encoder = (entry.new_encoder)(&mut output, params);
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok((output, (entry.property)(params)))
}

/// Decompresses a payload, requiring exactly `expected_size` output bytes.
///
/// # Errors
///
/// Invalid streams and size mismatches are reported as
/// [`Error::CorruptArchive`].
pub fn decompress(method: MethodId, property: u8, data: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let entry = lookup(method.id())?;
    let decoder = (entry.new_decoder)(data, property)?;

    // Read at most one byte past the expected size to detect overlong streams
    // without trusting the header for allocation.
    let mut output = Vec::with_capacity(expected_size.min(PREALLOC_LIMIT) as usize);
    decoder
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut output)
        .map_err(|e| Error::corrupt(format!("invalid {} stream: {}", method, e)))?;

    if output.len() as u64 != expected_size {
        return Err(Error::corrupt(format!(
            "{} stream decoded to {} bytes, expected {}",
            method,
            output.len(),
            expected_size
        )));
    }
    Ok(output)
}

/// Upper bound for buffer preallocation driven by header sizes.
const PREALLOC_LIMIT: u64 = 64 * 1024 * 1024;
