//! LZMA2 codec backed by `lzma_rust2`.

use std::io::{self, Read, Write};

use super::{Decoder, Encoder, MethodId};
use crate::format::CodecParams;
use crate::{Error, Result};

/// Largest dictionary a container may ask the decoder to allocate.
pub const MAX_DICT_SIZE: u32 = 64 * 1024 * 1024;

/// LZMA2 decoder.
pub struct Lzma2Decoder<R> {
    inner: lzma_rust2::Lzma2Reader<R>,
}

impl<R> std::fmt::Debug for Lzma2Decoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lzma2Decoder").finish_non_exhaustive()
    }
}

impl<R: Read + Send> Lzma2Decoder<R> {
    /// Creates a decoder for a stream whose dictionary size is encoded in
    /// `property`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptArchive`] for an invalid property byte and
    /// [`Error::ResourceLimitExceeded`] for dictionaries above
    /// [`MAX_DICT_SIZE`].
    pub fn new(input: R, property: u8) -> Result<Self> {
        let dict_size = decode_lzma2_dict_size(property)?;
        if dict_size > MAX_DICT_SIZE {
            return Err(Error::ResourceLimitExceeded(format!(
                "LZMA2 dictionary of {} bytes exceeds {} bytes",
                dict_size, MAX_DICT_SIZE
            )));
        }
        Ok(Self {
            inner: lzma_rust2::Lzma2Reader::new(input, dict_size, None),
        })
    }
}

impl<R: Read + Send> Read for Lzma2Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> Decoder for Lzma2Decoder<R> {
    fn method(&self) -> MethodId {
        MethodId::Lzma2
    }
}

/// Decodes the LZMA2 dictionary-size property byte.
///
/// Property `p` stands for `2^(p/2 + 12)` when even and `3 * 2^(p/2 + 11)`
/// when odd; 40 means `u32::MAX`.
pub fn decode_lzma2_dict_size(prop: u8) -> Result<u32> {
    match prop {
        40 => Ok(u32::MAX),
        p if p > 40 => Err(Error::corrupt(format!(
            "invalid LZMA2 dictionary property {}",
            p
        ))),
        p => {
            let shift = u32::from(p) / 2 + 11;
            Ok((2 | (u32::from(p) & 1)) << shift)
        }
    }
}

/// Encodes a dictionary size, rounding up to the next representable size.
pub fn encode_lzma2_dict_size(dict_size: u32) -> u8 {
    (0..40u8)
        .find(|&p| decode_lzma2_dict_size(p).is_ok_and(|size| size >= dict_size))
        .unwrap_or(40)
}

/// LZMA2 encoder appending to an in-memory buffer.
pub struct Lzma2Encoder<'a> {
    inner: lzma_rust2::Lzma2Writer<&'a mut Vec<u8>>,
}

impl std::fmt::Debug for Lzma2Encoder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lzma2Encoder").finish_non_exhaustive()
    }
}

impl<'a> Lzma2Encoder<'a> {
    /// Creates an encoder using the level and dictionary size in `params`.
    pub fn new(output: &'a mut Vec<u8>, params: &CodecParams) -> Self {
        let mut opts = lzma_rust2::Lzma2Options::with_preset(params.level.min(9));
        opts.lzma_options.dict_size = params.dict_size;
        Self {
            inner: lzma_rust2::Lzma2Writer::new(output, opts),
        }
    }
}

impl Write for Lzma2Encoder<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Encoder for Lzma2Encoder<'_> {
    fn method(&self) -> MethodId {
        MethodId::Lzma2
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        self.inner
            .finish()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(())
    }
}

pub(super) fn property(params: &CodecParams) -> u8 {
    encode_lzma2_dict_size(params.dict_size)
}

pub(super) fn new_encoder<'a>(
    output: &'a mut Vec<u8>,
    params: &CodecParams,
) -> Box<dyn Encoder + 'a> {
    Box::new(Lzma2Encoder::new(output, params))
}

pub(super) fn new_decoder<'a>(input: &'a [u8], property: u8) -> Result<Box<dyn Decoder + 'a>> {
    Ok(Box::new(Lzma2Decoder::new(input, property)?))
}
