//! Copy codec (no compression).

use std::io::{self, Read, Write};

use super::{Decoder, Encoder, MethodId};
use crate::Result;
use crate::format::CodecParams;

/// A decoder that passes at most `size` bytes through unchanged.
pub struct CopyDecoder<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read + Send> CopyDecoder<R> {
    /// Creates a new copy decoder limited to `size` bytes.
    pub fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
        }
    }
}

impl<R: Read + Send> Read for CopyDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(buf.len());
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl<R: Read + Send> Decoder for CopyDecoder<R> {
    fn method(&self) -> MethodId {
        MethodId::Copy
    }
}

/// An encoder that appends its input unchanged.
pub struct CopyEncoder<'a> {
    output: &'a mut Vec<u8>,
}

impl<'a> CopyEncoder<'a> {
    /// Creates an encoder appending to `output`.
    pub fn new(output: &'a mut Vec<u8>) -> Self {
        Self { output }
    }
}

impl Write for CopyEncoder<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Encoder for CopyEncoder<'_> {
    fn method(&self) -> MethodId {
        MethodId::Copy
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

pub(super) fn property(_: &CodecParams) -> u8 {
    0
}

pub(super) fn new_encoder<'a>(output: &'a mut Vec<u8>, _: &CodecParams) -> Box<dyn Encoder + 'a> {
    Box::new(CopyEncoder::new(output))
}

pub(super) fn new_decoder<'a>(input: &'a [u8], _: u8) -> Result<Box<dyn Decoder + 'a>> {
    Ok(Box::new(CopyDecoder::new(input, input.len() as u64)))
}
