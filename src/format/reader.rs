//! Little-endian primitives for header parsing.

use std::io::{self, Read};

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Reads an unsigned 16-bit little-endian integer.
pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads an unsigned 64-bit little-endian integer.
pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Reads a fixed-size array.
pub fn read_array<R: Read, const N: usize>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads exact number of bytes into a new vector.
pub fn read_bytes<R: Read>(r: &mut R, count: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_le_integers() {
        let mut r = Cursor::new([
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f,
        ]);
        assert_eq!(read_u8(&mut r).unwrap(), 0x01);
        assert_eq!(read_u16_le(&mut r).unwrap(), 0x0302);
        assert_eq!(read_u32_le(&mut r).unwrap(), 0x0706_0504);
        assert_eq!(read_u64_le(&mut r).unwrap(), 0x0f0e_0d0c_0b0a_0908);
    }

    #[test]
    fn test_short_input_is_eof() {
        let mut r = Cursor::new([0u8; 3]);
        let err = read_u32_le(&mut r).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_read_array_and_bytes() {
        let mut r = Cursor::new(b"abcdef".to_vec());
        let head: [u8; 2] = read_array(&mut r).unwrap();
        assert_eq!(&head, b"ab");
        assert_eq!(read_bytes(&mut r, 4).unwrap(), b"cdef");
    }
}
