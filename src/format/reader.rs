//! Low-level binary reading utilities for header parsing.
//!
//! All multi-byte integers in PFS0 and NCZ headers are little-endian.

use std::io::{self, Read, Seek};

use crate::{Error, Result};

/// Reads a single byte.
pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
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

/// Reads a fixed-size byte array.
pub fn read_array<R: Read, const N: usize>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads one named header field, mapping a short read to
/// [`Error::CorruptHeader`] at the field's offset.
pub(crate) fn read_field<R, T>(
    r: &mut R,
    field: &str,
    read: impl FnOnce(&mut R) -> io::Result<T>,
) -> Result<T>
where
    R: Read + Seek,
{
    let offset = r.stream_position()?;
    read(r).map_err(|e| Error::from_header_io(e, offset, field))
}

/// Fills `buf` as far as the reader allows and returns the number of bytes read.
///
/// Unlike [`Read::read_exact`], hitting end of stream is not an error.
pub(crate) fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
