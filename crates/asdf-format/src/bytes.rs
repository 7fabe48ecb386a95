//! Little-endian field helpers shared by the message codecs.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

pub(crate) fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    match offset.checked_add(needed) {
        Some(end) if end <= data.len() => Ok(()),
        _ => Err(FormatError::UnexpectedEof {
            expected: offset.saturating_add(needed),
            available: data.len(),
        }),
    }
}

/// Reads an unsigned integer of 1, 2, 4 or 8 bytes.
pub(crate) fn read_uint(data: &[u8], offset: usize, size: u8) -> Result<u64, FormatError> {
    let s = size as usize;
    ensure_len(data, offset, s)?;
    let slice = &data[offset..offset + s];
    Ok(match size {
        1 => slice[0] as u64,
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

/// Reads an address, mapping the all-ones pattern to `None`.
pub(crate) fn read_address(data: &[u8], offset: usize, size: u8) -> Result<Option<u64>, FormatError> {
    let raw = read_uint(data, offset, size)?;
    let undefined = match size {
        8 => u64::MAX,
        _ => (1u64 << (size as u32 * 8)) - 1,
    };
    Ok(if raw == undefined { None } else { Some(raw) })
}

pub(crate) fn push_uint(buf: &mut Vec<u8>, value: u64, size: u8) {
    let le = value.to_le_bytes();
    buf.extend_from_slice(&le[..size as usize]);
}

pub(crate) fn push_address(buf: &mut Vec<u8>, address: Option<u64>, size: u8) {
    match address {
        Some(a) => push_uint(buf, a, size),
        None => buf.extend(core::iter::repeat(0xFF).take(size as usize)),
    }
}

pub(crate) fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Result<u16, FormatError> {
    ensure_len(data, offset, 2)?;
    Ok(LittleEndian::read_u16(&data[offset..offset + 2]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32, FormatError> {
    ensure_len(data, offset, 4)?;
    Ok(LittleEndian::read_u32(&data[offset..offset + 4]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(read_uint(&data, 0, 1).unwrap(), 0x01);
        assert_eq!(read_uint(&data, 0, 2).unwrap(), 0x0201);
        assert_eq!(read_uint(&data, 0, 4).unwrap(), 0x0403_0201);
        assert_eq!(read_uint(&data, 0, 8).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_uint(&data, 0, 3), Err(FormatError::InvalidOffsetSize(3)));
    }

    #[test]
    fn undefined_address_is_none() {
        assert_eq!(read_address(&[0xFF; 8], 0, 8).unwrap(), None);
        assert_eq!(read_address(&[0xFF; 4], 0, 4).unwrap(), None);
        assert_eq!(read_address(&[0x10, 0, 0, 0], 0, 4).unwrap(), Some(16));
    }

    #[test]
    fn short_buffer_reports_eof() {
        let err = read_uint(&[1, 2], 1, 4).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnexpectedEof {
                expected: 5,
                available: 2
            }
        );
    }

    #[test]
    fn push_address_roundtrip() {
        let mut buf = Vec::new();
        push_address(&mut buf, Some(0x1234), 8);
        push_address(&mut buf, None, 8);
        assert_eq!(read_address(&buf, 0, 8).unwrap(), Some(0x1234));
        assert_eq!(read_address(&buf, 8, 8).unwrap(), None);
    }
}
