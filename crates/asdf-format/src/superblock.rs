//! HDF5 superblock, versions 2 and 3.
//!
//! Layout: signature(8), version(1), offset size(1), length size(1),
//! consistency flags(1), then base, extension, end-of-file and root object
//! header addresses, closed by a lookup3 checksum.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, push_address, push_uint, read_address, read_u32, read_uint};
use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::{LENGTH_SIZE, OFFSET_SIZE};

/// The 8-byte HDF5 format signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Locate the format signature.
///
/// HDF5 allows a user block before the superblock, so the signature may sit
/// at offset 0 or at any power of two from 512 upward.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    if data.len() >= 8 && data[..8] == HDF5_SIGNATURE {
        return Ok(0);
    }
    let mut offset = 512usize;
    while offset.saturating_add(8) <= data.len() {
        if data[offset..offset + 8] == HDF5_SIGNATURE {
            return Ok(offset);
        }
        offset = offset.saturating_mul(2);
    }
    Err(FormatError::SignatureNotFound)
}

/// Parsed version 2 or 3 superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub version: u8,
    /// Size of addresses in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (2, 4, or 8).
    pub length_size: u8,
    pub consistency_flags: u8,
    /// Absolute file position that all other addresses are relative to.
    pub base_address: u64,
    pub extension_address: Option<u64>,
    /// End of allocated space, relative to the base address.
    pub eof_address: u64,
    pub root_group_address: u64,
}

impl Superblock {
    /// Version 3 superblock with 8-byte offsets and lengths.
    pub fn new(eof_address: u64, root_group_address: u64) -> Self {
        Superblock {
            version: 3,
            offset_size: OFFSET_SIZE,
            length_size: LENGTH_SIZE,
            consistency_flags: 0,
            base_address: 0,
            extension_address: None,
            eof_address,
            root_group_address,
        }
    }

    /// Encoded size of a superblock with the given offset width.
    pub fn encoded_size(offset_size: u8) -> usize {
        12 + 4 * offset_size as usize + 4
    }

    /// Parse the superblock whose signature starts at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        ensure_len(data, signature_offset, 12)?;
        let d = &data[signature_offset..];
        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }
        let version = d[8];
        if !matches!(version, 2 | 3) {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let offset_size = d[9];
        let length_size = d[10];
        if !matches!(offset_size, 2 | 4 | 8) {
            return Err(FormatError::InvalidOffsetSize(offset_size));
        }
        if !matches!(length_size, 2 | 4 | 8) {
            return Err(FormatError::InvalidLengthSize(length_size));
        }
        let consistency_flags = d[11];

        let os = offset_size as usize;
        let body = Self::encoded_size(offset_size) - 4;
        ensure_len(d, 0, body + 4)?;

        let stored = read_u32(d, body)?;
        let computed = jenkins_lookup3(&d[..body]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        let mut pos = 12;
        let base_address = read_uint(d, pos, offset_size)?;
        pos += os;
        let extension_address = read_address(d, pos, offset_size)?;
        pos += os;
        let eof_address = read_uint(d, pos, offset_size)?;
        pos += os;
        let root_group_address = read_uint(d, pos, offset_size)?;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            consistency_flags,
            base_address,
            extension_address,
            eof_address,
            root_group_address,
        })
    }

    /// Encode the superblock including its trailing checksum.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::encoded_size(self.offset_size));
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(self.version);
        buf.push(self.offset_size);
        buf.push(self.length_size);
        buf.push(self.consistency_flags);
        push_uint(&mut buf, self.base_address, self.offset_size);
        push_address(&mut buf, self.extension_address, self.offset_size);
        push_uint(&mut buf, self.eof_address, self.offset_size);
        push_uint(&mut buf, self.root_group_address, self.offset_size);
        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}
