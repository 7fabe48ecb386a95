//! Data layout message (type 0x08), compact and contiguous classes.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::bytes::{ensure_len, push_address, push_uint, read_address, read_u16, read_uint};
use crate::error::FormatError;

const CLASS_COMPACT: u8 = 0;
const CLASS_CONTIGUOUS: u8 = 1;

/// Where a dataset's raw elements live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Raw data stored inside the object header.
    Compact { data: Vec<u8> },
    /// One contiguous run in the file. `address` is `None` until storage
    /// is allocated, which is always the case for zero-size datasets.
    Contiguous { address: Option<u64>, size: u64 },
}

impl DataLayout {
    /// Parse a version 3 or 4 layout message body.
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }
        match data[1] {
            CLASS_COMPACT => {
                let size = read_u16(data, 2)? as usize;
                ensure_len(data, 4, size)?;
                Ok(DataLayout::Compact {
                    data: data[4..4 + size].to_vec(),
                })
            }
            CLASS_CONTIGUOUS => {
                let address = read_address(data, 2, offset_size)?;
                let size = read_uint(data, 2 + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous { address, size })
            }
            class => Err(FormatError::UnsupportedLayoutClass(class)),
        }
    }

    /// Encode as a version 3 message body.
    pub fn serialize(&self, offset_size: u8, length_size: u8) -> Result<Vec<u8>, FormatError> {
        let mut buf = vec![3];
        match self {
            DataLayout::Compact { data } => {
                if data.len() > u16::MAX as usize {
                    return Err(FormatError::MessageTooLarge { size: data.len() });
                }
                buf.push(CLASS_COMPACT);
                buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
                buf.extend_from_slice(data);
            }
            DataLayout::Contiguous { address, size } => {
                buf.push(CLASS_CONTIGUOUS);
                push_address(&mut buf, *address, offset_size);
                push_uint(&mut buf, *size, length_size);
            }
        }
        Ok(buf)
    }
}
