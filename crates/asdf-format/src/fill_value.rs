//! Fill value message (type 0x05).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::bytes::{ensure_len, read_u32};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocTime {
    Early,
    Late,
    Incremental,
}

/// Storage allocation policy and optional user fill value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillValueMessage {
    pub alloc_time: AllocTime,
    /// Fill bytes for one element. `None` means the library default (zeros).
    pub value: Option<Vec<u8>>,
}

impl FillValueMessage {
    /// Storage allocated at creation and zero-filled.
    pub fn early_zero() -> Self {
        FillValueMessage {
            alloc_time: AllocTime::Early,
            value: None,
        }
    }

    pub fn parse(data: &[u8]) -> Result<FillValueMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        let decode_alloc = |bits: u8| match bits {
            2 => AllocTime::Late,
            3 => AllocTime::Incremental,
            _ => AllocTime::Early,
        };
        let (alloc_time, defined, pos) = match version {
            1 | 2 => {
                ensure_len(data, 0, 4)?;
                (decode_alloc(data[1]), version == 1 || data[3] != 0, 4)
            }
            3 => (decode_alloc(data[1] & 0x03), data[1] & 0x20 != 0, 2),
            v => return Err(FormatError::InvalidFillValueVersion(v)),
        };
        let value = if defined && pos < data.len() {
            let size = read_u32(data, pos)? as usize;
            ensure_len(data, pos + 4, size)?;
            (size > 0).then(|| data[pos + 4..pos + 4 + size].to_vec())
        } else {
            None
        };
        Ok(FillValueMessage { alloc_time, value })
    }

    /// Encode as a version 3 message body, fill written at allocation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut flags = match self.alloc_time {
            AllocTime::Early => 1u8,
            AllocTime::Late => 2,
            AllocTime::Incremental => 3,
        };
        match &self.value {
            Some(v) => {
                flags |= 0x20;
                let mut buf = vec![3, flags];
                buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
                buf.extend_from_slice(v);
                buf
            }
            None => vec![3, flags],
        }
    }
}
