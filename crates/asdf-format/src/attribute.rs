//! Attribute message (type 0x0C).
//!
//! Versions 1 through 3 are decoded. Version 1 pads name, datatype and
//! dataspace to 8-byte boundaries; versions 2 and 3 pack them, and version 3
//! adds a name encoding byte. Attributes are written as version 2, or
//! version 3 when the name is not ASCII.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use crate::bytes::{ensure_len, push_u16, read_u16};
use crate::dataspace::Dataspace;
use crate::datatype::{Datatype, StringPadding};
use crate::error::FormatError;

const FLAG_SHARED_DATATYPE: u8 = 0x01;
const FLAG_SHARED_DATASPACE: u8 = 0x02;

/// A decoded attribute: name, type, shape and raw element bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMessage {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    pub raw_data: Vec<u8>,
}

fn pad8(x: usize) -> usize {
    (x + 7) & !7
}

impl AttributeMessage {
    /// Scalar fixed-length string attribute holding `value` and a NUL.
    pub fn string(name: &str, value: &str) -> Self {
        let mut raw_data = Vec::with_capacity(value.len() + 1);
        raw_data.extend_from_slice(value.as_bytes());
        raw_data.push(0);
        AttributeMessage {
            name: name.into(),
            datatype: Datatype::fixed_string_for(value),
            dataspace: Dataspace::scalar(),
            raw_data,
        }
    }

    pub fn parse(data: &[u8], length_size: u8) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 0, 8)?;
        let version = data[0];
        let flags = data[1];
        let name_size = read_u16(data, 2)? as usize;
        let datatype_size = read_u16(data, 4)? as usize;
        let dataspace_size = read_u16(data, 6)? as usize;

        let (mut pos, padded) = match version {
            1 => (8, true),
            2 => (8, false),
            3 => (9, false),
            v => return Err(FormatError::InvalidAttributeVersion(v)),
        };
        if version > 1 && flags & (FLAG_SHARED_DATATYPE | FLAG_SHARED_DATASPACE) != 0 {
            return Err(FormatError::UnsupportedFeature("shared attribute datatype"));
        }
        let step = |n: usize| if padded { pad8(n) } else { n };

        ensure_len(data, pos, name_size)?;
        let name = extract_name(&data[pos..pos + name_size])?;
        pos += step(name_size);

        ensure_len(data, pos, datatype_size)?;
        let (datatype, _) = Datatype::parse(&data[pos..pos + datatype_size])?;
        pos += step(datatype_size);

        ensure_len(data, pos, dataspace_size)?;
        let dataspace = Dataspace::parse(&data[pos..pos + dataspace_size], length_size)?;
        pos += step(dataspace_size);

        let raw_len = (datatype.type_size() as u64)
            .checked_mul(dataspace.num_elements())
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(FormatError::UnexpectedEof {
                expected: usize::MAX,
                available: data.len(),
            })?;
        ensure_len(data, pos, raw_len)?;
        let raw_data = data[pos..pos + raw_len].to_vec();

        Ok(AttributeMessage {
            name,
            datatype,
            dataspace,
            raw_data,
        })
    }

    /// Encode the message body.
    pub fn serialize(&self, length_size: u8) -> Result<Vec<u8>, FormatError> {
        let dt = self.datatype.serialize();
        let ds = self.dataspace.serialize(length_size);
        let name_size = self.name.len() + 1;
        let ascii = self.name.is_ascii();
        let header = if ascii { 8 } else { 9 };
        let total = header + name_size + dt.len() + ds.len() + self.raw_data.len();
        if total > u16::MAX as usize || name_size > u16::MAX as usize {
            return Err(FormatError::MessageTooLarge { size: total });
        }

        let mut buf = Vec::with_capacity(total);
        buf.push(if ascii { 2 } else { 3 });
        buf.push(0);
        push_u16(&mut buf, name_size as u16);
        push_u16(&mut buf, dt.len() as u16);
        push_u16(&mut buf, ds.len() as u16);
        if !ascii {
            // UTF-8 name encoding
            buf.push(1);
        }
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&dt);
        buf.extend_from_slice(&ds);
        buf.extend_from_slice(&self.raw_data);
        Ok(buf)
    }

    /// Decode a scalar fixed-length string value.
    pub fn read_as_string(&self) -> Result<String, FormatError> {
        let padding = match &self.datatype {
            Datatype::String { padding, .. } => *padding,
            other => return Err(FormatError::UnsupportedDatatypeClass(class_of(other))),
        };
        let bytes = match padding {
            StringPadding::NullTerminate | StringPadding::NullPad => {
                let end = self
                    .raw_data
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(self.raw_data.len());
                &self.raw_data[..end]
            }
            StringPadding::SpacePad => {
                let end = self
                    .raw_data
                    .iter()
                    .rposition(|&b| b != b' ')
                    .map_or(0, |i| i + 1);
                &self.raw_data[..end]
            }
        };
        core::str::from_utf8(bytes)
            .map(Into::into)
            .map_err(|_| FormatError::InvalidUtf8)
    }
}

fn class_of(dt: &Datatype) -> u8 {
    match dt {
        Datatype::FixedPoint { .. } => 0,
        Datatype::FloatingPoint { .. } => 1,
        Datatype::String { .. } => 3,
    }
}

fn extract_name(bytes: &[u8]) -> Result<String, FormatError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end])
        .map(Into::into)
        .map_err(|_| FormatError::InvalidUtf8)
}
