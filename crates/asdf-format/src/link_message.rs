//! Link message (type 0x06): one named edge from a group to an object.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use crate::bytes::{ensure_len, push_address, read_u16, read_uint};
use crate::error::FormatError;

const FLAG_CREATION_ORDER: u8 = 0x04;
const FLAG_LINK_TYPE: u8 = 0x08;
const FLAG_CHARSET: u8 = 0x10;

const LINK_TYPE_HARD: u8 = 0;
const LINK_TYPE_SOFT: u8 = 1;
const LINK_TYPE_EXTERNAL: u8 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Object header address in this file.
    Hard(u64),
    /// Path resolved relative to the link's group.
    Soft(String),
    External { file: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    pub name: String,
    pub target: LinkTarget,
}

fn utf8(bytes: &[u8]) -> Result<String, FormatError> {
    core::str::from_utf8(bytes)
        .map(Into::into)
        .map_err(|_| FormatError::InvalidUtf8)
}

impl LinkMessage {
    pub fn hard(name: &str, address: u64) -> Self {
        LinkMessage {
            name: name.into(),
            target: LinkTarget::Hard(address),
        }
    }

    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 1 {
            return Err(FormatError::InvalidLinkVersion(data[0]));
        }
        let flags = data[1];
        let mut pos = 2;

        let link_type = if flags & FLAG_LINK_TYPE != 0 {
            ensure_len(data, pos, 1)?;
            pos += 1;
            data[pos - 1]
        } else {
            LINK_TYPE_HARD
        };
        if flags & FLAG_CREATION_ORDER != 0 {
            pos += 8;
        }
        if flags & FLAG_CHARSET != 0 {
            pos += 1;
        }

        let len_width = 1u8 << (flags & 0x03);
        let name_len = read_uint(data, pos, len_width)? as usize;
        pos += len_width as usize;
        ensure_len(data, pos, name_len)?;
        let name = utf8(&data[pos..pos + name_len])?;
        pos += name_len;

        let target = match link_type {
            LINK_TYPE_HARD => LinkTarget::Hard(read_uint(data, pos, offset_size)?),
            LINK_TYPE_SOFT => {
                let len = read_u16(data, pos)? as usize;
                ensure_len(data, pos + 2, len)?;
                LinkTarget::Soft(utf8(&data[pos + 2..pos + 2 + len])?)
            }
            LINK_TYPE_EXTERNAL => {
                let len = read_u16(data, pos)? as usize;
                ensure_len(data, pos + 2, len)?;
                // skip the external link flags byte
                let body = data.get(pos + 3..pos + 2 + len).unwrap_or(&[]);
                let mut parts = body.split(|&b| b == 0);
                let file = utf8(parts.next().unwrap_or(&[]))?;
                let path = utf8(parts.next().unwrap_or(&[]))?;
                LinkTarget::External { file, path }
            }
            _ => return Err(FormatError::UnsupportedFeature("user-defined link type")),
        };

        Ok(LinkMessage { name, target })
    }

    /// Encode a hard link. Soft and external links are only ever read.
    pub fn serialize(&self, offset_size: u8) -> Result<Vec<u8>, FormatError> {
        let address = match self.target {
            LinkTarget::Hard(address) => address,
            _ => return Err(FormatError::UnsupportedFeature("writing soft or external links")),
        };
        let name = self.name.as_bytes();
        let (width_bits, width) = match name.len() {
            0..=0xFF => (0u8, 1usize),
            0x100..=0xFFFF => (1, 2),
            _ => (2, 4),
        };
        let mut flags = width_bits;
        if !self.name.is_ascii() {
            flags |= FLAG_CHARSET;
        }

        let mut buf = vec![1, flags];
        if flags & FLAG_CHARSET != 0 {
            buf.push(1);
        }
        buf.extend_from_slice(&(name.len() as u64).to_le_bytes()[..width]);
        buf.extend_from_slice(name);
        push_address(&mut buf, Some(address), offset_size);
        if buf.len() > u16::MAX as usize {
            return Err(FormatError::MessageTooLarge { size: buf.len() });
        }
        Ok(buf)
    }
}
