//! Link info (0x02) and group info (0x0A) messages of new-style groups.
//!
//! Groups written here keep every link in the object header ("compact"
//! storage), so the fractal heap and name index addresses stay undefined.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, push_address, read_address, read_u16, read_uint};
use crate::error::FormatError;

const FLAG_ORDER_TRACKED: u8 = 0x01;
const FLAG_ORDER_INDEXED: u8 = 0x02;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfoMessage {
    pub max_creation_order: Option<u64>,
    /// Fractal heap of densely stored links.
    pub fractal_heap_address: Option<u64>,
    pub name_index_address: Option<u64>,
    pub creation_order_index_address: Option<u64>,
}

impl LinkInfoMessage {
    /// Link info for a group whose links are all stored in its header.
    pub fn compact() -> Self {
        Self::default()
    }

    /// Whether links live outside the object header.
    pub fn is_dense(&self) -> bool {
        self.fractal_heap_address.is_some()
    }

    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkInfoMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::InvalidLinkInfoVersion(data[0]));
        }
        let flags = data[1];
        let os = offset_size as usize;
        let mut pos = 2;
        let max_creation_order = if flags & FLAG_ORDER_TRACKED != 0 {
            let v = read_uint(data, pos, 8)?;
            pos += 8;
            Some(v)
        } else {
            None
        };
        let fractal_heap_address = read_address(data, pos, offset_size)?;
        pos += os;
        let name_index_address = read_address(data, pos, offset_size)?;
        pos += os;
        let creation_order_index_address = if flags & FLAG_ORDER_INDEXED != 0 {
            read_address(data, pos, offset_size)?
        } else {
            None
        };
        Ok(LinkInfoMessage {
            max_creation_order,
            fractal_heap_address,
            name_index_address,
            creation_order_index_address,
        })
    }

    pub fn serialize(&self, offset_size: u8) -> Vec<u8> {
        let mut flags = 0u8;
        if self.max_creation_order.is_some() {
            flags |= FLAG_ORDER_TRACKED;
        }
        if self.creation_order_index_address.is_some() {
            flags |= FLAG_ORDER_INDEXED;
        }
        let mut buf = Vec::with_capacity(2 + 8 + 3 * offset_size as usize);
        buf.push(0);
        buf.push(flags);
        if let Some(max) = self.max_creation_order {
            buf.extend_from_slice(&max.to_le_bytes());
        }
        push_address(&mut buf, self.fractal_heap_address, offset_size);
        push_address(&mut buf, self.name_index_address, offset_size);
        if self.creation_order_index_address.is_some() {
            push_address(&mut buf, self.creation_order_index_address, offset_size);
        }
        buf
    }
}

/// Group info message. Defaults mean "library defaults" for storage
/// thresholds and size estimates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupInfoMessage {
    pub max_compact: Option<u16>,
    pub min_dense: Option<u16>,
    pub estimated_entries: Option<u16>,
    pub estimated_name_len: Option<u16>,
}

impl GroupInfoMessage {
    pub fn parse(data: &[u8]) -> Result<GroupInfoMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        if data[0] != 0 {
            return Err(FormatError::InvalidGroupInfoVersion(data[0]));
        }
        let flags = data[1];
        let mut msg = GroupInfoMessage::default();
        let mut pos = 2;
        if flags & 0x01 != 0 {
            msg.max_compact = Some(read_u16(data, pos)?);
            msg.min_dense = Some(read_u16(data, pos + 2)?);
            pos += 4;
        }
        if flags & 0x02 != 0 {
            msg.estimated_entries = Some(read_u16(data, pos)?);
            msg.estimated_name_len = Some(read_u16(data, pos + 2)?);
        }
        Ok(msg)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut flags = 0u8;
        let mut body = Vec::new();
        if let (Some(max), Some(min)) = (self.max_compact, self.min_dense) {
            flags |= 0x01;
            body.extend_from_slice(&max.to_le_bytes());
            body.extend_from_slice(&min.to_le_bytes());
        }
        if let (Some(n), Some(len)) = (self.estimated_entries, self.estimated_name_len) {
            flags |= 0x02;
            body.extend_from_slice(&n.to_le_bytes());
            body.extend_from_slice(&len.to_le_bytes());
        }
        let mut buf = Vec::with_capacity(2 + body.len());
        buf.push(0);
        buf.push(flags);
        buf.extend_from_slice(&body);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_link_info() {
        let bytes = LinkInfoMessage::compact().serialize(8);
        assert_eq!(bytes.len(), 18);
        assert_eq!(&bytes[..2], &[0, 0]);
        let parsed = LinkInfoMessage::parse(&bytes, 8).unwrap();
        assert!(!parsed.is_dense());
        assert_eq!(parsed, LinkInfoMessage::compact());
    }

    #[test]
    fn dense_link_info_detected() {
        let msg = LinkInfoMessage {
            max_creation_order: Some(12),
            fractal_heap_address: Some(0x400),
            name_index_address: Some(0x600),
            creation_order_index_address: Some(0x700),
        };
        let parsed = LinkInfoMessage::parse(&msg.serialize(8), 8).unwrap();
        assert!(parsed.is_dense());
        assert_eq!(parsed, msg);
    }

    #[test]
    fn default_group_info() {
        assert_eq!(GroupInfoMessage::default().serialize(), vec![0, 0]);
        let msg = GroupInfoMessage {
            max_compact: Some(8),
            min_dense: Some(6),
            estimated_entries: None,
            estimated_name_len: None,
        };
        assert_eq!(GroupInfoMessage::parse(&msg.serialize()).unwrap(), msg);
    }
}
