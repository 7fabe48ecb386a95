//! Version 2 object header parsing.
//!
//! A v2 header is `OHDR`, version, flags, optional timestamps and
//! attribute phase-change values, the chunk #0 size, the messages, and a
//! lookup3 checksum. Headers that spill into continuation chunks are not
//! part of the supported subset.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, read_u16, read_u32, read_uint};
use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;

pub(crate) const OHDR_SIGNATURE: [u8; 4] = *b"OHDR";

const FLAG_SIZE_MASK: u8 = 0x03;
const FLAG_CREATION_ORDER_TRACKED: u8 = 0x04;
const FLAG_PHASE_CHANGE_STORED: u8 = 0x10;
const FLAG_TIMES_STORED: u8 = 0x20;

/// Message flag bit: the reader must understand the message type.
const MSG_FLAG_MUST_UNDERSTAND: u8 = 0x08;

/// Longest prefix needed to learn a v2 header's full size.
pub const MAX_PREFIX_LEN: usize = 4 + 1 + 1 + 16 + 4 + 8;

/// One raw message inside an object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    pub msg_type: MessageType,
    pub flags: u8,
    pub data: Vec<u8>,
}

/// A decoded v2 object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHeader {
    pub flags: u8,
    pub messages: Vec<HeaderMessage>,
}

struct Prefix {
    flags: u8,
    messages_start: usize,
    chunk_size: usize,
}

fn parse_prefix(data: &[u8]) -> Result<Prefix, FormatError> {
    ensure_len(data, 0, 6)?;
    if data[..4] != OHDR_SIGNATURE {
        return Err(FormatError::InvalidObjectHeaderSignature);
    }
    if data[4] != 2 {
        return Err(FormatError::InvalidObjectHeaderVersion(data[4]));
    }
    let flags = data[5];
    let mut pos = 6;
    if flags & FLAG_TIMES_STORED != 0 {
        pos += 16;
    }
    if flags & FLAG_PHASE_CHANGE_STORED != 0 {
        pos += 4;
    }
    let width = 1u8 << (flags & FLAG_SIZE_MASK);
    let chunk_size = read_uint(data, pos, width)? as usize;
    pos += width as usize;
    Ok(Prefix {
        flags,
        messages_start: pos,
        chunk_size,
    })
}

impl ObjectHeader {
    /// Total encoded size of the header at the start of `prefix`.
    ///
    /// `prefix` needs at most [`MAX_PREFIX_LEN`] bytes, which lets callers
    /// read a header through positioned I/O without knowing its size.
    pub fn peek_size(prefix: &[u8]) -> Result<usize, FormatError> {
        let p = parse_prefix(prefix)?;
        p.messages_start
            .checked_add(p.chunk_size)
            .and_then(|n| n.checked_add(4))
            .ok_or(FormatError::UnexpectedEof {
                expected: usize::MAX,
                available: prefix.len(),
            })
    }

    /// Parse the header that starts at `offset` in `data`.
    pub fn parse(data: &[u8], offset: usize) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 0)?;
        let d = &data[offset..];
        let prefix = parse_prefix(d)?;
        let chunk_end = prefix.messages_start + prefix.chunk_size;
        ensure_len(d, chunk_end, 4)?;

        let stored = read_u32(d, chunk_end)?;
        let computed = jenkins_lookup3(&d[..chunk_end]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        let header_len = if prefix.flags & FLAG_CREATION_ORDER_TRACKED != 0 {
            6
        } else {
            4
        };

        let mut messages = Vec::new();
        let mut pos = prefix.messages_start;
        // Trailing bytes shorter than a message header are a gap.
        while pos + header_len <= chunk_end {
            let raw_type = d[pos] as u16;
            let size = read_u16(d, pos + 1)? as usize;
            let msg_flags = d[pos + 3];
            pos += header_len;
            if pos + size > chunk_end {
                return Err(FormatError::UnexpectedEof {
                    expected: offset + pos + size,
                    available: offset + chunk_end,
                });
            }
            let msg_type = MessageType::from_u16(raw_type);
            match msg_type {
                MessageType::ObjectHeaderContinuation => {
                    return Err(FormatError::UnsupportedFeature(
                        "object header continuation chunks",
                    ));
                }
                MessageType::Unknown(_) if msg_flags & MSG_FLAG_MUST_UNDERSTAND != 0 => {
                    return Err(FormatError::UnsupportedFeature(
                        "must-understand header message",
                    ));
                }
                MessageType::Nil => {}
                _ => messages.push(HeaderMessage {
                    msg_type,
                    flags: msg_flags,
                    data: d[pos..pos + size].to_vec(),
                }),
            }
            pos += size;
        }

        Ok(ObjectHeader {
            flags: prefix.flags,
            messages,
        })
    }

    /// First message of the given type.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// All messages of the given type, in header order.
    pub fn find_all(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }
}
