//! Version 2 object header writer.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::object_header::OHDR_SIGNATURE;

/// Message flag bit: the message content never changes.
pub const MSG_FLAG_CONSTANT: u8 = 0x01;

/// Collects messages and encodes them as one v2 object header chunk.
#[derive(Debug, Default, Clone)]
pub struct ObjectHeaderWriter {
    messages: Vec<(MessageType, Vec<u8>, u8)>,
}

impl ObjectHeaderWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message with flags 0.
    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) {
        self.messages.push((msg_type, data, 0));
    }

    pub fn add_message_with_flags(&mut self, msg_type: MessageType, data: Vec<u8>, flags: u8) {
        self.messages.push((msg_type, data, flags));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Encode the header: `OHDR`, version 2, flags, chunk size, messages
    /// and checksum. The chunk size field is as narrow as the payload allows.
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        let mut payload = 0usize;
        for (_, data, _) in &self.messages {
            if data.len() > u16::MAX as usize {
                return Err(FormatError::MessageTooLarge { size: data.len() });
            }
            payload += 4 + data.len();
        }

        let (flags, width) = match payload {
            0..=0xFF => (0x00u8, 1usize),
            0x100..=0xFFFF => (0x01, 2),
            _ if payload <= u32::MAX as usize => (0x02, 4),
            _ => (0x03, 8),
        };

        let mut buf = Vec::with_capacity(6 + width + payload + 4);
        buf.extend_from_slice(&OHDR_SIGNATURE);
        buf.push(2);
        buf.push(flags);
        buf.extend_from_slice(&(payload as u64).to_le_bytes()[..width]);

        for (msg_type, data, msg_flags) in &self.messages {
            buf.push(msg_type.to_u16() as u8);
            buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
            buf.push(*msg_flags);
            buf.extend_from_slice(data);
        }

        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }
}
