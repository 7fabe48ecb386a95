//! Datatype message (type 0x03) for fixed-point, floating-point and
//! fixed-length string classes.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::bytes::{ensure_len, push_u16, push_u32, read_u16, read_u32};
use crate::error::FormatError;

const CLASS_FIXED_POINT: u8 = 0;
const CLASS_FLOATING_POINT: u8 = 1;
const CLASS_STRING: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringPadding {
    NullTerminate,
    NullPad,
    SpacePad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Ascii,
    Utf8,
}

/// A decoded datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    FixedPoint {
        size: u32,
        byte_order: ByteOrder,
        signed: bool,
        bit_offset: u16,
        bit_precision: u16,
    },
    FloatingPoint {
        size: u32,
        byte_order: ByteOrder,
        bit_offset: u16,
        bit_precision: u16,
        exponent_location: u8,
        exponent_size: u8,
        mantissa_location: u8,
        mantissa_size: u8,
        exponent_bias: u32,
    },
    /// Fixed-length string; `size` includes any terminator.
    String {
        size: u32,
        padding: StringPadding,
        charset: CharacterSet,
    },
}

impl Datatype {
    /// IEEE 754 single precision, little-endian.
    pub fn f32_le() -> Self {
        Datatype::FloatingPoint {
            size: 4,
            byte_order: ByteOrder::LittleEndian,
            bit_offset: 0,
            bit_precision: 32,
            exponent_location: 23,
            exponent_size: 8,
            mantissa_location: 0,
            mantissa_size: 23,
            exponent_bias: 127,
        }
    }

    /// Signed 8-bit integer.
    pub fn i8() -> Self {
        Datatype::FixedPoint {
            size: 1,
            byte_order: ByteOrder::LittleEndian,
            signed: true,
            bit_offset: 0,
            bit_precision: 8,
        }
    }

    /// NUL-terminated string type sized for `text` plus its terminator.
    pub fn fixed_string_for(text: &str) -> Self {
        Datatype::String {
            size: text.len() as u32 + 1,
            padding: StringPadding::NullTerminate,
            charset: if text.is_ascii() {
                CharacterSet::Ascii
            } else {
                CharacterSet::Utf8
            },
        }
    }

    /// Size in bytes of one element.
    pub fn type_size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. }
            | Datatype::FloatingPoint { size, .. }
            | Datatype::String { size, .. } => *size,
        }
    }

    pub fn is_f32_le(&self) -> bool {
        matches!(
            self,
            Datatype::FloatingPoint {
                size: 4,
                byte_order: ByteOrder::LittleEndian,
                ..
            }
        )
    }

    /// One-byte integer, the element type of text blobs.
    pub fn is_byte(&self) -> bool {
        matches!(self, Datatype::FixedPoint { size: 1, .. })
    }

    /// Short human-readable name, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Datatype::FixedPoint { size: 1, signed: true, .. } => "i8",
            Datatype::FixedPoint { size: 1, .. } => "u8",
            Datatype::FixedPoint { .. } => "integer",
            Datatype::FloatingPoint { size: 4, .. } => "f32",
            Datatype::FloatingPoint { size: 8, .. } => "f64",
            Datatype::FloatingPoint { .. } => "float",
            Datatype::String { .. } => "string",
        }
    }

    /// Parse a datatype message body. Returns the type and bytes consumed.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        ensure_len(data, 0, 8)?;
        let class = data[0] & 0x0F;
        let version = data[0] >> 4;
        if !(1..=4).contains(&version) {
            return Err(FormatError::InvalidDatatypeVersion(version));
        }
        let bf0 = data[1];
        let size = read_u32(data, 4)?;

        match class {
            CLASS_FIXED_POINT => {
                ensure_len(data, 8, 4)?;
                let dt = Datatype::FixedPoint {
                    size,
                    byte_order: if bf0 & 0x01 == 0 {
                        ByteOrder::LittleEndian
                    } else {
                        ByteOrder::BigEndian
                    },
                    signed: bf0 & 0x08 != 0,
                    bit_offset: read_u16(data, 8)?,
                    bit_precision: read_u16(data, 10)?,
                };
                Ok((dt, 12))
            }
            CLASS_FLOATING_POINT => {
                ensure_len(data, 8, 12)?;
                let byte_order = match (bf0 & 0x01, bf0 & 0x40) {
                    (0, 0) => ByteOrder::LittleEndian,
                    (1, 0) => ByteOrder::BigEndian,
                    _ => return Err(FormatError::UnsupportedFeature("VAX float byte order")),
                };
                let dt = Datatype::FloatingPoint {
                    size,
                    byte_order,
                    bit_offset: read_u16(data, 8)?,
                    bit_precision: read_u16(data, 10)?,
                    exponent_location: data[12],
                    exponent_size: data[13],
                    mantissa_location: data[14],
                    mantissa_size: data[15],
                    exponent_bias: read_u32(data, 16)?,
                };
                Ok((dt, 20))
            }
            CLASS_STRING => {
                let padding = match bf0 & 0x0F {
                    0 => StringPadding::NullTerminate,
                    1 => StringPadding::NullPad,
                    2 => StringPadding::SpacePad,
                    p => return Err(FormatError::InvalidStringPadding(p)),
                };
                let charset = match bf0 >> 4 {
                    0 => CharacterSet::Ascii,
                    1 => CharacterSet::Utf8,
                    c => return Err(FormatError::InvalidCharacterSet(c)),
                };
                Ok((
                    Datatype::String {
                        size,
                        padding,
                        charset,
                    },
                    8,
                ))
            }
            c => Err(FormatError::UnsupportedDatatypeClass(c)),
        }
    }

    /// Encode as a version 1 datatype message body.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20);
        match self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
                bit_offset,
                bit_precision,
            } => {
                let mut bf0 = 0u8;
                if *byte_order == ByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                if *signed {
                    bf0 |= 0x08;
                }
                buf.extend_from_slice(&[0x10 | CLASS_FIXED_POINT, bf0, 0, 0]);
                push_u32(&mut buf, *size);
                push_u16(&mut buf, *bit_offset);
                push_u16(&mut buf, *bit_precision);
            }
            Datatype::FloatingPoint {
                size,
                byte_order,
                bit_offset,
                bit_precision,
                exponent_location,
                exponent_size,
                mantissa_location,
                mantissa_size,
                exponent_bias,
            } => {
                // implied leading mantissa bit
                let mut bf0 = 0x20u8;
                if *byte_order == ByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                let sign_location = (*size * 8).saturating_sub(1) as u8;
                buf.extend_from_slice(&[0x10 | CLASS_FLOATING_POINT, bf0, sign_location, 0]);
                push_u32(&mut buf, *size);
                push_u16(&mut buf, *bit_offset);
                push_u16(&mut buf, *bit_precision);
                buf.extend_from_slice(&[
                    *exponent_location,
                    *exponent_size,
                    *mantissa_location,
                    *mantissa_size,
                ]);
                push_u32(&mut buf, *exponent_bias);
            }
            Datatype::String {
                size,
                padding,
                charset,
            } => {
                let pad = match padding {
                    StringPadding::NullTerminate => 0u8,
                    StringPadding::NullPad => 1,
                    StringPadding::SpacePad => 2,
                };
                let cset = match charset {
                    CharacterSet::Ascii => 0u8,
                    CharacterSet::Utf8 => 1,
                };
                buf.extend_from_slice(&[0x10 | CLASS_STRING, pad | (cset << 4), 0, 0]);
                push_u32(&mut buf, *size);
            }
        }
        buf
    }
}
