//! Error types for HDF5 format parsing and serialization.

use core::fmt;

/// Errors raised while decoding or encoding HDF5 structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The HDF5 magic signature was not found at any valid offset.
    SignatureNotFound,
    /// The superblock version is not supported.
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header signature.
    InvalidObjectHeaderSignature,
    /// Invalid object header version.
    InvalidObjectHeaderVersion(u8),
    /// Jenkins lookup3 checksum mismatch.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Datatype class this crate does not decode.
    UnsupportedDatatypeClass(u8),
    InvalidDatatypeVersion(u8),
    InvalidDataspaceVersion(u8),
    InvalidDataspaceType(u8),
    InvalidLayoutVersion(u8),
    /// Layout class other than compact or contiguous.
    UnsupportedLayoutClass(u8),
    InvalidAttributeVersion(u8),
    InvalidLinkVersion(u8),
    InvalidLinkInfoVersion(u8),
    InvalidGroupInfoVersion(u8),
    InvalidFillValueVersion(u8),
    InvalidStringPadding(u8),
    InvalidCharacterSet(u8),
    /// A structure uses an HDF5 feature outside the supported subset.
    UnsupportedFeature(&'static str),
    /// A header message exceeds the 16-bit size field.
    MessageTooLarge {
        /// Encoded size of the message.
        size: usize,
    },
    /// Bytes that should hold text are not valid UTF-8.
    InvalidUtf8,
    /// A selection reaches past the dataspace extent.
    SelectionOutOfBounds {
        /// First selected element.
        start: u64,
        /// Number of selected elements.
        count: u64,
        /// Extent of the dimension.
        extent: u64,
    },
    /// Block selection applied to a dataspace that is not one-dimensional.
    SelectionRankMismatch {
        selection: usize,
        dataspace: usize,
    },
    /// Memory and file selections cover different element counts.
    SelectionCountMismatch {
        /// Elements in the memory selection.
        memory: u64,
        /// Elements in the file selection.
        file: u64,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any valid offset")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderSignature => {
                write!(f, "invalid object header signature")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "invalid object header version: {v}")
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::UnsupportedDatatypeClass(c) => {
                write!(f, "unsupported datatype class: {c}")
            }
            FormatError::InvalidDatatypeVersion(v) => {
                write!(f, "invalid datatype version: {v}")
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => {
                write!(f, "invalid dataspace type: {t}")
            }
            FormatError::InvalidLayoutVersion(v) => {
                write!(f, "invalid data layout version: {v}")
            }
            FormatError::UnsupportedLayoutClass(c) => {
                write!(f, "unsupported data layout class: {c}")
            }
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute message version: {v}")
            }
            FormatError::InvalidLinkVersion(v) => {
                write!(f, "invalid link message version: {v}")
            }
            FormatError::InvalidLinkInfoVersion(v) => {
                write!(f, "invalid link info version: {v}")
            }
            FormatError::InvalidGroupInfoVersion(v) => {
                write!(f, "invalid group info version: {v}")
            }
            FormatError::InvalidFillValueVersion(v) => {
                write!(f, "invalid fill value message version: {v}")
            }
            FormatError::InvalidStringPadding(p) => {
                write!(f, "invalid string padding type: {p}")
            }
            FormatError::InvalidCharacterSet(c) => {
                write!(f, "invalid character set: {c}")
            }
            FormatError::UnsupportedFeature(what) => {
                write!(f, "unsupported HDF5 feature: {what}")
            }
            FormatError::MessageTooLarge { size } => {
                write!(f, "header message of {size} bytes exceeds 65535")
            }
            FormatError::InvalidUtf8 => write!(f, "string data is not valid UTF-8"),
            FormatError::SelectionOutOfBounds {
                start,
                count,
                extent,
            } => {
                write!(
                    f,
                    "selection of {count} elements at {start} exceeds extent {extent}"
                )
            }
            FormatError::SelectionRankMismatch {
                selection,
                dataspace,
            } => {
                write!(
                    f,
                    "selection rank {selection} does not match dataspace rank {dataspace}"
                )
            }
            FormatError::SelectionCountMismatch { memory, file } => {
                write!(
                    f,
                    "memory selection has {memory} elements, file selection has {file}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
