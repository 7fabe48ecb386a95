//! HDF5 on-disk structures for the ASDF waveform container.
//!
//! Parsers and serializers for the subset of the HDF5 file format that an
//! ASDF container uses: the version 3 superblock, version 2 object headers,
//! and the header messages needed for groups, contiguous datasets and
//! scalar string attributes. Anything outside that subset is rejected with
//! a typed [`FormatError`] rather than misread.
//!
//! Works in `no_std` environments with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod bytes;

pub mod attribute;
pub mod checksum;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod fill_value;
pub mod link_info;
pub mod link_message;
pub mod message_type;
pub mod object_header;
pub mod object_header_writer;
pub mod property_list;
pub mod selection;
pub mod superblock;

pub use attribute::AttributeMessage;
pub use data_layout::DataLayout;
pub use dataspace::Dataspace;
pub use datatype::Datatype;
pub use error::FormatError;
pub use message_type::MessageType;
pub use object_header::ObjectHeader;
pub use object_header_writer::ObjectHeaderWriter;
pub use property_list::FileAccessProps;
pub use selection::Selection;
pub use superblock::Superblock;

/// Width in bytes of file addresses written by this crate.
pub const OFFSET_SIZE: u8 = 8;

/// Width in bytes of lengths written by this crate.
pub const LENGTH_SIZE: u8 = 8;
