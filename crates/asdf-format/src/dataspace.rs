//! Dataspace message (type 0x01).

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::bytes::{ensure_len, push_uint, read_uint};
use crate::error::FormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceKind {
    Scalar,
    Simple,
    Null,
}

/// Shape of a dataset or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    pub kind: DataspaceKind,
    pub dims: Vec<u64>,
    pub max_dims: Option<Vec<u64>>,
}

impl Dataspace {
    pub fn scalar() -> Self {
        Dataspace {
            kind: DataspaceKind::Scalar,
            dims: Vec::new(),
            max_dims: None,
        }
    }

    /// Fixed-size simple dataspace.
    pub fn simple(dims: &[u64]) -> Self {
        Dataspace {
            kind: DataspaceKind::Simple,
            dims: dims.to_vec(),
            max_dims: None,
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements: 1 for scalar, 0 for null.
    pub fn num_elements(&self) -> u64 {
        match self.kind {
            DataspaceKind::Scalar => 1,
            DataspaceKind::Null => 0,
            DataspaceKind::Simple => self.dims.iter().product(),
        }
    }

    /// Parse a version 1 or 2 dataspace message body.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;
        let version = data[0];
        let rank = data[1] as usize;
        let flags = data[2];
        let (kind, mut pos) = match version {
            1 => {
                let kind = if rank == 0 {
                    DataspaceKind::Scalar
                } else {
                    DataspaceKind::Simple
                };
                (kind, 8)
            }
            2 => {
                let kind = match data[3] {
                    0 => DataspaceKind::Scalar,
                    1 => DataspaceKind::Simple,
                    2 => DataspaceKind::Null,
                    t => return Err(FormatError::InvalidDataspaceType(t)),
                };
                (kind, 4)
            }
            v => return Err(FormatError::InvalidDataspaceVersion(v)),
        };

        let ls = length_size as usize;
        let mut dims = Vec::with_capacity(rank);
        for _ in 0..rank {
            dims.push(read_uint(data, pos, length_size)?);
            pos += ls;
        }
        let max_dims = if flags & 0x01 != 0 {
            let mut max = Vec::with_capacity(rank);
            for _ in 0..rank {
                max.push(read_uint(data, pos, length_size)?);
                pos += ls;
            }
            Some(max)
        } else {
            None
        };

        Ok(Dataspace {
            kind,
            dims,
            max_dims,
        })
    }

    /// Encode as a version 2 message body.
    pub fn serialize(&self, length_size: u8) -> Vec<u8> {
        let kind = match self.kind {
            DataspaceKind::Scalar => 0u8,
            DataspaceKind::Simple => 1,
            DataspaceKind::Null => 2,
        };
        let flags = u8::from(self.max_dims.is_some());
        let mut buf = vec![2, self.dims.len() as u8, flags, kind];
        for &d in &self.dims {
            push_uint(&mut buf, d, length_size);
        }
        if let Some(max) = &self.max_dims {
            for &m in max {
                push_uint(&mut buf, m, length_size);
            }
        }
        buf
    }
}
