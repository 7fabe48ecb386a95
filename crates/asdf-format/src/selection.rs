//! Selections for partial waveform I/O.
//!
//! A [`Selection`] names the elements of a dataspace that one transfer
//! touches: all of them, or one block along a single dimension.
//!
//! ```
//! use asdf_format::selection::Selection;
//!
//! let sel = Selection::single_block(1_000, 500);
//! assert_eq!(sel.num_elements(&[4_000]), 500);
//! assert!(sel.validate(&[4_000]).is_ok());
//! assert!(sel.validate(&[1_200]).is_err());
//! ```

use crate::error::FormatError;

/// Which elements of a dataspace to access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every element of the dataspace.
    All,
    /// `length` consecutive elements from `offset` in a one-dimensional
    /// dataspace.
    Block { offset: u64, length: u64 },
}

impl Selection {
    pub fn single_block(offset: u64, length: u64) -> Self {
        Selection::Block { offset, length }
    }

    /// Number of selected elements for a dataspace of shape `dims`.
    pub fn num_elements(&self, dims: &[u64]) -> u64 {
        match *self {
            Selection::All => dims.iter().product(),
            Selection::Block { length, .. } => length,
        }
    }

    /// Check that the selection lies inside a dataspace of shape `dims`.
    ///
    /// An empty block still may not start past the end.
    pub fn validate(&self, dims: &[u64]) -> Result<(), FormatError> {
        let (offset, length) = match *self {
            Selection::All => return Ok(()),
            Selection::Block { offset, length } => (offset, length),
        };
        let extent = match dims {
            [extent] => *extent,
            _ => {
                return Err(FormatError::SelectionRankMismatch {
                    selection: 1,
                    dataspace: dims.len(),
                })
            }
        };
        match offset.checked_add(length) {
            Some(end) if end <= extent => Ok(()),
            _ => Err(FormatError::SelectionOutOfBounds {
                start: offset,
                count: length,
                extent,
            }),
        }
    }

    /// First element and length of the run this selection covers.
    pub fn contiguous_run(&self, dims: &[u64]) -> Result<(u64, u64), FormatError> {
        self.validate(dims)?;
        Ok(match *self {
            Selection::All => (0, dims.iter().product()),
            Selection::Block { offset, length } => (offset, length),
        })
    }
}

/// Pair a memory selection with a file selection for one transfer.
///
/// Both must be in bounds of their dataspaces and cover the same number of
/// elements. Returns that element count.
pub fn check_transfer(
    memory: &Selection,
    memory_dims: &[u64],
    file: &Selection,
    file_dims: &[u64],
) -> Result<u64, FormatError> {
    memory.validate(memory_dims)?;
    file.validate(file_dims)?;
    let m = memory.num_elements(memory_dims);
    let f = file.num_elements(file_dims);
    if m != f {
        return Err(FormatError::SelectionCountMismatch { memory: m, file: f });
    }
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_covers_extent() {
        assert_eq!(Selection::All.num_elements(&[40]), 40);
        assert_eq!(Selection::All.contiguous_run(&[40]).unwrap(), (0, 40));
        assert_eq!(Selection::All.contiguous_run(&[]).unwrap(), (0, 1));
    }

    #[test]
    fn single_block_in_bounds() {
        let sel = Selection::single_block(10, 10);
        assert_eq!(sel.contiguous_run(&[40]).unwrap(), (10, 10));
        // exactly reaching the end
        assert!(Selection::single_block(30, 10).validate(&[40]).is_ok());
    }

    #[test]
    fn single_block_past_end() {
        assert_eq!(
            Selection::single_block(35, 10).validate(&[40]),
            Err(FormatError::SelectionOutOfBounds {
                start: 35,
                count: 10,
                extent: 40
            })
        );
    }

    #[test]
    fn empty_block_positions() {
        assert!(Selection::single_block(40, 0).validate(&[40]).is_ok());
        assert!(Selection::single_block(41, 0).validate(&[40]).is_err());
        assert_eq!(Selection::single_block(0, 0).contiguous_run(&[0]).unwrap(), (0, 0));
    }

    #[test]
    fn overflowing_end_is_out_of_bounds() {
        let sel = Selection::single_block(u64::MAX - 2, 5);
        assert!(matches!(
            sel.validate(&[u64::MAX]),
            Err(FormatError::SelectionOutOfBounds { .. })
        ));
    }

    #[test]
    fn block_needs_one_dimension() {
        assert_eq!(
            Selection::single_block(0, 1).validate(&[4, 4]),
            Err(FormatError::SelectionRankMismatch {
                selection: 1,
                dataspace: 2
            })
        );
    }

    #[test]
    fn transfer_counts_must_agree() {
        let file = Selection::single_block(0, 10);
        assert_eq!(check_transfer(&Selection::All, &[10], &file, &[40]).unwrap(), 10);
        assert_eq!(
            check_transfer(&Selection::All, &[9], &file, &[40]),
            Err(FormatError::SelectionCountMismatch { memory: 9, file: 10 })
        );
    }
}
