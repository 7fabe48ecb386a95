//! Error type for container operations.

use asdf_format::FormatError;

/// Everything that can go wrong while creating, reading or writing a
/// container.
///
/// Validation failures are raised before anything is modified, so an
/// operation that returns an error leaves the container as it was.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid HDF5, or uses a feature outside the ASDF subset.
    #[error("HDF5 format error: {0}")]
    Format(#[from] FormatError),

    /// A group, dataset or attribute with this name already exists.
    #[error("an object named {0:?} already exists")]
    DuplicateName(String),

    /// Nothing is linked at the given path.
    #[error("no object at {0:?}")]
    NotFound(String),

    /// The object at the given path is a group, not a dataset.
    #[error("{0:?} is not a dataset")]
    NotADataset(String),

    /// The object at the given path is a dataset, not a group.
    #[error("{0:?} is not a group")]
    NotAGroup(String),

    /// A path with an empty segment or a NUL byte.
    #[error("malformed path {0:?}")]
    MalformedPath(String),

    /// A name that is empty, `.`, too long, or contains `/` or NUL.
    #[error("invalid object name {0:?}")]
    InvalidName(String),

    /// Text stored NUL-terminated contains a NUL.
    #[error("{0} contains an embedded NUL byte")]
    EmbeddedNul(String),

    /// A partial transfer would reach past the end of the dataset.
    #[error("samples [{offset}, {offset} + {length}) fall outside extent {extent}")]
    Range { offset: u64, length: u64, extent: u64 },

    /// The caller's buffer does not match the number of selected elements.
    #[error("expected {expected} elements, buffer holds {actual}")]
    ShapeMismatch { expected: u64, actual: u64 },

    /// The dataset element type does not suit the requested transfer.
    #[error("{path:?} stores {actual}, expected {expected}")]
    TypeMismatch {
        path: String,
        /// Type the operation needs.
        expected: &'static str,
        /// Type the dataset stores.
        actual: &'static str,
    },

    /// A mutation was attempted on a read-only container.
    #[error("container is open read-only")]
    ReadOnly,

    /// A rendered attribute value exceeds its configured width.
    #[error("{value:?} is {needed} characters, limit is {width}")]
    ValueTooWide {
        value: String,
        needed: usize,
        width: usize,
    },

    /// The sampling rate is NaN or infinite.
    #[error("sampling rate {0} is not finite")]
    InvalidSamplingRate(f64),

    /// `refresh` would discard declarations that were never flushed.
    #[error("container has declarations that were not flushed")]
    UnflushedDeclarations,

    /// The object carries no attribute with this name.
    #[error("no attribute {attr:?} on {path:?}")]
    AttributeNotFound { path: String, attr: String },
}

impl Error {
    /// Whether the error is a selection reaching past a dataset's extent.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            Error::Range { .. } | Error::Format(FormatError::SelectionOutOfBounds { .. })
        )
    }

    /// Whether the error came from the file or its encoding rather than
    /// from an argument the caller passed.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Format(_)) && !self.is_range_error()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
