//! Error types that are reported by layout, indexing, slicing and dispatch
//! operations.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors that can occur when mapping between subscripts and linear indices.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    /// The number of subscripts does not match the number of dimensions.
    DimensionMismatch { expected: usize, actual: usize },

    /// An index is outside of `[0, max]` and the index mode is
    /// [`Throw`](crate::IndexMode::Throw).
    OutOfBounds { index: isize, max: usize },

    /// The array has no elements, so no index is valid.
    Empty,

    /// The subscripts map to an offset before the start of the buffer.
    NegativeOffset { offset: isize },
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::DimensionMismatch { expected, actual } => write!(
                f,
                "number of subscripts ({}) does not match number of dimensions ({})",
                actual, expected
            ),
            IndexError::OutOfBounds { index, max } => {
                write!(f, "index {} is outside the interval [0, {}]", index, max)
            }
            IndexError::Empty => write!(f, "array has no elements"),
            IndexError::NegativeOffset { offset } => {
                write!(f, "subscripts map to negative offset {}", offset)
            }
        }
    }
}

impl Error for IndexError {}

/// Errors that can occur when slicing an array.
#[derive(Clone, Debug, PartialEq)]
pub enum SliceError {
    /// The slice spec has a different number of entries than the array has
    /// dimensions.
    DimensionMismatch { ndim: usize, slice_dims: usize },

    /// A slice exceeds the bounds of the array and slicing is strict.
    OutOfBounds { dim: usize },

    /// The dimension passed to a single-dimension slice is out of range.
    InvalidDimension { dim: isize, ndim: usize },
}

impl Display for SliceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceError::DimensionMismatch { ndim, slice_dims } => write!(
                f,
                "slice has {} dims but array has {} dims",
                slice_dims, ndim
            ),
            SliceError::OutOfBounds { dim } => {
                write!(f, "slice exceeds array bounds in dim {}", dim)
            }
            SliceError::InvalidDimension { dim, ndim } => {
                write!(f, "dim {} is invalid for array with {} dims", dim, ndim)
            }
        }
    }
}

impl Error for SliceError {}

/// Error when an array cannot be broadcast to a target shape.
#[derive(Clone, Debug, PartialEq)]
pub struct BroadcastError {
    pub from: Vec<usize>,
    pub to: Vec<usize>,
}

impl Display for BroadcastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot broadcast shape {:?} to {:?}", self.from, self.to)
    }
}

impl Error for BroadcastError {}

/// Errors that can occur when constructing a layout or array from parts.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutError {
    /// The strides have a different length than the shape.
    StridesLengthMismatch,

    /// Some indices map to offsets that are beyond the end of the buffer, or
    /// before its start.
    StorageTooShort,

    /// The buffer length does not match the product of the shape.
    StorageLengthMismatch { len: usize, numel: usize },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::StridesLengthMismatch => write!(f, "strides length != shape length"),
            LayoutError::StorageTooShort => write!(f, "data too short for layout"),
            LayoutError::StorageLengthMismatch { len, numel } => write!(
                f,
                "data length {} does not match shape with {} elements",
                len, numel
            ),
        }
    }
}

impl Error for LayoutError {}

/// Errors in string or numeric configuration values.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// An index mode string other than "throw", "wrap" or "clamp".
    UnknownMode(String),

    /// An order string other than "row-major" or "column-major".
    UnknownOrder(String),

    /// A shape entry which is negative.
    InvalidShape(Vec<i64>),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownMode(mode) => write!(f, "unknown index mode \"{}\"", mode),
            ConfigError::UnknownOrder(order) => write!(f, "unknown order \"{}\"", order),
            ConfigError::InvalidShape(shape) => {
                write!(f, "shape {:?} has negative entries", shape)
            }
        }
    }
}

impl Error for ConfigError {}

/// Errors that can occur when applying an elementwise operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchError {
    /// The output array is read-only.
    ReadOnly,

    /// Co-iterated arrays have different shapes.
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::ReadOnly => write!(f, "output array is read-only"),
            DispatchError::ShapeMismatch { expected, actual } => write!(
                f,
                "array shape {:?} does not match shape {:?}",
                actual, expected
            ),
        }
    }
}

impl Error for DispatchError {}

/// Errors that can occur when reading or writing a single element of an
/// array.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementError {
    /// The subscripts could not be resolved.
    Index(IndexError),

    /// The array is read-only.
    ReadOnly,

    /// The subscripts resolved to an offset beyond the end of the buffer.
    OutOfStorage { offset: usize, len: usize },
}

impl Display for ElementError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementError::Index(err) => write!(f, "invalid subscripts: {}", err),
            ElementError::ReadOnly => write!(f, "array is read-only"),
            ElementError::OutOfStorage { offset, len } => {
                write!(f, "offset {} is outside buffer of length {}", offset, len)
            }
        }
    }
}

impl Error for ElementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ElementError::Index(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IndexError> for ElementError {
    fn from(err: IndexError) -> Self {
        ElementError::Index(err)
    }
}
