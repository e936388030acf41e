//! Conversion between subscripts and linear indices, with configurable
//! handling of out-of-bounds values.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use smallvec::SmallVec;

use crate::errors::{ConfigError, IndexError};
use crate::layout::{numel, Layout, Order};

/// Policy for handling an index which is outside of the valid range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexMode {
    /// Report an [`IndexError::OutOfBounds`] error.
    #[default]
    Throw,

    /// Wrap around using modulo arithmetic.
    Wrap,

    /// Saturate to the nearest valid index.
    Clamp,
}

impl IndexMode {
    /// Return the external string form of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexMode::Throw => "throw",
            IndexMode::Wrap => "wrap",
            IndexMode::Clamp => "clamp",
        }
    }
}

impl FromStr for IndexMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<IndexMode, ConfigError> {
        match s {
            "throw" => Ok(IndexMode::Throw),
            "wrap" => Ok(IndexMode::Wrap),
            "clamp" => Ok(IndexMode::Clamp),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

impl Display for IndexMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the mode used for dimension `dim`, recycling `modes` if it is
/// shorter than the number of dimensions.
#[inline]
fn mode_for_dim(modes: &[IndexMode], dim: usize) -> IndexMode {
    if modes.is_empty() {
        IndexMode::Throw
    } else {
        modes[dim % modes.len()]
    }
}

/// Resolve `index` to a value in `[0, max]` according to `mode`.
pub fn resolve_index(index: isize, max: usize, mode: IndexMode) -> Result<usize, IndexError> {
    match mode {
        IndexMode::Clamp => Ok(index.clamp(0, max as isize) as usize),
        IndexMode::Wrap => {
            let len = max as isize + 1;
            Ok(index.rem_euclid(len) as usize)
        }
        IndexMode::Throw => {
            if index < 0 || index as usize > max {
                Err(IndexError::OutOfBounds { index, max })
            } else {
                Ok(index as usize)
            }
        }
    }
}

/// Convert subscripts to a buffer offset.
///
/// Each subscript is resolved against the size of its dimension using the
/// mode `modes[i % modes.len()]`, and the result is `offset + sum(strides[i]
/// * subscripts[i])`. An empty `modes` slice is treated as `[Throw]`.
///
/// Dimensions of size zero have no valid subscript, so any subscript for
/// such a dimension is reported as out of bounds. Strides and an offset
/// which do not describe a valid layout can produce a negative sum, which
/// is reported as [`IndexError::NegativeOffset`].
pub fn subscripts_to_linear_index(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    _order: Order,
    subscripts: &[isize],
    modes: &[IndexMode],
) -> Result<usize, IndexError> {
    if subscripts.len() != shape.len() {
        return Err(IndexError::DimensionMismatch {
            expected: shape.len(),
            actual: subscripts.len(),
        });
    }

    let mut index = offset as isize;
    for (dim, (&sub, (&size, &stride))) in subscripts
        .iter()
        .zip(shape.iter().zip(strides))
        .enumerate()
    {
        if size == 0 {
            return Err(IndexError::OutOfBounds {
                index: sub,
                max: 0,
            });
        }
        let resolved = resolve_index(sub, size - 1, mode_for_dim(modes, dim))?;
        index += stride * resolved as isize;
    }

    usize::try_from(index).map_err(|_| IndexError::NegativeOffset { offset: index })
}

/// Subscripts returned by [`linear_index_to_subscripts`].
pub type Subscripts = SmallVec<[usize; 5]>;

/// Convert a linear index into subscripts.
///
/// `index` is the position of an element when the array is enumerated in
/// `order` (row-major: last dimension fastest). It is first resolved
/// against `[0, numel - 1]` using `mode`.
///
/// `strides` and `offset` describe the view being indexed but do not
/// affect the result, since the index is logical rather than a buffer
/// offset.
pub fn linear_index_to_subscripts(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    order: Order,
    index: isize,
    mode: IndexMode,
) -> Result<Subscripts, IndexError> {
    let mut out = SmallVec::from_elem(0, shape.len());
    linear_index_to_subscripts_into(shape, strides, offset, order, index, mode, &mut out)?;
    Ok(out)
}

/// Variant of [`linear_index_to_subscripts`] which writes into a
/// caller-provided buffer, to avoid allocating when converting many indices.
///
/// Panics if `out.len() != shape.len()`.
pub fn linear_index_to_subscripts_into(
    shape: &[usize],
    _strides: &[isize],
    _offset: usize,
    order: Order,
    index: isize,
    mode: IndexMode,
    out: &mut [usize],
) -> Result<(), IndexError> {
    assert_eq!(out.len(), shape.len(), "output length must match ndim");

    let len = numel(shape);
    if len == 0 {
        return Err(IndexError::Empty);
    }
    let mut index = resolve_index(index, len - 1, mode)?;

    match order {
        Order::RowMajor => {
            for (sub, &size) in out.iter_mut().zip(shape).rev() {
                *sub = index % size;
                index /= size;
            }
        }
        Order::ColumnMajor => {
            for (sub, &size) in out.iter_mut().zip(shape) {
                *sub = index % size;
                index /= size;
            }
        }
    }
    Ok(())
}

impl Layout {
    /// Map subscripts to a buffer offset. See [`subscripts_to_linear_index`].
    pub fn offset_of(
        &self,
        subscripts: &[isize],
        modes: &[IndexMode],
    ) -> Result<usize, IndexError> {
        subscripts_to_linear_index(
            self.shape(),
            self.strides(),
            self.offset(),
            self.order(),
            subscripts,
            modes,
        )
    }

    /// Map a logical linear index to subscripts, enumerating elements in the
    /// layout's order. See [`linear_index_to_subscripts`].
    pub fn subscripts_of(&self, index: isize, mode: IndexMode) -> Result<Subscripts, IndexError> {
        linear_index_to_subscripts(
            self.shape(),
            self.strides(),
            self.offset(),
            self.order(),
            index,
            mode,
        )
    }
}
