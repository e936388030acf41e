//! Shapes, strides and the mapping from logical indices to buffer offsets.

use std::fmt::{Display, Formatter};
use std::iter::zip;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::errors::{ConfigError, LayoutError};

/// Dynamically sized shape, which avoids allocating for arrays with up to
/// five dimensions.
pub type DynShape = SmallVec<[usize; 5]>;

/// Dynamically sized stride vector. Strides are measured in elements and
/// may be negative (reverse traversal) or zero (broadcast).
pub type DynStrides = SmallVec<[isize; 5]>;

/// Memory order convention used when deriving strides from a shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// The last dimension varies fastest ("C" order).
    #[default]
    RowMajor,

    /// The first dimension varies fastest ("Fortran" order).
    ColumnMajor,
}

impl Order {
    /// Return the external string form of the order.
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::RowMajor => "row-major",
            Order::ColumnMajor => "column-major",
        }
    }

    /// Parse an order string, falling back to row-major if the value is
    /// absent or malformed.
    pub fn parse_or_default(value: Option<&str>) -> Order {
        value.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for Order {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Order, ConfigError> {
        match s {
            "row-major" => Ok(Order::RowMajor),
            "column-major" => Ok(Order::ColumnMajor),
            _ => Err(ConfigError::UnknownOrder(s.to_string())),
        }
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of an arbitrary stride vector.
///
/// Variants are listed in the order used when scanning classification
/// buckets in the loop-order optimizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrideOrder {
    /// Strides are neither ordered like a row-major nor column-major layout.
    None,

    /// Absolute strides are non-increasing from left to right.
    RowMajor,

    /// Absolute strides are non-decreasing from left to right.
    ColumnMajor,

    /// Absolute strides are consistent with both orders, eg. because there
    /// is only one dimension or all strides are equal.
    Both,
}

impl StrideOrder {
    /// Position of this classification in the fixed bucket scan order.
    pub(crate) fn bucket(self) -> usize {
        match self {
            StrideOrder::None => 0,
            StrideOrder::RowMajor => 1,
            StrideOrder::ColumnMajor => 2,
            StrideOrder::Both => 3,
        }
    }

    /// Return true if arrays with these two classifications visit elements
    /// in the same logical order when traversed in memory order.
    pub(crate) fn compatible_with(self, other: StrideOrder) -> bool {
        self == other || self == StrideOrder::Both || other == StrideOrder::Both
    }
}

/// Return the number of elements in an array with a given shape.
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Convert a shape given as signed integers, as found in external
/// configuration, to a shape.
pub fn shape_from_signed(shape: &[i64]) -> Result<DynShape, ConfigError> {
    shape
        .iter()
        .map(|&size| usize::try_from(size))
        .collect::<Result<DynShape, _>>()
        .map_err(|_| ConfigError::InvalidShape(shape.to_vec()))
}

/// Return the strides of a contiguous array with a given shape and order.
///
/// For a row-major layout the last stride is 1 and each earlier stride is
/// the product of the sizes of the following dimensions. Column-major
/// layouts are the mirror image.
pub fn shape_to_strides(shape: &[usize], order: Order) -> DynStrides {
    let mut strides: DynStrides = SmallVec::from_elem(0, shape.len());
    let mut product = 1isize;
    match order {
        Order::RowMajor => {
            for (stride, &size) in zip(strides.iter_mut(), shape).rev() {
                *stride = product;
                product *= size as isize;
            }
        }
        Order::ColumnMajor => {
            for (stride, &size) in zip(strides.iter_mut(), shape) {
                *stride = product;
                product *= size as isize;
            }
        }
    }
    strides
}

/// Classify the memory order of a stride vector.
///
/// This is a heuristic used to choose traversal orders. It does not imply
/// that the layout is contiguous.
pub fn strides_to_order(strides: &[isize]) -> StrideOrder {
    if strides.is_empty() {
        return StrideOrder::None;
    }

    let mut row_major = true;
    let mut col_major = true;
    for pair in strides.windows(2) {
        let (prev, next) = (pair[0].unsigned_abs(), pair[1].unsigned_abs());
        row_major &= next <= prev;
        col_major &= next >= prev;
    }

    match (row_major, col_major) {
        (true, true) => StrideOrder::Both,
        (true, false) => StrideOrder::RowMajor,
        (false, true) => StrideOrder::ColumnMajor,
        (false, false) => StrideOrder::None,
    }
}

/// Return the direction in which a layout's elements are laid out in memory.
///
/// Returns `1` if no stride is negative, `-1` if every stride is negative
/// and `0` if signs are mixed.
pub fn iteration_direction(strides: &[isize]) -> isize {
    let negative = strides.iter().filter(|&&s| s < 0).count();
    if negative == 0 {
        1
    } else if negative == strides.len() {
        -1
    } else {
        0
    }
}

/// Return the minimum and maximum buffer offsets which are accessible via a
/// view with the given shape, strides and offset.
///
/// The offsets are signed because a malformed layout may reach before the
/// start of its buffer. For empty views both values equal `offset`.
pub fn min_max_offset(shape: &[usize], strides: &[isize], offset: usize) -> (isize, isize) {
    let offset = offset as isize;
    if shape.contains(&0) {
        return (offset, offset);
    }

    let mut min = offset;
    let mut max = offset;
    for (&size, &stride) in zip(shape, strides) {
        let extent = stride * (size as isize - 1);
        if extent > 0 {
            max += extent;
        } else {
            min += extent;
        }
    }
    (min, max)
}

/// Describes the shape of an array view and how its indices map to offsets
/// in a linear buffer.
///
/// A layout is a plain value. Transformations such as slicing and
/// broadcasting produce new layouts rather than modifying existing ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    shape: DynShape,
    strides: DynStrides,
    offset: usize,
    order: Order,
}

impl Layout {
    /// Create a contiguous layout with a given shape and order.
    pub fn from_shape(shape: &[usize], order: Order) -> Layout {
        Layout {
            shape: shape.into(),
            strides: shape_to_strides(shape, order),
            offset: 0,
            order,
        }
    }

    /// Create a layout from its parts.
    ///
    /// Fails if `strides` and `shape` differ in length or if some index
    /// would map to a negative offset.
    pub fn from_parts(
        shape: &[usize],
        strides: &[isize],
        offset: usize,
        order: Order,
    ) -> Result<Layout, LayoutError> {
        if shape.len() != strides.len() {
            return Err(LayoutError::StridesLengthMismatch);
        }
        let (min, _) = min_max_offset(shape, strides, offset);
        if min < 0 {
            return Err(LayoutError::StorageTooShort);
        }
        Ok(Self::from_parts_unchecked(shape.into(), strides.into(), offset, order))
    }

    pub(crate) fn from_parts_unchecked(
        shape: DynShape,
        strides: DynStrides,
        offset: usize,
        order: Order,
    ) -> Layout {
        debug_assert_eq!(shape.len(), strides.len());
        Layout {
            shape,
            strides,
            offset,
            order,
        }
    }

    /// Return the size of each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Return the stride of each dimension.
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Return the buffer offset of the first element (the element whose
    /// subscripts are all zero).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the order convention of this layout.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Return the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Return the size of dimension `dim`.
    pub fn size(&self, dim: usize) -> usize {
        self.shape[dim]
    }

    /// Return the stride of dimension `dim`.
    pub fn stride(&self, dim: usize) -> isize {
        self.strides[dim]
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        numel(&self.shape)
    }

    /// Return true if the layout has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the strides of this layout, or `[0]` for a zero-rank layout.
    ///
    /// Zero-rank layouts conventionally report a single zero stride in
    /// external descriptor formats.
    pub fn strides_or_default(&self) -> DynStrides {
        if self.strides.is_empty() {
            SmallVec::from_slice(&[0])
        } else {
            self.strides.clone()
        }
    }

    /// Classify the memory order of this layout's strides.
    pub fn stride_order(&self) -> StrideOrder {
        strides_to_order(&self.strides)
    }

    /// See [`iteration_direction`].
    pub fn iteration_direction(&self) -> isize {
        iteration_direction(&self.strides)
    }

    /// Return the minimum and maximum buffer offsets reachable by this
    /// layout.
    pub fn min_max_offset(&self) -> (usize, usize) {
        let (min, max) = min_max_offset(&self.shape, &self.strides, self.offset);
        (min.max(0) as usize, max.max(0) as usize)
    }

    /// Return the minimum length of a buffer which can hold this layout's
    /// elements.
    pub fn min_data_len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.min_max_offset().1 + 1
        }
    }

    /// Return true if the elements of this layout occupy a contiguous span
    /// of the buffer with no gaps or repeats, and are stored with a
    /// consistent direction.
    pub fn is_contiguous(&self) -> bool {
        if self.is_empty() || self.iteration_direction() == 0 {
            return false;
        }
        let (min, max) = self.min_max_offset();
        max - min + 1 == self.len()
    }

    /// Return true if some stride is zero in a dimension with more than one
    /// index, so that multiple indices alias the same element.
    pub fn is_broadcast(&self) -> bool {
        !self.is_empty() && zip(&self.shape, &self.strides).any(|(&size, &s)| size > 1 && s == 0)
    }

    /// Return an iterator over the buffer offsets of this layout's elements,
    /// in logical row-major order.
    pub fn offsets(&self) -> Offsets<'_> {
        Offsets {
            layout: self,
            index: SmallVec::from_elem(0, self.ndim()),
            offset: self.offset as isize,
            remaining: self.len(),
        }
    }
}

/// Iterator over buffer offsets returned by [`Layout::offsets`].
pub struct Offsets<'a> {
    layout: &'a Layout,
    index: DynShape,
    offset: isize,
    remaining: usize,
}

impl Iterator for Offsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.offset;

        for dim in (0..self.index.len()).rev() {
            let stride = self.layout.strides[dim];
            self.index[dim] += 1;
            self.offset += stride;
            if self.index[dim] < self.layout.shape[dim] {
                break;
            }
            self.offset -= stride * self.layout.shape[dim] as isize;
            self.index[dim] = 0;
        }

        Some(current as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Offsets<'_> {}

#[cfg(test)]
mod tests {
    use ndstride_testing::{reference_offsets, TestCases};

    use super::{
        iteration_direction, min_max_offset, numel, shape_from_signed, shape_to_strides,
        strides_to_order, Layout, Order, StrideOrder,
    };
    use crate::errors::{ConfigError, LayoutError};

    #[test]
    fn test_shape_to_strides() {
        #[derive(Debug)]
        struct Case<'a> {
            shape: &'a [usize],
            order: Order,
            strides: &'a [isize],
        }

        let cases = [
            Case {
                shape: &[3, 4, 5],
                order: Order::RowMajor,
                strides: &[20, 5, 1],
            },
            Case {
                shape: &[3, 4, 5],
                order: Order::ColumnMajor,
                strides: &[1, 3, 12],
            },
            Case {
                shape: &[7],
                order: Order::RowMajor,
                strides: &[1],
            },
            Case {
                shape: &[2, 0, 3],
                order: Order::RowMajor,
                strides: &[0, 3, 1],
            },
            Case {
                shape: &[],
                order: Order::ColumnMajor,
                strides: &[],
            },
        ];

        cases.test_each(|case| {
            assert_eq!(
                shape_to_strides(case.shape, case.order).as_slice(),
                case.strides
            );
        })
    }

    #[test]
    fn test_strides_to_order() {
        #[derive(Debug)]
        struct Case<'a> {
            strides: &'a [isize],
            order: StrideOrder,
        }

        let cases = [
            Case {
                strides: &[20, 5, 1],
                order: StrideOrder::RowMajor,
            },
            Case {
                strides: &[-20, 5, -1],
                order: StrideOrder::RowMajor,
            },
            Case {
                strides: &[1, 3, 12],
                order: StrideOrder::ColumnMajor,
            },
            Case {
                strides: &[5, 1, 20],
                order: StrideOrder::None,
            },
            Case {
                strides: &[4],
                order: StrideOrder::Both,
            },
            Case {
                strides: &[2, 2],
                order: StrideOrder::Both,
            },
            Case {
                strides: &[],
                order: StrideOrder::None,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(strides_to_order(case.strides), case.order);
        })
    }

    #[test]
    fn test_iteration_direction() {
        assert_eq!(iteration_direction(&[3, 1]), 1);
        assert_eq!(iteration_direction(&[3, 0]), 1);
        assert_eq!(iteration_direction(&[-3, -1]), -1);
        assert_eq!(iteration_direction(&[-3, 1]), 0);
        assert_eq!(iteration_direction(&[-3, 0]), 0);
        assert_eq!(iteration_direction(&[]), 1);
    }

    #[test]
    fn test_min_max_offset() {
        assert_eq!(min_max_offset(&[2, 3], &[3, 1], 0), (0, 5));
        assert_eq!(min_max_offset(&[2, 3], &[-3, 1], 3), (0, 5));
        assert_eq!(min_max_offset(&[2, 3], &[-3, -1], 5), (0, 5));
        assert_eq!(min_max_offset(&[2, 0], &[-3, -1], 5), (5, 5));
        assert_eq!(min_max_offset(&[], &[], 2), (2, 2));
    }

    #[test]
    fn test_numel_and_signed_shape() {
        assert_eq!(numel(&[2, 3, 4]), 24);
        assert_eq!(numel(&[]), 1);
        assert_eq!(numel(&[2, 0]), 0);

        assert_eq!(shape_from_signed(&[2, 3]).unwrap().as_slice(), &[2, 3]);
        assert_eq!(
            shape_from_signed(&[2, -1]),
            Err(ConfigError::InvalidShape(vec![2, -1]))
        );
    }

    #[test]
    fn test_order_strings() {
        assert_eq!("row-major".parse::<Order>(), Ok(Order::RowMajor));
        assert_eq!("column-major".parse::<Order>(), Ok(Order::ColumnMajor));
        assert_eq!(
            "diagonal".parse::<Order>(),
            Err(ConfigError::UnknownOrder("diagonal".into()))
        );
        assert_eq!(Order::parse_or_default(Some("nope")), Order::RowMajor);
        assert_eq!(Order::parse_or_default(None), Order::RowMajor);
        assert_eq!(
            Order::parse_or_default(Some("column-major")),
            Order::ColumnMajor
        );
        assert_eq!(Order::ColumnMajor.to_string(), "column-major");
    }

    #[test]
    fn test_layout_from_parts() {
        let layout = Layout::from_parts(&[2, 3], &[-3, 1], 3, Order::RowMajor).unwrap();
        assert_eq!(layout.min_max_offset(), (0, 5));
        assert_eq!(layout.min_data_len(), 6);
        assert!(!layout.is_contiguous());

        assert_eq!(
            Layout::from_parts(&[2, 3], &[3], 0, Order::RowMajor),
            Err(LayoutError::StridesLengthMismatch)
        );
        assert_eq!(
            Layout::from_parts(&[2, 3], &[-3, 1], 0, Order::RowMajor),
            Err(LayoutError::StorageTooShort)
        );
    }

    #[test]
    fn test_layout_contiguity() {
        let layout = Layout::from_shape(&[2, 3, 4], Order::RowMajor);
        assert!(layout.is_contiguous());
        assert!(!layout.is_broadcast());

        let reversed = Layout::from_parts(&[2, 3], &[-3, -1], 5, Order::RowMajor).unwrap();
        assert!(reversed.is_contiguous());

        let strided = Layout::from_parts(&[2, 3], &[6, 2], 0, Order::RowMajor).unwrap();
        assert!(!strided.is_contiguous());

        let broadcast = Layout::from_parts(&[2, 3], &[0, 1], 0, Order::RowMajor).unwrap();
        assert!(broadcast.is_broadcast());
        assert!(!broadcast.is_contiguous());
    }

    #[test]
    fn test_offsets() {
        #[derive(Debug)]
        struct Case<'a> {
            shape: &'a [usize],
            strides: &'a [isize],
            offset: usize,
        }

        let cases = [
            Case {
                shape: &[2, 3],
                strides: &[3, 1],
                offset: 0,
            },
            Case {
                shape: &[2, 3],
                strides: &[1, 2],
                offset: 0,
            },
            Case {
                shape: &[3, 2],
                strides: &[-2, 1],
                offset: 4,
            },
            Case {
                shape: &[2, 2, 2],
                strides: &[0, 1, 0],
                offset: 1,
            },
            Case {
                shape: &[],
                strides: &[],
                offset: 3,
            },
            Case {
                shape: &[2, 0],
                strides: &[1, 1],
                offset: 0,
            },
        ];

        cases.test_each(|case| {
            let layout =
                Layout::from_parts(case.shape, case.strides, case.offset, Order::RowMajor).unwrap();
            let offsets: Vec<usize> = layout.offsets().collect();
            assert_eq!(offsets.len(), layout.len());
            assert_eq!(
                offsets,
                reference_offsets(case.shape, case.strides, case.offset)
            );
        })
    }

    #[test]
    fn test_strides_or_default() {
        let scalar = Layout::from_shape(&[], Order::RowMajor);
        assert_eq!(scalar.strides_or_default().as_slice(), &[0]);
        assert_eq!(scalar.len(), 1);

        let matrix = Layout::from_shape(&[2, 3], Order::ColumnMajor);
        assert_eq!(matrix.strides_or_default().as_slice(), &[1, 2]);
    }
}
