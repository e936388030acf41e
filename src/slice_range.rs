//! Slice specifications and their normalization against dimension sizes.

use std::fmt::Debug;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use smallvec::SmallVec;

/// A range of indices along one dimension, with optional endpoints and step.
///
/// Endpoints follow NumPy conventions: negative values count back from the
/// end of the dimension, `start` is inclusive and `stop` is exclusive. An
/// unset `start` or `stop` means "from the first/to the last index in the
/// direction of travel". An unset step is 1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Slice {
    start: Option<isize>,
    stop: Option<isize>,

    /// This is private so this module can enforce that the step is non-zero.
    step: Option<isize>,
}

impl Slice {
    /// Create a slice from its (optional) components.
    ///
    /// Panics if `step` is `Some(0)`.
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Slice {
        assert!(step != Some(0), "Slice step cannot be 0");
        Slice { start, stop, step }
    }

    /// Return a slice which selects every index of a dimension.
    pub fn full() -> Slice {
        Slice::default()
    }

    pub fn start(&self) -> Option<isize> {
        self.start
    }

    pub fn stop(&self) -> Option<isize> {
        self.stop
    }

    pub fn step(&self) -> isize {
        self.step.unwrap_or(1)
    }

    /// Resolve this slice against a dimension of size `len`.
    ///
    /// Endpoints outside the valid range are clamped and reported via
    /// [`NormalizedSlice::out_of_bounds`]. With a positive step the valid
    /// range for both endpoints is `[-len, len]`. With a negative step,
    /// endpoints must resolve to `[-1, len - 1]`, where `-1` is the position
    /// before the first index.
    pub fn normalize(&self, len: usize) -> NormalizedSlice {
        let len = len as isize;
        let step = self.step();
        let mut out_of_bounds = false;

        // Resolve an endpoint to an absolute index, clamping it to
        // `[min, max]`.
        let mut resolve = |index: isize, min: isize, max: isize| {
            let index = if index < 0 { index + len } else { index };
            if index < min {
                out_of_bounds = true;
                min
            } else if index > max {
                out_of_bounds = true;
                max
            } else {
                index
            }
        };

        let (start, stop) = if step > 0 {
            let start = self.start.map(|s| resolve(s, 0, len)).unwrap_or(0);
            let stop = self.stop.map(|s| resolve(s, 0, len)).unwrap_or(len);
            (start, stop)
        } else {
            // When travelling backwards, -1 denotes the position before the
            // first index.
            let start = self.start.map(|s| resolve(s, -1, len - 1)).unwrap_or(len - 1);
            let stop = self.stop.map(|s| resolve(s, -1, len - 1)).unwrap_or(-1);
            (start, stop)
        };

        NormalizedSlice {
            start,
            stop,
            step,
            out_of_bounds,
        }
    }
}

impl<T> From<Range<T>> for Slice
where
    T: TryInto<isize>,
    <T as TryInto<isize>>::Error: Debug,
{
    fn from(r: Range<T>) -> Slice {
        let start = r.start.try_into().unwrap();
        let stop = r.end.try_into().unwrap();
        Slice::new(Some(start), Some(stop), None)
    }
}

impl<T> From<RangeTo<T>> for Slice
where
    T: TryInto<isize>,
    <T as TryInto<isize>>::Error: Debug,
{
    fn from(r: RangeTo<T>) -> Slice {
        let stop = r.end.try_into().unwrap();
        Slice::new(None, Some(stop), None)
    }
}

impl<T> From<RangeFrom<T>> for Slice
where
    T: TryInto<isize>,
    <T as TryInto<isize>>::Error: Debug,
{
    fn from(r: RangeFrom<T>) -> Slice {
        let start = r.start.try_into().unwrap();
        Slice::new(Some(start), None, None)
    }
}

impl From<RangeFull> for Slice {
    #[inline]
    fn from(_: RangeFull) -> Slice {
        Slice::full()
    }
}

/// A [`Slice`] resolved against a dimension size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedSlice {
    /// First index, in `[0, len]` for positive steps or `[-1, len - 1]` for
    /// negative steps.
    pub start: isize,

    /// Index one step past the last index. This is `-1` when a negative step
    /// runs to the start of the dimension.
    pub stop: isize,

    pub step: isize,

    /// True if an endpoint was outside the valid range and was clamped.
    pub out_of_bounds: bool,
}

impl NormalizedSlice {
    /// Return the number of indices selected.
    pub fn len(&self) -> usize {
        let (span, step) = if self.step > 0 {
            (self.stop - self.start, self.step)
        } else {
            (self.start - self.stop, -self.step)
        };
        if span <= 0 {
            0
        } else {
            span.unsigned_abs().div_ceil(step.unsigned_abs())
        }
    }

    /// Return true if no indices are selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Specifies how one dimension is treated when slicing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SliceItem {
    /// Select a single index and remove the dimension from the result.
    ///
    /// Negative indices count back from the end of the dimension.
    Index(isize),

    /// Select a range of indices, keeping the dimension.
    Range(Slice),
}

impl SliceItem {
    /// Return a SliceItem that selects the full range of a dimension.
    #[inline]
    pub fn full_range() -> Self {
        SliceItem::Range(Slice::full())
    }

    /// Return a SliceItem that selects part of a dimension.
    #[inline]
    pub fn range(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        SliceItem::Range(Slice::new(start, stop, step))
    }

    /// Return true if this item removes its dimension.
    pub fn is_reduce(&self) -> bool {
        matches!(self, SliceItem::Index(_))
    }

    /// Resolve this item against a dimension of size `len`.
    ///
    /// An index `i` is in bounds if `-len <= i < len`. An out-of-bounds index
    /// resolves to an empty range.
    pub fn normalize(&self, len: usize) -> NormalizedSlice {
        match *self {
            SliceItem::Range(slice) => slice.normalize(len),
            SliceItem::Index(index) => {
                let size = len as isize;
                let pos = if index < 0 { index + size } else { index };
                if pos >= 0 && pos < size {
                    NormalizedSlice {
                        start: pos,
                        stop: pos + 1,
                        step: 1,
                        out_of_bounds: false,
                    }
                } else {
                    NormalizedSlice {
                        start: size,
                        stop: size,
                        step: 1,
                        out_of_bounds: true,
                    }
                }
            }
        }
    }
}

// This conversion exists to avoid ambiguity when slicing with a numeric
// literal of unspecified type, which defaults to `i32`.
impl From<i32> for SliceItem {
    #[inline]
    fn from(value: i32) -> Self {
        SliceItem::Index(value as isize)
    }
}

impl From<isize> for SliceItem {
    #[inline]
    fn from(value: isize) -> Self {
        SliceItem::Index(value)
    }
}

impl From<usize> for SliceItem {
    #[inline]
    fn from(value: usize) -> Self {
        SliceItem::Index(value as isize)
    }
}

impl From<Option<SliceItem>> for SliceItem {
    /// Convert the external form of a slice entry, where `None` selects the
    /// whole dimension.
    fn from(value: Option<SliceItem>) -> Self {
        value.unwrap_or_else(SliceItem::full_range)
    }
}

impl<R> From<R> for SliceItem
where
    R: Into<Slice>,
{
    fn from(value: R) -> Self {
        SliceItem::Range(value.into())
    }
}

/// A slice specification with one entry per dimension of the array being
/// sliced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultiSlice {
    items: SmallVec<[SliceItem; 5]>,
}

impl MultiSlice {
    /// Create a multi-slice from a sequence of items.
    pub fn new<I: Into<SliceItem>>(items: impl IntoIterator<Item = I>) -> MultiSlice {
        MultiSlice {
            items: items.into_iter().map(|item| item.into()).collect(),
        }
    }

    /// Create a multi-slice which selects every element of an array with
    /// `ndim` dimensions.
    pub fn full(ndim: usize) -> MultiSlice {
        MultiSlice {
            items: SmallVec::from_elem(SliceItem::full_range(), ndim),
        }
    }

    /// Return the number of entries, which must match the rank of the array
    /// being sliced.
    pub fn ndim(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[SliceItem] {
        &self.items
    }

    /// Replace the entry for dimension `dim`.
    pub fn set(&mut self, dim: usize, item: impl Into<SliceItem>) {
        self.items[dim] = item.into();
    }

    /// Return the indices of the dimensions which are kept (not reduced).
    pub fn nonreduced_dims(&self) -> SmallVec<[usize; 5]> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_reduce())
            .map(|(dim, _)| dim)
            .collect()
    }
}

impl From<Vec<SliceItem>> for MultiSlice {
    fn from(items: Vec<SliceItem>) -> MultiSlice {
        MultiSlice {
            items: items.into(),
        }
    }
}

impl From<&[SliceItem]> for MultiSlice {
    fn from(items: &[SliceItem]) -> MultiSlice {
        MultiSlice {
            items: items.into(),
        }
    }
}

impl<const N: usize> From<[SliceItem; N]> for MultiSlice {
    fn from(items: [SliceItem; N]) -> MultiSlice {
        MultiSlice {
            items: items.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndstride_testing::TestCases;

    use super::{MultiSlice, NormalizedSlice, Slice, SliceItem};

    #[test]
    fn test_slice_item_conversions() {
        assert_eq!(SliceItem::from(2), SliceItem::Index(2));
        assert_eq!(SliceItem::from(-1isize), SliceItem::Index(-1));
        assert_eq!(
            SliceItem::from(1..3),
            SliceItem::Range(Slice::new(Some(1), Some(3), None))
        );
        assert_eq!(
            SliceItem::from(..3),
            SliceItem::Range(Slice::new(None, Some(3), None))
        );
        assert_eq!(
            SliceItem::from(2..),
            SliceItem::Range(Slice::new(Some(2), None, None))
        );
        assert_eq!(SliceItem::from(..), SliceItem::full_range());
        assert_eq!(SliceItem::from(None::<SliceItem>), SliceItem::full_range());
        assert_eq!(
            SliceItem::from(Some(SliceItem::Index(1))),
            SliceItem::Index(1)
        );
    }

    #[test]
    fn test_normalize_slice() {
        #[derive(Debug)]
        struct Case {
            item: SliceItem,
            len: usize,
            expected: (isize, isize, isize),
            size: usize,
            out_of_bounds: bool,
        }

        let cases = [
            Case {
                item: SliceItem::full_range(),
                len: 5,
                expected: (0, 5, 1),
                size: 5,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(1), Some(4), Some(2)),
                len: 5,
                expected: (1, 4, 2),
                size: 2,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(-2), None, None),
                len: 5,
                expected: (3, 5, 1),
                size: 2,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(5), None, None),
                len: 5,
                expected: (5, 5, 1),
                size: 0,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(2), Some(10), None),
                len: 5,
                expected: (2, 5, 1),
                size: 3,
                out_of_bounds: true,
            },
            Case {
                item: SliceItem::range(Some(-7), Some(2), None),
                len: 5,
                expected: (0, 2, 1),
                size: 2,
                out_of_bounds: true,
            },
            Case {
                item: SliceItem::range(None, None, Some(-1)),
                len: 5,
                expected: (4, -1, -1),
                size: 5,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(-1), Some(0), Some(-2)),
                len: 5,
                expected: (4, 0, -2),
                size: 2,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::range(Some(5), None, Some(-1)),
                len: 5,
                expected: (4, -1, -1),
                size: 5,
                out_of_bounds: true,
            },
            Case {
                item: SliceItem::range(Some(1), Some(3), Some(-1)),
                len: 5,
                expected: (1, 3, -1),
                size: 0,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::Index(-1),
                len: 5,
                expected: (4, 5, 1),
                size: 1,
                out_of_bounds: false,
            },
            Case {
                item: SliceItem::Index(5),
                len: 5,
                expected: (5, 5, 1),
                size: 0,
                out_of_bounds: true,
            },
            Case {
                item: SliceItem::Index(0),
                len: 0,
                expected: (0, 0, 1),
                size: 0,
                out_of_bounds: true,
            },
        ];

        cases.test_each(|case| {
            let NormalizedSlice {
                start,
                stop,
                step,
                out_of_bounds,
            } = case.item.normalize(case.len);
            assert_eq!((start, stop, step), case.expected);
            assert_eq!(out_of_bounds, case.out_of_bounds);
            assert_eq!(case.item.normalize(case.len).len(), case.size);
        })
    }

    #[test]
    #[should_panic(expected = "Slice step cannot be 0")]
    fn test_slice_zero_step() {
        Slice::new(None, None, Some(0));
    }

    #[test]
    fn test_multi_slice() {
        let mut slice = MultiSlice::full(3);
        assert_eq!(slice.ndim(), 3);
        slice.set(1, 2);
        assert_eq!(slice.nonreduced_dims().as_slice(), &[0, 2]);

        let slice = MultiSlice::new([SliceItem::Index(0), (1..2).into(), (..).into()]);
        assert_eq!(slice.items()[1], SliceItem::range(Some(1), Some(2), None));
        assert_eq!(slice.nonreduced_dims().as_slice(), &[1, 2]);

        let slice = MultiSlice::new([None, Some(SliceItem::Index(3))]);
        assert_eq!(
            slice.items(),
            &[SliceItem::full_range(), SliceItem::Index(3)]
        );
    }
}
