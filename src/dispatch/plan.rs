use std::array;

use smallvec::{smallvec, SmallVec};

use super::MAX_DIMS;
use crate::layout::{numel, DynShape, Layout, Order, StrideOrder};
use crate::loop_order::loop_order;

/// Traversal strategy chosen for an elementwise operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Zero-rank arrays, which have exactly one element.
    ZeroRank,

    /// Arrays with no elements. The callback is not invoked.
    Empty,

    /// A single strided loop over a one-dimensional array.
    OneDim,

    /// All dimensions except one have size one, so the arrays are traversed
    /// as if they were one-dimensional.
    SingletonCollapse,

    /// Every array's elements fill a contiguous span of its buffer in the
    /// same order, so the arrays are traversed as one-dimensional arrays
    /// with unit stride.
    ContiguousCollapse,

    /// Nested loops, with dimensions reordered for sequential access.
    Nested,

    /// Nested loops over tiles, used when some strides have mixed signs.
    Blocked,

    /// Compute subscripts for each element. Used for arrays with more than
    /// [`MAX_DIMS`] dimensions.
    Generic,
}

/// Loop bounds and strides for co-iterating `K` arrays.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Plan<const K: usize> {
    pub strategy: Strategy,

    /// Size of each loop. For nested and blocked traversals this is ordered
    /// from innermost to outermost. For generic traversals it is the shape
    /// of the arrays.
    pub shape: DynShape,

    /// Stride of each array in each loop of `shape`.
    pub strides: SmallVec<[[isize; K]; 5]>,

    /// Offset of the first element visited in each array.
    pub offsets: [isize; K],

    /// Order used to enumerate elements in generic traversals.
    pub order: Order,
}

/// Return true if the arrays can be traversed together as contiguous 1D
/// arrays.
///
/// For a single array it is enough that its elements fill a contiguous
/// span. When co-iterating, elements at the same position in each span must
/// also have the same subscripts. This holds when every array is stored in
/// the same, known order.
fn can_collapse_contiguous<const K: usize>(layouts: &[&Layout; K]) -> bool {
    if !layouts.iter().all(|layout| layout.is_contiguous()) {
        return false;
    }
    if K == 1 {
        return true;
    }

    let orders: [StrideOrder; K] = layouts.map(|layout| layout.stride_order());
    orders.iter().all(|&order| order != StrideOrder::None)
        && orders
            .iter()
            .enumerate()
            .all(|(i, a)| orders[i + 1..].iter().all(|&b| a.compatible_with(b)))
}

/// Choose a traversal strategy for co-iterating arrays with the given
/// layouts, which must have the same shape.
pub(crate) fn plan<const K: usize>(layouts: [&Layout; K]) -> Plan<K> {
    let shape = layouts[0].shape();
    let ndim = shape.len();
    let order = layouts[0].order();
    let offsets = layouts.map(|layout| layout.offset() as isize);
    let dim_strides = |dim: usize| -> [isize; K] { layouts.map(|layout| layout.stride(dim)) };

    let make_plan = |strategy: Strategy,
                     shape: DynShape,
                     strides: SmallVec<[[isize; K]; 5]>|
     -> Plan<K> {
        Plan {
            strategy,
            shape,
            strides,
            offsets,
            order,
        }
    };

    if ndim == 0 {
        return make_plan(Strategy::ZeroRank, DynShape::new(), SmallVec::new());
    }
    if numel(shape) == 0 {
        return make_plan(Strategy::Empty, shape.into(), SmallVec::new());
    }
    if ndim == 1 {
        return make_plan(Strategy::OneDim, shape.into(), smallvec![dim_strides(0)]);
    }

    let mut non_singleton = (0..ndim).filter(|&dim| shape[dim] != 1);
    if let (Some(dim), None) = (non_singleton.next(), non_singleton.next()) {
        return make_plan(
            Strategy::SingletonCollapse,
            smallvec![shape[dim]],
            smallvec![dim_strides(dim)],
        );
    }

    if can_collapse_contiguous(&layouts) {
        let directions = layouts.map(|layout| layout.iteration_direction());
        let starts = array::from_fn(|k| {
            let (min, max) = layouts[k].min_max_offset();
            if directions[k] > 0 {
                min as isize
            } else {
                max as isize
            }
        });
        return Plan {
            strategy: Strategy::ContiguousCollapse,
            shape: smallvec![numel(shape)],
            strides: smallvec![directions],
            offsets: starts,
            order,
        };
    }

    if ndim <= MAX_DIMS {
        let ordered = layouts
            .iter()
            .all(|layout| layout.iteration_direction() != 0);
        let strategy = if ordered {
            Strategy::Nested
        } else {
            Strategy::Blocked
        };

        let strides_list = layouts.map(|layout| layout.strides());
        let loops = loop_order(shape, &strides_list);
        let strides = (0..ndim)
            .map(|i| array::from_fn(|k| loops.strides[k][i]))
            .collect();
        return make_plan(strategy, loops.shape, strides);
    }

    make_plan(
        Strategy::Generic,
        shape.into(),
        (0..ndim).map(dim_strides).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{plan, Strategy};
    use crate::layout::{Layout, Order};

    fn layout(shape: &[usize], strides: &[isize], offset: usize) -> Layout {
        Layout::from_parts(shape, strides, offset, Order::RowMajor).unwrap()
    }

    #[test]
    fn test_plan_collapse_negative_strides() {
        // A fully reversed row-major array, paired with a forward one.
        let x = layout(&[2, 3], &[-3, -1], 5);
        let y = layout(&[2, 3], &[3, 1], 0);

        let p = plan([&x, &y]);
        assert_eq!(p.strategy, Strategy::ContiguousCollapse);
        assert_eq!(p.shape.as_slice(), &[6]);
        assert_eq!(p.strides.as_slice(), &[[-1, 1]]);
        assert_eq!(p.offsets, [5, 0]);
    }

    #[test]
    fn test_plan_nested_order() {
        // Column-major input and row-major output.
        let x = layout(&[2, 3], &[1, 2], 0);
        let y = layout(&[2, 3], &[3, 1], 0);

        let p = plan([&x, &y]);
        assert_eq!(p.strategy, Strategy::Nested);
        assert_eq!(p.shape.as_slice(), &[2, 3]);
        assert_eq!(p.strides.as_slice(), &[[1, 3], [2, 1]]);
    }

    #[test]
    fn test_plan_disorganized_arrays_are_not_collapsed() {
        // Both arrays fill their buffers, but in different permutations.
        let x = layout(&[2, 3, 4], &[3, 1, 6], 0);
        let y = layout(&[2, 3, 4], &[1, 8, 2], 0);

        let p = plan([&x, &y]);
        assert_eq!(p.strategy, Strategy::Nested);

        // A single disorganized array can still be collapsed.
        let p = plan([&x]);
        assert_eq!(p.strategy, Strategy::ContiguousCollapse);
    }

    #[test]
    fn test_plan_singleton_collapse() {
        let x = layout(&[1, 4, 1], &[4, 1, 1], 0);
        let p = plan([&x]);
        assert_eq!(p.strategy, Strategy::SingletonCollapse);
        assert_eq!(p.shape.as_slice(), &[4]);
        assert_eq!(p.strides.as_slice(), &[[1]]);
    }
}
