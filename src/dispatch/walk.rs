//! Loops which visit the element offsets described by a [`Plan`].

use std::iter::zip;

use ndstride_base::iter::Tiles;
use smallvec::SmallVec;

use super::plan::{Plan, Strategy};
use crate::index::{linear_index_to_subscripts_into, IndexMode};
use crate::layout::{numel, DynShape};

#[inline(always)]
fn advance<const K: usize>(offsets: &mut [isize; K], strides: &[isize; K]) {
    for (offset, stride) in zip(offsets.iter_mut(), strides) {
        *offset += stride;
    }
}

#[inline(always)]
fn to_offsets<const K: usize>(offsets: [isize; K]) -> [usize; K] {
    offsets.map(|offset| offset as usize)
}

/// Call `f` with the buffer offsets of each array, for every element visited
/// by `plan`.
///
/// `block` is the tile size used by blocked traversals.
pub(crate) fn walk<const K: usize, F: FnMut([usize; K])>(plan: &Plan<K>, block: usize, mut f: F) {
    match plan.strategy {
        Strategy::ZeroRank => f(to_offsets(plan.offsets)),
        Strategy::Empty => {}
        Strategy::OneDim
        | Strategy::SingletonCollapse
        | Strategy::ContiguousCollapse
        | Strategy::Nested => walk_nested(&plan.shape, &plan.strides, plan.offsets, &mut f),
        Strategy::Blocked => walk_blocked(plan, block, &mut f),
        Strategy::Generic => walk_generic(plan, &mut f),
    }
}

/// Visit every element of a region using nested loops. `shape` and
/// `strides` are ordered from innermost to outermost loop.
fn walk_nested<const K: usize, F: FnMut([usize; K])>(
    shape: &[usize],
    strides: &[[isize; K]],
    offsets: [isize; K],
    f: &mut F,
) {
    match shape.len() {
        1 => walk_1d(shape[0], &strides[0], offsets, f),
        2 => walk_2d([shape[0], shape[1]], [strides[0], strides[1]], offsets, f),
        3 => walk_3d(
            [shape[0], shape[1], shape[2]],
            [strides[0], strides[1], strides[2]],
            offsets,
            f,
        ),
        _ => walk_odometer(shape, strides, offsets, f),
    }
}

#[inline(always)]
fn walk_1d<const K: usize, F: FnMut([usize; K])>(
    size: usize,
    strides: &[isize; K],
    mut offsets: [isize; K],
    f: &mut F,
) {
    for _ in 0..size {
        f(to_offsets(offsets));
        advance(&mut offsets, strides);
    }
}

fn walk_2d<const K: usize, F: FnMut([usize; K])>(
    shape: [usize; 2],
    strides: [[isize; K]; 2],
    mut offsets: [isize; K],
    f: &mut F,
) {
    for _ in 0..shape[1] {
        walk_1d(shape[0], &strides[0], offsets, f);
        advance(&mut offsets, &strides[1]);
    }
}

fn walk_3d<const K: usize, F: FnMut([usize; K])>(
    shape: [usize; 3],
    strides: [[isize; K]; 3],
    mut offsets: [isize; K],
    f: &mut F,
) {
    for _ in 0..shape[2] {
        walk_2d([shape[0], shape[1]], [strides[0], strides[1]], offsets, f);
        advance(&mut offsets, &strides[2]);
    }
}

/// Nested loops for any number of dimensions. The innermost loop runs
/// directly and outer loops advance like an odometer.
fn walk_odometer<const K: usize, F: FnMut([usize; K])>(
    shape: &[usize],
    strides: &[[isize; K]],
    mut offsets: [isize; K],
    f: &mut F,
) {
    let ndim = shape.len();
    if ndim == 0 {
        f(to_offsets(offsets));
        return;
    }

    let mut index: DynShape = SmallVec::from_elem(0, ndim);
    loop {
        walk_1d(shape[0], &strides[0], offsets, f);

        let mut dim = 1;
        loop {
            if dim == ndim {
                return;
            }
            index[dim] += 1;
            advance(&mut offsets, &strides[dim]);
            if index[dim] < shape[dim] {
                break;
            }

            // Rewind this dimension and carry into the next.
            for (offset, stride) in zip(offsets.iter_mut(), &strides[dim]) {
                *offset -= stride * shape[dim] as isize;
            }
            index[dim] = 0;
            dim += 1;
        }
    }
}

/// Visit the region in tiles of `block` indices per dimension, using nested
/// loops within each tile.
fn walk_blocked<const K: usize, F: FnMut([usize; K])>(plan: &Plan<K>, block: usize, f: &mut F) {
    let mut tiles = Tiles::new(&plan.shape, block);
    let mut tile_shape = DynShape::with_capacity(plan.shape.len());

    while let Some(tile) = tiles.next_tile() {
        let mut offsets = plan.offsets;
        tile_shape.clear();
        for (range, strides) in zip(tile, &plan.strides) {
            for (offset, stride) in zip(offsets.iter_mut(), strides) {
                *offset += stride * range.start as isize;
            }
            tile_shape.push(range.len());
        }
        walk_nested(&tile_shape, &plan.strides, offsets, f);
    }
}

/// Visit each element by converting its linear index to subscripts.
fn walk_generic<const K: usize, F: FnMut([usize; K])>(plan: &Plan<K>, f: &mut F) {
    let shape = &plan.shape;
    let mut subscripts: DynShape = SmallVec::from_elem(0, shape.len());

    for index in 0..numel(shape) {
        let resolved = linear_index_to_subscripts_into(
            shape,
            &[],
            0,
            plan.order,
            index as isize,
            IndexMode::Throw,
            &mut subscripts,
        );
        debug_assert!(
            resolved.is_ok(),
            "index {} is outside shape {:?}",
            index,
            shape
        );

        let mut offsets = plan.offsets;
        for (&sub, strides) in zip(&subscripts, &plan.strides) {
            for (offset, stride) in zip(offsets.iter_mut(), strides) {
                *offset += stride * sub as isize;
            }
        }
        f(to_offsets(offsets));
    }
}

#[cfg(test)]
mod tests {
    use ndstride_testing::{reference_offsets, sorted, TestCases};
    use smallvec::SmallVec;

    use super::{walk, walk_odometer};
    use crate::dispatch::plan::{Plan, Strategy};
    use crate::layout::Order;

    #[test]
    fn test_walk_odometer() {
        let shape = [2, 3, 2, 2];
        let strides = [[1], [2], [6], [12]];
        let mut visited = Vec::new();
        walk_odometer(&shape, &strides, [0], &mut |[offset]| visited.push(offset));
        assert_eq!(visited, (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn test_walk_strategies() {
        #[derive(Debug)]
        struct Case {
            strategy: Strategy,
            block: usize,
            order: Order,
        }

        let cases = [
            Case {
                strategy: Strategy::Nested,
                block: 1,
                order: Order::RowMajor,
            },
            Case {
                strategy: Strategy::Blocked,
                block: 1,
                order: Order::RowMajor,
            },
            Case {
                strategy: Strategy::Blocked,
                block: 2,
                order: Order::RowMajor,
            },
            Case {
                strategy: Strategy::Blocked,
                block: 16,
                order: Order::RowMajor,
            },
            Case {
                strategy: Strategy::Generic,
                block: 1,
                order: Order::ColumnMajor,
            },
            Case {
                strategy: Strategy::Generic,
                block: 1,
                order: Order::RowMajor,
            },
        ];

        cases.test_each(|case| {
            // A 3x5 array with reversed rows, in innermost-first loop order.
            let plan = Plan {
                strategy: case.strategy,
                shape: SmallVec::from_slice(&[5, 3]),
                strides: SmallVec::from_slice(&[[1], [-5]]),
                offsets: [10],
                order: case.order,
            };
            let mut visited = Vec::new();
            walk(&plan, case.block, |[offset]| visited.push(offset));

            let expected = reference_offsets(&[3, 5], &[-5, 1], 10);
            assert_eq!(sorted(visited), sorted(expected));
        })
    }
}
