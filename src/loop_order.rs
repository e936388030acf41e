//! Choice of dimension order when co-iterating arrays.
//!
//! Elementwise operations produce the same result whatever order dimensions
//! are visited in, so the traversal can be rearranged to follow memory
//! order. The optimizer picks one array's strides as a sort key and orders
//! dimensions so that the smallest key stride is innermost.

use smallvec::SmallVec;

use crate::layout::{strides_to_order, DynShape, DynStrides, StrideOrder};

/// Number of [`StrideOrder`] classification buckets.
const N_BUCKETS: usize = 4;

/// Dimension order chosen by [`loop_order`].
///
/// All vectors are ordered from the innermost (fastest varying) loop to the
/// outermost.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopOrder {
    /// Permutation of the original dimensions. `perm[i]` is the original
    /// dimension visited by loop `i`.
    pub perm: SmallVec<[usize; 5]>,

    /// Shape permuted by `perm`.
    pub shape: DynShape,

    /// Each array's strides permuted by `perm`.
    pub strides: SmallVec<[DynStrides; 3]>,
}

/// Return the index of the array whose strides are used as the sort key.
fn key_array(strides_list: &[&[isize]]) -> usize {
    let mut buckets: [SmallVec<[usize; 3]>; N_BUCKETS] = Default::default();
    for (i, strides) in strides_list.iter().enumerate() {
        buckets[strides_to_order(strides).bucket()].push(i);
    }

    let n_arrays = strides_list.len();
    let disorganized = buckets[StrideOrder::None.bucket()].len();

    if disorganized == n_arrays {
        // No array is meaningfully better than any other.
        return 0;
    }

    if disorganized == n_arrays - 1 {
        // Exactly one array has an organized layout.
        return buckets[1..]
            .iter()
            .find_map(|bucket| bucket.first().copied())
            .unwrap_or(0);
    }

    // Pick the most common classification. Ties go to the later bucket in
    // scan order.
    let mut max = disorganized;
    let mut best = 0;
    for (i, bucket) in buckets.iter().enumerate().skip(1) {
        if bucket.len() >= max {
            max = bucket.len();
            best = i;
        }
    }
    buckets[best][0]
}

/// Return a permutation of `0..key.len()` which sorts dimensions by
/// ascending absolute stride in `key`.
///
/// This is a stable insertion sort, which is efficient for the small
/// dimension counts that arrays typically have.
fn sort_dims_by_stride(key: &[isize]) -> SmallVec<[usize; 5]> {
    let mut perm: SmallVec<[usize; 5]> = (0..key.len()).collect();
    for i in 1..perm.len() {
        let dim = perm[i];
        let stride = key[dim].unsigned_abs();
        let mut j = i;
        while j > 0 && key[perm[j - 1]].unsigned_abs() > stride {
            perm[j] = perm[j - 1];
            j -= 1;
        }
        perm[j] = dim;
    }
    perm
}

fn permute<T: Copy>(values: &[T], perm: &[usize]) -> SmallVec<[T; 5]> {
    perm.iter().map(|&dim| values[dim]).collect()
}

/// Compute a loop order for arrays with the given `shape` and strides.
///
/// `strides_list` typically contains the strides of two or three arrays
/// (eg. the inputs and output of a binary operation). Each entry must have
/// the same length as `shape`.
///
/// The permutation is a heuristic: it maximizes sequential access for the
/// array chosen as the sort key, which is the array whose layout
/// classification is shared by the most arrays.
///
/// Panics if `strides_list` is empty.
pub fn loop_order(shape: &[usize], strides_list: &[&[isize]]) -> LoopOrder {
    assert!(!strides_list.is_empty(), "at least one array is required");
    debug_assert!(strides_list.iter().all(|s| s.len() == shape.len()));

    let key = strides_list[key_array(strides_list)];
    let perm = sort_dims_by_stride(key);

    LoopOrder {
        shape: permute(shape, &perm),
        strides: strides_list.iter().map(|s| permute(s, &perm)).collect(),
        perm,
    }
}

/// Compute a loop order for a single array, such as the output of a nullary
/// operation.
pub fn nullary_loop_order(shape: &[usize], strides: &[isize]) -> LoopOrder {
    loop_order(shape, &[strides])
}
