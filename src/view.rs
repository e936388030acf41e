//! Operations which derive new views of an array's buffer without copying
//! elements.
//!
//! Every operation here returns a new [`NdArray`] which shares the input's
//! buffer and data type. Only the layout and writability differ.

use std::iter::{repeat, zip};

use smallvec::SmallVec;

use crate::array::NdArray;
use crate::errors::{BroadcastError, SliceError};
use crate::layout::{numel, shape_to_strides, DynShape, DynStrides, Layout};
use crate::slice_range::{MultiSlice, NormalizedSlice, SliceItem};

/// Return a view of the region of `x` selected by `spec`.
///
/// `spec` must have one item per dimension of `x`. Range items keep their
/// dimension and index items remove it.
///
/// If any item exceeds the bounds of `x` and `strict` is true, this fails
/// with [`SliceError::OutOfBounds`]. Otherwise out-of-bounds ranges are
/// clamped, and an out-of-bounds index produces an empty view, since no
/// clamped index would select the requested element. When every dimension
/// is indexed there is no empty view of the resulting zero-rank shape, so an
/// out-of-bounds index is reported as an error in that case as well. This is
/// the only case where a non-strict slice fails because of its bounds.
///
/// Empty results share the buffer of `x` but have contiguous strides and a
/// zero offset. The result is read-only unless `writable` is true.
pub fn slice<T>(
    x: &NdArray<T>,
    spec: &MultiSlice,
    strict: bool,
    writable: bool,
) -> Result<NdArray<T>, SliceError> {
    let layout = x.layout();
    if spec.ndim() != layout.ndim() {
        return Err(SliceError::DimensionMismatch {
            ndim: layout.ndim(),
            slice_dims: spec.ndim(),
        });
    }

    if layout.ndim() == 0 {
        return Ok(x.with_layout(layout.clone(), !writable));
    }

    let mut ranges: SmallVec<[NormalizedSlice; 5]> = SmallVec::with_capacity(spec.ndim());
    let mut index_out_of_bounds = None;
    for (dim, (item, &size)) in zip(spec.items(), layout.shape()).enumerate() {
        let range = item.normalize(size);
        if range.out_of_bounds {
            if strict {
                return Err(SliceError::OutOfBounds { dim });
            }
            if item.is_reduce() && index_out_of_bounds.is_none() {
                index_out_of_bounds = Some(dim);
            }
        }
        ranges.push(range);
    }

    let kept_dims = spec.nonreduced_dims();
    let shape: DynShape = match index_out_of_bounds {
        Some(dim) if kept_dims.is_empty() => return Err(SliceError::OutOfBounds { dim }),
        Some(_) => SmallVec::from_elem(0, kept_dims.len()),
        None => kept_dims.iter().map(|&dim| ranges[dim].len()).collect(),
    };

    if numel(&shape) == 0 {
        let strides = shape_to_strides(&shape, layout.order());
        let empty = Layout::from_parts_unchecked(shape, strides, 0, layout.order());
        return Ok(x.with_layout(empty, !writable));
    }

    let offset = zip(&ranges, layout.strides())
        .fold(layout.offset() as isize, |offset, (range, &stride)| {
            offset + stride * range.start
        });
    let strides: DynStrides = kept_dims
        .iter()
        .map(|&dim| layout.stride(dim) * ranges[dim].step)
        .collect();

    // Every selected index is within the input's bounds, so the new minimum
    // offset is at least the input's.
    debug_assert!(offset >= 0);
    let sliced = Layout::from_parts_unchecked(shape, strides, offset as usize, layout.order());
    Ok(x.with_layout(sliced, !writable))
}

/// Slice a single dimension of `x`, keeping other dimensions whole.
///
/// A negative `dim` counts back from the last dimension.
pub fn slice_dimension<T>(
    x: &NdArray<T>,
    dim: isize,
    item: impl Into<SliceItem>,
    strict: bool,
    writable: bool,
) -> Result<NdArray<T>, SliceError> {
    let ndim = x.ndim();
    let resolved = if dim < 0 { dim + ndim as isize } else { dim };
    if resolved < 0 || resolved >= ndim as isize {
        return Err(SliceError::InvalidDimension { dim, ndim });
    }

    let mut spec = MultiSlice::full(ndim);
    spec.set(resolved as usize, item);
    slice(x, &spec, strict, writable)
}

/// Slice each dimension of `x` from a starting index to its end.
///
/// `starts` has one entry per dimension. `None` or a start of zero selects
/// the whole dimension.
pub fn slice_from<T>(
    x: &NdArray<T>,
    starts: &[Option<isize>],
    strict: bool,
    writable: bool,
) -> Result<NdArray<T>, SliceError> {
    let spec = bounds_to_multi_slice(x, starts, |start| match start {
        Some(0) | None => SliceItem::full_range(),
        Some(start) => SliceItem::range(Some(start), None, None),
    })?;
    slice(x, &spec, strict, writable)
}

/// Slice each dimension of `x` from its start up to (but excluding) a stop
/// index.
///
/// `stops` has one entry per dimension. `None` selects the whole dimension.
pub fn slice_to<T>(
    x: &NdArray<T>,
    stops: &[Option<isize>],
    strict: bool,
    writable: bool,
) -> Result<NdArray<T>, SliceError> {
    let spec = bounds_to_multi_slice(x, stops, |stop| match stop {
        None => SliceItem::full_range(),
        Some(stop) => SliceItem::range(None, Some(stop), None),
    })?;
    slice(x, &spec, strict, writable)
}

fn bounds_to_multi_slice<T>(
    x: &NdArray<T>,
    bounds: &[Option<isize>],
    to_item: impl Fn(Option<isize>) -> SliceItem,
) -> Result<MultiSlice, SliceError> {
    if bounds.len() != x.ndim() {
        return Err(SliceError::DimensionMismatch {
            ndim: x.ndim(),
            slice_dims: bounds.len(),
        });
    }
    Ok(MultiSlice::new(bounds.iter().map(|&bound| to_item(bound))))
}

/// Return a view of `x` with `n` size-one dimensions inserted at the start.
///
/// The new dimensions use the stride of the current first dimension, or 1
/// if `x` is zero-rank. Since only index zero is valid for a size-one
/// dimension, the choice of stride does not affect which elements are
/// visited.
pub fn prepend_singleton_dimensions<T>(x: &NdArray<T>, n: usize) -> NdArray<T> {
    let layout = x.layout();
    let stride = layout.strides().first().copied().unwrap_or(1);

    let shape: DynShape = repeat(1).take(n).chain(layout.shape().iter().copied()).collect();
    let strides: DynStrides = repeat(stride)
        .take(n)
        .chain(layout.strides().iter().copied())
        .collect();

    let expanded =
        Layout::from_parts_unchecked(shape, strides, layout.offset(), layout.order());
    x.with_layout(expanded, x.is_read_only())
}

/// Return a read-only view of `x` broadcast to `shape`.
///
/// Dimensions are aligned from the right. Each dimension of `x` must either
/// match the target size or be 1, in which case it is repeated using a zero
/// stride. Leading dimensions missing from `x` are also repeated.
pub fn broadcast_array<T>(x: &NdArray<T>, shape: &[usize]) -> Result<NdArray<T>, BroadcastError> {
    let layout = x.layout();
    let error = || BroadcastError {
        from: layout.shape().to_vec(),
        to: shape.to_vec(),
    };

    if layout.ndim() > shape.len() {
        return Err(error());
    }
    let pad = shape.len() - layout.ndim();

    let mut strides = DynStrides::with_capacity(shape.len());
    strides.extend(repeat(0).take(pad));
    for (&to_size, (&size, &stride)) in zip(&shape[pad..], zip(layout.shape(), layout.strides())) {
        if size == to_size {
            strides.push(stride);
        } else if size == 1 {
            strides.push(0);
        } else {
            return Err(error());
        }
    }

    let broadcast =
        Layout::from_parts_unchecked(shape.into(), strides, layout.offset(), layout.order());
    Ok(x.with_layout(broadcast, true))
}

/// Broadcast `x` to `shape`, or return a clone of `x` if it already has that
/// shape.
///
/// Unlike [`broadcast_array`], the result keeps the writability of `x` when
/// no broadcasting is needed.
pub fn maybe_broadcast_array<T>(
    x: &NdArray<T>,
    shape: &[usize],
) -> Result<NdArray<T>, BroadcastError> {
    if x.shape() == shape {
        Ok(x.clone())
    } else {
        broadcast_array(x, shape)
    }
}

/// Return the shape which results from broadcasting arrays with the given
/// shapes against each other.
///
/// Shapes are aligned from the right. In each position the sizes must be
/// equal, or all but one must be 1.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<DynShape, BroadcastError> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out: DynShape = SmallVec::from_elem(1, ndim);

    for shape in shapes {
        let pad = ndim - shape.len();
        for (out_size, &size) in out[pad..].iter_mut().zip(shape.iter()) {
            if *out_size == 1 {
                *out_size = size;
            } else if size != 1 && size != *out_size {
                return Err(BroadcastError {
                    from: shape.to_vec(),
                    to: out.to_vec(),
                });
            }
        }
    }

    Ok(out)
}
