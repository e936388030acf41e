//! ndstride provides the shape, stride and traversal machinery for strided
//! n-dimensional arrays.
//!
//! # Arrays and layouts
//!
//! An [`NdArray`] is a descriptor which combines a shared [`Buffer`] of
//! elements with a [`Layout`]. The layout holds the size of each dimension,
//! the stride in elements between successive indices of each dimension and
//! the offset of the first element. Strides may be negative (the dimension is
//! traversed backwards) or zero (every index of the dimension maps to the same
//! element).
//!
//! Buffers either hold elements directly, or go through an [`Accessor`] for
//! storage whose logical elements are encoded in some other way, such as
//! [`PairedBuffer`].
//!
//! # Views
//!
//! Slicing ([`slice`], [`slice_dimension`], [`slice_from`], [`slice_to`]),
//! broadcasting ([`broadcast_array`]) and inserting leading dimensions
//! ([`prepend_singleton_dimensions`]) produce new descriptors which share the
//! buffer of the source array. Writes through one view are visible through
//! every other view of the same buffer.
//!
//! # Elementwise operations
//!
//! [`nullary`], [`unary`] and [`binary`] apply a callback to every element of
//! one or more arrays of the same shape. The traversal is chosen from the
//! layouts of the arrays, so that simple layouts collapse to a single loop
//! and other layouts are visited in an order which follows memory.
//!
//! ```
//! use ndstride::{slice, unary, MultiSlice, NdArray, Order, SliceItem};
//!
//! let x = NdArray::from_vec("int32", vec![1, 2, 3, 4, 5, 6], &[2, 3], Order::RowMajor).unwrap();
//!
//! // Select the second row, reversed.
//! let spec = MultiSlice::new([SliceItem::Index(1), SliceItem::range(None, None, Some(-1))]);
//! let row = slice(&x, &spec, true, false).unwrap();
//! assert_eq!(row.to_vec(), [6, 5, 4]);
//!
//! let y = NdArray::from_vec("int32", vec![0; 3], &[3], Order::RowMajor).unwrap();
//! unary(&row, &y, |v| v * 2).unwrap();
//! assert_eq!(y.to_vec(), [12, 10, 8]);
//! ```
//!
//! # Serialization
//!
//! Orders, index modes, layouts and arrays can be serialized and deserialized
//! using [serde](https://serde.rs) if the `serde` feature is enabled. Orders
//! and index modes use their string forms (eg. `"row-major"`, `"clamp"`).
//! Arrays are serialized with their elements in logical row-major order:
//!
//! ```json
//! {
//!   "dtype": "float64",
//!   "shape": [2, 2],
//!   "data": [0.5, 1.0, 1.5, 2.0]
//! }
//! ```

mod array;
pub mod dispatch;
mod env;
pub mod errors;
pub mod index;
pub mod layout;
pub mod loop_order;
pub mod slice_range;
pub mod storage;
mod view;

#[cfg(feature = "serde")]
mod impl_serialize;

pub use array::NdArray;
pub use dispatch::{
    binary, binary_with_config, nullary, nullary_with_config, unary, unary_with_config,
    DispatchConfig, Strategy,
};
pub use index::{
    linear_index_to_subscripts, resolve_index, subscripts_to_linear_index, IndexMode, Subscripts,
};
pub use layout::{shape_to_strides, DynShape, DynStrides, Layout, Order, StrideOrder};
pub use slice_range::{MultiSlice, Slice, SliceItem};
pub use storage::{AccessStrategy, Accessor, Buffer, PairedBuffer};
pub use view::{
    broadcast_array, broadcast_shapes, maybe_broadcast_array, prepend_singleton_dimensions, slice,
    slice_dimension, slice_from, slice_to,
};
