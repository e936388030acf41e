//! Application of elementwise callbacks to every element of one or more
//! arrays.
//!
//! The entry points in this module choose a traversal [`Strategy`] based on
//! the shapes and strides of the arrays involved. Simple layouts are
//! collapsed to a single loop. Other layouts use nested loops ordered for
//! sequential memory access, blocked loops when strides have mixed signs,
//! or a generic per-element traversal for very high-rank arrays.
//!
//! The element access strategy ([`AccessStrategy`](crate::AccessStrategy))
//! of each buffer is resolved once per call, and the loops are compiled
//! separately for each combination.

use std::sync::OnceLock;

use crate::array::NdArray;
use crate::env::env_usize;
use crate::errors::DispatchError;
use crate::storage::{Buffer, ElemAccess};

mod plan;
mod walk;


pub use plan::Strategy;
use plan::{plan, Plan};
use walk::walk;

/// Maximum rank for which nested or blocked loops are used. Arrays with
/// more dimensions use [`Strategy::Generic`].
pub const MAX_DIMS: usize = 10;

/// Default size in bytes of the tiles used by [`Strategy::Blocked`].
pub const DEFAULT_BLOCK_BYTES: usize = 64;

/// Tile size in elements when the tile size in bytes cannot be converted.
const FALLBACK_BLOCK_LEN: usize = 8;

/// Settings which control how elementwise operations traverse arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    /// Size in bytes of one edge of a tile in blocked traversals.
    pub block_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            block_bytes: DEFAULT_BLOCK_BYTES,
        }
    }
}

impl DispatchConfig {
    /// Read settings from the environment.
    ///
    /// `NDSTRIDE_BLOCK_BYTES` sets [`block_bytes`](DispatchConfig::block_bytes).
    pub fn from_env() -> DispatchConfig {
        DispatchConfig {
            block_bytes: env_usize("NDSTRIDE_BLOCK_BYTES", DEFAULT_BLOCK_BYTES),
        }
    }

    /// Return the process-wide settings, which are read from the environment
    /// on first use.
    pub fn global() -> &'static DispatchConfig {
        static CONFIG: OnceLock<DispatchConfig> = OnceLock::new();
        CONFIG.get_or_init(DispatchConfig::from_env)
    }

    /// Return the tile edge length, in elements, for elements of
    /// `elem_size` bytes.
    pub fn block_len(&self, elem_size: usize) -> usize {
        match self.block_bytes.checked_div(elem_size) {
            Some(0) | None => FALLBACK_BLOCK_LEN,
            Some(len) => len,
        }
    }
}

/// Evaluate `$body` with `$acc` bound to the element storage of `$buffer`,
/// so that `$body` is compiled once for each access strategy.
macro_rules! with_access {
    ($buffer:expr, |$acc:ident| $body:expr) => {
        match $buffer {
            Buffer::Direct(data) => {
                let $acc = &**data;
                $body
            }
            Buffer::Accessor(accessor) => {
                let $acc = &**accessor;
                $body
            }
        }
    };
}

fn check_shape(expected: &[usize], actual: &[usize]) -> Result<(), DispatchError> {
    if expected != actual {
        return Err(DispatchError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

fn run_nullary<T, X, F>(plan: &Plan<1>, block: usize, x: &X, mut f: F)
where
    X: ElemAccess<T> + ?Sized,
    F: FnMut() -> T,
{
    walk(plan, block, |[ix]| x.store(ix, f()));
}

fn run_unary<T, U, X, Y, F>(plan: &Plan<2>, block: usize, x: &X, y: &Y, mut f: F)
where
    X: ElemAccess<T> + ?Sized,
    Y: ElemAccess<U> + ?Sized,
    F: FnMut(T) -> U,
{
    walk(plan, block, |[ix, iy]| y.store(iy, f(x.load(ix))));
}

fn run_binary<T, U, V, X, Y, Z, F>(plan: &Plan<3>, block: usize, x: &X, y: &Y, z: &Z, mut f: F)
where
    X: ElemAccess<T> + ?Sized,
    Y: ElemAccess<U> + ?Sized,
    Z: ElemAccess<V> + ?Sized,
    F: FnMut(T, U) -> V,
{
    walk(plan, block, |[ix, iy, iz]| {
        z.store(iz, f(x.load(ix), y.load(iy)))
    });
}

/// Set every element of `x` to the value returned by `f`.
///
/// Returns the traversal strategy used. See [`nullary_with_config`].
pub fn nullary<T: Copy>(x: &NdArray<T>, f: impl FnMut() -> T) -> Result<Strategy, DispatchError> {
    nullary_with_config(x, f, DispatchConfig::global())
}

/// Variant of [`nullary`] which uses explicit settings.
///
/// Fails if `x` is read-only. The order in which elements are visited is
/// unspecified.
pub fn nullary_with_config<T: Copy>(
    x: &NdArray<T>,
    f: impl FnMut() -> T,
    config: &DispatchConfig,
) -> Result<Strategy, DispatchError> {
    if x.is_read_only() {
        return Err(DispatchError::ReadOnly);
    }

    let plan = plan([x.layout()]);
    let block = config.block_len(std::mem::size_of::<T>());
    tracing::trace!(
        "nullary dispatch: strategy {:?}, access {:?}, shape {:?}",
        plan.strategy,
        x.strategy(),
        x.shape()
    );

    with_access!(x.buffer(), |xa| run_nullary(&plan, block, xa, f));
    Ok(plan.strategy)
}

/// Set each element of `y` to `f(x)`, where `x` is the element at the same
/// position in `x`.
///
/// Returns the traversal strategy used. See [`unary_with_config`].
pub fn unary<T: Copy, U: Copy>(
    x: &NdArray<T>,
    y: &NdArray<U>,
    f: impl FnMut(T) -> U,
) -> Result<Strategy, DispatchError> {
    unary_with_config(x, y, f, DispatchConfig::global())
}

/// Variant of [`unary`] which uses explicit settings.
///
/// Fails if `y` is read-only or the arrays have different shapes. `x` and
/// `y` may be views of the same buffer.
pub fn unary_with_config<T: Copy, U: Copy>(
    x: &NdArray<T>,
    y: &NdArray<U>,
    f: impl FnMut(T) -> U,
    config: &DispatchConfig,
) -> Result<Strategy, DispatchError> {
    if y.is_read_only() {
        return Err(DispatchError::ReadOnly);
    }
    check_shape(x.shape(), y.shape())?;

    let plan = plan([x.layout(), y.layout()]);
    let block = config.block_len(std::mem::size_of::<T>().max(std::mem::size_of::<U>()));
    tracing::trace!(
        "unary dispatch: strategy {:?}, access {:?}/{:?}, shape {:?}",
        plan.strategy,
        x.strategy(),
        y.strategy(),
        x.shape()
    );

    with_access!(x.buffer(), |xa| {
        with_access!(y.buffer(), |ya| run_unary(&plan, block, xa, ya, f))
    });
    Ok(plan.strategy)
}

/// Set each element of `z` to `f(x, y)`, where `x` and `y` are the elements
/// at the same position in `x` and `y`.
///
/// Returns the traversal strategy used. See [`binary_with_config`].
pub fn binary<T: Copy, U: Copy, V: Copy>(
    x: &NdArray<T>,
    y: &NdArray<U>,
    z: &NdArray<V>,
    f: impl FnMut(T, U) -> V,
) -> Result<Strategy, DispatchError> {
    binary_with_config(x, y, z, f, DispatchConfig::global())
}

/// Variant of [`binary`] which uses explicit settings.
///
/// Fails if `z` is read-only or the arrays have different shapes. Inputs
/// with different shapes can first be broadcast using
/// [`broadcast_shapes`](crate::broadcast_shapes) and
/// [`maybe_broadcast_array`](crate::maybe_broadcast_array).
pub fn binary_with_config<T: Copy, U: Copy, V: Copy>(
    x: &NdArray<T>,
    y: &NdArray<U>,
    z: &NdArray<V>,
    f: impl FnMut(T, U) -> V,
    config: &DispatchConfig,
) -> Result<Strategy, DispatchError> {
    if z.is_read_only() {
        return Err(DispatchError::ReadOnly);
    }
    check_shape(x.shape(), y.shape())?;
    check_shape(x.shape(), z.shape())?;

    let plan = plan([x.layout(), y.layout(), z.layout()]);
    let elem_size = std::mem::size_of::<T>()
        .max(std::mem::size_of::<U>())
        .max(std::mem::size_of::<V>());
    let block = config.block_len(elem_size);
    tracing::trace!(
        "binary dispatch: strategy {:?}, access {:?}/{:?}/{:?}, shape {:?}",
        plan.strategy,
        x.strategy(),
        y.strategy(),
        z.strategy(),
        x.shape()
    );

    with_access!(x.buffer(), |xa| {
        with_access!(y.buffer(), |ya| {
            with_access!(z.buffer(), |za| run_binary(&plan, block, xa, ya, za, f))
        })
    });
    Ok(plan.strategy)
}
