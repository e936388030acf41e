use std::rc::Rc;

use crate::errors::{ElementError, LayoutError};
use crate::index::IndexMode;
use crate::layout::{numel, Layout, Order};
use crate::storage::{AccessStrategy, Accessor, Buffer};

/// Descriptor for an n-dimensional view of a shared buffer.
///
/// An `NdArray` combines a [`Buffer`] with a [`Layout`] that maps subscripts
/// to buffer offsets, a data type tag and a writability flag. Cloning an
/// array, or deriving a new view via slicing or broadcasting, creates a new
/// descriptor which shares the same buffer. Writes through one view are
/// visible through all others.
///
/// The data type is an opaque tag which is carried through to derived views
/// but is not interpreted.
#[derive(Debug)]
pub struct NdArray<T> {
    dtype: Rc<str>,
    buffer: Buffer<T>,
    layout: Layout,
    read_only: bool,
}

impl<T> Clone for NdArray<T> {
    fn clone(&self) -> Self {
        NdArray {
            dtype: self.dtype.clone(),
            buffer: self.buffer.clone(),
            layout: self.layout.clone(),
            read_only: self.read_only,
        }
    }
}

impl<T: Copy> NdArray<T> {
    /// Create a writable array with contiguous strides from a vector of
    /// elements.
    ///
    /// Fails if the length of `data` does not match the product of `shape`.
    pub fn from_vec(
        dtype: &str,
        data: Vec<T>,
        shape: &[usize],
        order: Order,
    ) -> Result<NdArray<T>, LayoutError> {
        let numel = numel(shape);
        if data.len() != numel {
            return Err(LayoutError::StorageLengthMismatch {
                len: data.len(),
                numel,
            });
        }
        Ok(NdArray {
            dtype: dtype.into(),
            buffer: Buffer::from_vec(data),
            layout: Layout::from_shape(shape, order),
            read_only: false,
        })
    }

    /// Create a zero-rank array holding a single value.
    pub fn from_scalar(dtype: &str, value: T) -> NdArray<T> {
        NdArray {
            dtype: dtype.into(),
            buffer: Buffer::from_vec(vec![value]),
            layout: Layout::from_shape(&[], Order::RowMajor),
            read_only: false,
        }
    }

    /// Create a writable array with contiguous strides whose elements are
    /// read and written using `accessor`.
    ///
    /// Fails if the accessor's length does not match the product of `shape`.
    pub fn from_accessor<A: Accessor<Elem = T> + 'static>(
        dtype: &str,
        accessor: A,
        shape: &[usize],
        order: Order,
    ) -> Result<NdArray<T>, LayoutError> {
        let numel = numel(shape);
        if accessor.len() != numel {
            return Err(LayoutError::StorageLengthMismatch {
                len: accessor.len(),
                numel,
            });
        }
        Ok(NdArray {
            dtype: dtype.into(),
            buffer: Buffer::from_accessor(accessor),
            layout: Layout::from_shape(shape, order),
            read_only: false,
        })
    }

    /// Create an array from an existing buffer and layout.
    ///
    /// Fails if the layout reaches beyond the end of the buffer.
    pub fn from_parts(
        dtype: &str,
        buffer: Buffer<T>,
        layout: Layout,
        read_only: bool,
    ) -> Result<NdArray<T>, LayoutError> {
        if buffer.len() < layout.min_data_len() {
            return Err(LayoutError::StorageTooShort);
        }
        Ok(NdArray {
            dtype: dtype.into(),
            buffer,
            layout,
            read_only,
        })
    }

    /// Return the element at `subscripts`.
    ///
    /// Subscripts which are out of bounds produce an error.
    pub fn get(&self, subscripts: &[isize]) -> Result<T, ElementError> {
        self.get_with_modes(subscripts, &[IndexMode::Throw])
    }

    /// Return the element at `subscripts`, resolving out-of-bounds subscripts
    /// using `modes`. See [`subscripts_to_linear_index`](crate::subscripts_to_linear_index).
    pub fn get_with_modes(
        &self,
        subscripts: &[isize],
        modes: &[IndexMode],
    ) -> Result<T, ElementError> {
        let offset = self.layout.offset_of(subscripts, modes)?;
        self.buffer.get(offset).ok_or(ElementError::OutOfStorage {
            offset,
            len: self.buffer.len(),
        })
    }

    /// Replace the element at `subscripts`.
    pub fn set(&self, subscripts: &[isize], value: T) -> Result<(), ElementError> {
        self.set_with_modes(subscripts, &[IndexMode::Throw], value)
    }

    /// Replace the element at `subscripts`, resolving out-of-bounds
    /// subscripts using `modes`.
    pub fn set_with_modes(
        &self,
        subscripts: &[isize],
        modes: &[IndexMode],
        value: T,
    ) -> Result<(), ElementError> {
        if self.read_only {
            return Err(ElementError::ReadOnly);
        }
        let offset = self.layout.offset_of(subscripts, modes)?;
        if self.buffer.set(offset, value) {
            Ok(())
        } else {
            Err(ElementError::OutOfStorage {
                offset,
                len: self.buffer.len(),
            })
        }
    }

    /// Copy the elements into a vector, in logical row-major order.
    ///
    /// Panics if the layout reaches beyond the end of the buffer, which
    /// cannot happen for arrays created with the checked constructors.
    pub fn to_vec(&self) -> Vec<T> {
        self.layout
            .offsets()
            .map(|offset| self.buffer.load(offset))
            .collect()
    }
}

impl<T> NdArray<T> {
    /// Create a new view of this array's buffer with a different layout.
    pub(crate) fn with_layout(&self, layout: Layout, read_only: bool) -> NdArray<T> {
        NdArray {
            dtype: self.dtype.clone(),
            buffer: self.buffer.clone(),
            layout,
            read_only,
        }
    }

    /// Return the data type tag.
    pub fn dtype(&self) -> &str {
        &self.dtype
    }

    /// Return the underlying buffer.
    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    pub fn offset(&self) -> usize {
        self.layout.offset()
    }

    pub fn order(&self) -> Order {
        self.layout.order()
    }

    /// Return the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Return the number of elements.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    /// Return true if this array has no elements.
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Return true if elements cannot be written through this view.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Return the strategy used to access elements of the buffer.
    pub fn strategy(&self) -> AccessStrategy {
        self.buffer.strategy()
    }
}

#[cfg(test)]
mod tests {
    use super::NdArray;
    use crate::errors::{ElementError, IndexError, LayoutError};
    use crate::index::IndexMode;
    use crate::layout::{Layout, Order};
    use crate::storage::{AccessStrategy, Buffer, PairedBuffer};

    #[test]
    fn test_from_vec() {
        let x = NdArray::from_vec(
            "float64",
            vec![1., 2., 3., 4., 5., 6.],
            &[2, 3],
            Order::RowMajor,
        )
        .unwrap();
        assert_eq!(x.dtype(), "float64");
        assert_eq!(x.shape(), &[2, 3]);
        assert_eq!(x.strides(), &[3, 1]);
        assert_eq!(x.offset(), 0);
        assert_eq!(x.len(), 6);
        assert!(!x.is_read_only());
        assert_eq!(x.strategy(), AccessStrategy::Direct);
        assert_eq!(x.get(&[1, 0]), Ok(4.));

        let err = NdArray::from_vec("float64", vec![1., 2.], &[2, 3], Order::RowMajor);
        assert_eq!(
            err.err(),
            Some(LayoutError::StorageLengthMismatch { len: 2, numel: 6 })
        );
    }

    #[test]
    fn test_column_major() {
        let x = NdArray::from_vec("int32", vec![1, 2, 3, 4, 5, 6], &[2, 3], Order::ColumnMajor)
            .unwrap();
        assert_eq!(x.strides(), &[1, 2]);
        assert_eq!(x.get(&[0, 1]), Ok(3));
        assert_eq!(x.to_vec(), [1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_from_scalar() {
        let x = NdArray::from_scalar("int32", 42);
        assert_eq!(x.ndim(), 0);
        assert_eq!(x.len(), 1);
        assert_eq!(x.get(&[]), Ok(42));
        assert_eq!(x.to_vec(), [42]);
        assert_eq!(x.layout().strides_or_default().as_slice(), &[0]);
    }

    #[test]
    fn test_from_parts() {
        let buffer = Buffer::from_vec(vec![0, 1, 2, 3, 4, 5]);
        let layout = Layout::from_parts(&[3], &[-2], 4, Order::RowMajor).unwrap();
        let x = NdArray::from_parts("int32", buffer.clone(), layout, true).unwrap();
        assert_eq!(x.to_vec(), [4, 2, 0]);
        assert!(x.is_read_only());
        assert_eq!(x.set(&[0], 10), Err(ElementError::ReadOnly));

        let layout = Layout::from_parts(&[4], &[2], 0, Order::RowMajor).unwrap();
        let err = NdArray::from_parts("int32", buffer, layout, false);
        assert_eq!(err.err(), Some(LayoutError::StorageTooShort));
    }

    #[test]
    fn test_get_set() {
        let x = NdArray::from_vec("int32", vec![0; 6], &[2, 3], Order::RowMajor).unwrap();
        let alias = x.clone();

        x.set(&[1, 2], 7).unwrap();
        assert_eq!(alias.get(&[1, 2]), Ok(7));
        assert_eq!(
            alias.get(&[-1, 2]),
            Err(ElementError::Index(IndexError::OutOfBounds {
                index: -1,
                max: 1
            }))
        );
        assert_eq!(
            alias.get(&[0]),
            Err(ElementError::Index(IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            }))
        );

        // Wrap in the first dimension and clamp in the second.
        let modes = [IndexMode::Wrap, IndexMode::Clamp];
        assert_eq!(x.get_with_modes(&[3, 10], &modes), Ok(7));
        x.set_with_modes(&[-2, -5], &modes, 9).unwrap();
        assert_eq!(x.to_vec(), [9, 0, 0, 0, 0, 7]);
    }

    #[test]
    fn test_clone_shares_buffer() {
        // Cloning needs no bounds on the element type.
        fn share<T>(x: &NdArray<T>) -> NdArray<T> {
            x.clone()
        }

        let x = NdArray::from_vec("int32", vec![1, 2, 3], &[3], Order::RowMajor).unwrap();
        let y = share(&x);
        assert!(y.buffer().ptr_eq(x.buffer()));
        assert_eq!(y.dtype(), "int32");
        assert_eq!(y.layout(), x.layout());
        assert_eq!(y.is_read_only(), x.is_read_only());
    }

    #[test]
    fn test_from_accessor() {
        let pairs = PairedBuffer::from_components(vec![1, 10, 2, 20, 3, 30, 4, 40]);
        let x = NdArray::from_accessor("complex128", pairs.clone(), &[2, 2], Order::RowMajor)
            .unwrap();
        assert_eq!(x.strategy(), AccessStrategy::Accessor);
        assert_eq!(x.get(&[1, 0]), Ok((3, 30)));

        x.set(&[0, 1], (5, 50)).unwrap();
        assert_eq!(pairs.components(), [1, 10, 5, 50, 3, 30, 4, 40]);

        let err = NdArray::from_accessor("complex128", pairs, &[3], Order::RowMajor);
        assert_eq!(
            err.err(),
            Some(LayoutError::StorageLengthMismatch { len: 4, numel: 3 })
        );
    }
}
