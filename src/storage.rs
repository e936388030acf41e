//! Shared element buffers and the strategies used to access their elements.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Getter/setter protocol for buffers whose elements cannot be addressed
/// directly, eg. because each logical element is encoded as several
/// physical components.
///
/// Setters take `&self` because buffers are shared by every view derived
/// from them. Implementations use interior mutability.
pub trait Accessor {
    /// The logical element type.
    type Elem;

    /// Return the number of logical elements.
    fn len(&self) -> usize;

    /// Return true if the buffer has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the element at `index`.
    ///
    /// Panics if `index >= self.len()`.
    fn get(&self, index: usize) -> Self::Elem;

    /// Write the element at `index`.
    ///
    /// Panics if `index >= self.len()`.
    fn set(&self, index: usize, value: Self::Elem);
}

/// How the elements of a buffer are read and written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessStrategy {
    /// Elements are indexed directly in a slice.
    Direct,

    /// Elements are read and written via an [`Accessor`].
    Accessor,
}

/// A reference-counted element buffer, shared by every array view created
/// from it.
///
/// Cloning a buffer creates a new handle to the same elements. The buffer
/// lives until the last handle is dropped.
pub enum Buffer<T> {
    /// Elements stored directly in a slice.
    Direct(Rc<[Cell<T>]>),

    /// Elements accessed via a getter/setter pair.
    Accessor(Rc<dyn Accessor<Elem = T>>),
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        match self {
            Buffer::Direct(data) => Buffer::Direct(data.clone()),
            Buffer::Accessor(acc) => Buffer::Accessor(acc.clone()),
        }
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("strategy", &self.strategy())
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Copy> Buffer<T> {
    /// Create a directly indexed buffer from a vector of elements.
    pub fn from_vec(data: Vec<T>) -> Buffer<T> {
        Buffer::Direct(data.into_iter().map(Cell::new).collect())
    }

    /// Create a buffer which reads and writes elements using `accessor`.
    pub fn from_accessor<A: Accessor<Elem = T> + 'static>(accessor: A) -> Buffer<T> {
        Buffer::Accessor(Rc::new(accessor))
    }

    /// Read the element at `index`, or `None` if it is out of bounds.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }
        Some(match self {
            Buffer::Direct(data) => data[index].get(),
            Buffer::Accessor(acc) => acc.get(index),
        })
    }

    /// Write the element at `index`. Returns false if it is out of bounds.
    pub fn set(&self, index: usize, value: T) -> bool {
        if index >= self.len() {
            return false;
        }
        match self {
            Buffer::Direct(data) => data[index].set(value),
            Buffer::Accessor(acc) => acc.set(index, value),
        }
        true
    }

    /// Copy all elements, in buffer order, into a vector.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.load(i)).collect()
    }

    /// Read the element at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub(crate) fn load(&self, index: usize) -> T {
        match self {
            Buffer::Direct(data) => data.load(index),
            Buffer::Accessor(acc) => acc.load(index),
        }
    }
}

impl<T> Buffer<T> {
    /// Return the number of elements.
    pub fn len(&self) -> usize {
        match self {
            Buffer::Direct(data) => data.len(),
            Buffer::Accessor(acc) => acc.len(),
        }
    }

    /// Return true if the buffer has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the strategy used to access elements of this buffer.
    pub fn strategy(&self) -> AccessStrategy {
        match self {
            Buffer::Direct(_) => AccessStrategy::Direct,
            Buffer::Accessor(_) => AccessStrategy::Accessor,
        }
    }

    /// Return true if `self` and `other` are handles to the same elements.
    pub fn ptr_eq(&self, other: &Buffer<T>) -> bool {
        match (self, other) {
            (Buffer::Direct(a), Buffer::Direct(b)) => Rc::ptr_eq(a, b),
            (Buffer::Accessor(a), Buffer::Accessor(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Return the number of handles sharing this buffer.
    pub fn handle_count(&self) -> usize {
        match self {
            Buffer::Direct(data) => Rc::strong_count(data),
            Buffer::Accessor(acc) => Rc::strong_count(acc),
        }
    }
}

/// Element reads and writes used inside traversal loops.
///
/// This is implemented for both kinds of buffer storage so that traversal
/// kernels can be monomorphized once per access strategy, after the
/// strategy has been selected.
pub(crate) trait ElemAccess<T> {
    fn load(&self, index: usize) -> T;
    fn store(&self, index: usize, value: T);
}

impl<T: Copy> ElemAccess<T> for [Cell<T>] {
    #[inline(always)]
    fn load(&self, index: usize) -> T {
        self[index].get()
    }

    #[inline(always)]
    fn store(&self, index: usize, value: T) {
        self[index].set(value)
    }
}

impl<T> ElemAccess<T> for dyn Accessor<Elem = T> {
    #[inline]
    fn load(&self, index: usize) -> T {
        self.get(index)
    }

    #[inline]
    fn store(&self, index: usize, value: T) {
        self.set(index, value)
    }
}

/// Accessor for buffers where each logical element is a pair of adjacent
/// components, such as the real and imaginary parts of a complex number.
pub struct PairedBuffer<T> {
    components: Rc<[Cell<T>]>,
}

impl<T> Clone for PairedBuffer<T> {
    fn clone(&self) -> Self {
        PairedBuffer {
            components: self.components.clone(),
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for PairedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairedBuffer")
            .field("components", &self.components())
            .finish()
    }
}

impl<T: Copy> PairedBuffer<T> {
    /// Create a buffer from interleaved components.
    ///
    /// Panics if `components` has an odd length.
    pub fn from_components(components: Vec<T>) -> PairedBuffer<T> {
        assert!(
            components.len() % 2 == 0,
            "paired buffer needs an even number of components"
        );
        PairedBuffer {
            components: components.into_iter().map(Cell::new).collect(),
        }
    }

    /// Return a copy of the interleaved components.
    pub fn components(&self) -> Vec<T> {
        self.components.iter().map(|c| c.get()).collect()
    }
}

impl<T: Copy> Accessor for PairedBuffer<T> {
    type Elem = (T, T);

    fn len(&self) -> usize {
        self.components.len() / 2
    }

    fn get(&self, index: usize) -> (T, T) {
        (
            self.components[2 * index].get(),
            self.components[2 * index + 1].get(),
        )
    }

    fn set(&self, index: usize, value: (T, T)) {
        self.components[2 * index].set(value.0);
        self.components[2 * index + 1].set(value.1);
    }
}
