use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem::size_of;

/// A segment-relative pointer to one or more `T`.
///
/// Stores a byte offset from the segment base instead of an address, so the
/// same value is meaningful in every process that maps the segment, wherever
/// the mapping lands. Offset zero is the segment header and doubles as null.
#[repr(transparent)]
pub struct ShmPtr<T> {
    offset: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ShmPtr<T> {
    pub const fn null() -> Self {
        Self::from_offset(0)
    }

    pub const fn from_offset(offset: u64) -> Self {
        Self {
            offset,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.offset == 0
    }

    #[inline]
    pub const fn cast<U>(self) -> ShmPtr<U> {
        ShmPtr::from_offset(self.offset)
    }

    /// Pointer to the `count`-th element after this one.
    #[inline]
    pub const fn add(self, count: usize) -> Self {
        Self::from_offset(self.offset + (count * size_of::<T>()) as u64)
    }
}

impl<T> Clone for ShmPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ShmPtr<T> {}

impl<T> PartialEq for ShmPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<T> Eq for ShmPtr<T> {}

impl<T> Hash for ShmPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
    }
}

impl<T> Default for ShmPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for ShmPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShmPtr({:#x})", self.offset)
    }
}
