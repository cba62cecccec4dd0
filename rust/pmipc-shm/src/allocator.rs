//! Typed allocators bound to a segment.

use core::fmt;
use core::marker::PhantomData;
use core::mem::{align_of, size_of};

use crate::error::AllocError;
use crate::ptr::ShmPtr;
use crate::segment::Segment;

/// Allocates `T`s from one segment.
///
/// Cheap to copy. An allocator for one element type can be rebound to any
/// other with [`rebind`](Self::rebind); all rebinds share the same heap and
/// compare equal.
pub struct SegmentAllocator<'s, T = ()> {
    segment: &'s Segment,
    _marker: PhantomData<fn() -> T>,
}

impl<'s> SegmentAllocator<'s, ()> {
    pub fn new(segment: &'s Segment) -> Self {
        Self {
            segment,
            _marker: PhantomData,
        }
    }
}

impl<'s, T> SegmentAllocator<'s, T> {
    /// The same allocator, for another element type.
    #[inline]
    pub fn rebind<U>(self) -> SegmentAllocator<'s, U> {
        SegmentAllocator {
            segment: self.segment,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn segment(&self) -> &'s Segment {
        self.segment
    }

    /// Storage for `count` consecutive `T`, uninitialized.
    pub fn allocate(&self, count: usize) -> Result<ShmPtr<T>, AllocError> {
        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(AllocError::CapacityOverflow)?;
        let offset = self.segment.allocate(bytes, align_of::<T>())?;
        Ok(ShmPtr::from_offset(offset))
    }

    /// Return storage obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `ptr` and `count` must match a previous `allocate` on this segment, and
    /// the storage must not be used afterwards.
    pub unsafe fn deallocate(&self, ptr: ShmPtr<T>, count: usize) {
        if ptr.is_null() {
            return;
        }
        unsafe {
            self.segment
                .deallocate(ptr.offset(), size_of::<T>() * count)
        };
    }
}

impl<T> Clone for SegmentAllocator<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SegmentAllocator<'_, T> {}

impl<T, U> PartialEq<SegmentAllocator<'_, U>> for SegmentAllocator<'_, T> {
    fn eq(&self, other: &SegmentAllocator<'_, U>) -> bool {
        core::ptr::eq(self.segment, other.segment)
    }
}

impl<T> fmt::Debug for SegmentAllocator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentAllocator")
            .field("base", &self.segment.region().as_ptr())
            .field("element", &core::any::type_name::<T>())
            .finish()
    }
}

#[cfg(feature = "allocator")]
mod api2 {
    use core::alloc::Layout;
    use core::ptr::NonNull;

    use allocator_api2::alloc::{AllocError, Allocator};

    use super::SegmentAllocator;

    // Process-local collections (e.g. `allocator_api2::vec::Vec`) can borrow
    // segment storage through this impl. Their internal pointers are absolute,
    // so such collections must never be read from another process.
    unsafe impl<T> Allocator for SegmentAllocator<'_, T> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            let offset = self
                .segment
                .allocate(layout.size(), layout.align())
                .map_err(|_| AllocError)?;
            // SAFETY: offset was just handed out by this segment.
            let raw = unsafe { self.segment.region().offset(offset as usize) };
            let ptr = NonNull::new(raw).ok_or(AllocError)?;
            Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            let offset = ptr.as_ptr() as usize - self.segment.region().as_ptr() as usize;
            unsafe { self.segment.deallocate(offset as u64, layout.size()) };
        }
    }
}
