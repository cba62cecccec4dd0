//! Single objects in segment storage.

use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::allocator::SegmentAllocator;
use crate::error::{AllocError, SegmentError};
use crate::ptr::ShmPtr;
use crate::release::ShmDrop;
use crate::segment::Segment;

/// Storage that is handed back unless construction completes.
struct StorageGuard<'s, T> {
    alloc: SegmentAllocator<'s, T>,
    ptr: ShmPtr<T>,
}

impl<T> StorageGuard<'_, T> {
    fn disarm(self) -> ShmPtr<T> {
        let ptr = self.ptr;
        core::mem::forget(self);
        ptr
    }
}

impl<T> Drop for StorageGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: allocated for one T and never initialized or shared.
        unsafe { self.alloc.deallocate(self.ptr, 1) };
    }
}

/// An owning offset to one `T` in a segment.
///
/// This is the form stored inside other segment values. It has no `Drop`;
/// the owner releases it through [`ShmDrop`].
#[repr(C)]
pub struct ShmBox<T> {
    ptr: ShmPtr<T>,
}

impl<T: ShmDrop> ShmBox<T> {
    /// Reserve storage, then build the value into it.
    ///
    /// If `build` fails (or panics) the storage is returned to the segment
    /// before the error propagates.
    pub fn new_in<'s, E, F>(alloc: SegmentAllocator<'s>, build: F) -> Result<Self, E>
    where
        E: From<AllocError>,
        F: FnOnce(SegmentAllocator<'s>) -> Result<T, E>,
    {
        let typed = alloc.rebind::<T>();
        let guard = StorageGuard {
            alloc: typed,
            ptr: typed.allocate(1)?,
        };
        let value = build(alloc)?;
        let ptr = guard.disarm();
        // SAFETY: fresh storage for one T, owned by us.
        unsafe { alloc.segment().resolve_unchecked(ptr).write(value) };
        Ok(Self { ptr })
    }
}

impl<T> ShmBox<T> {
    #[inline]
    pub fn as_ptr(&self) -> ShmPtr<T> {
        self.ptr
    }

    /// Take ownership of a raw offset.
    ///
    /// # Safety
    ///
    /// `ptr` must point at an initialized `T` allocated for one element.
    pub unsafe fn from_raw(ptr: ShmPtr<T>) -> Self {
        Self { ptr }
    }

    /// Borrow the pointee, validating the stored offset.
    pub fn get<'a>(&self, segment: &'a Segment) -> Result<&'a T, SegmentError> {
        let raw = segment.resolve(self.ptr, 1)?;
        // SAFETY: bounds and alignment checked; boxes always point at an
        // initialized T.
        Ok(unsafe { &*raw })
    }
}

impl<T: ShmDrop> ShmDrop for ShmBox<T> {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        if self.ptr.is_null() {
            return;
        }
        let segment = alloc.segment();
        if let Ok(raw) = segment.resolve(self.ptr, 1) {
            unsafe {
                (*raw).release(alloc);
                alloc.rebind::<T>().deallocate(self.ptr, 1);
            }
        }
        self.ptr = ShmPtr::null();
    }
}

impl<T> fmt::Debug for ShmBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShmBox").field(&self.ptr).finish()
    }
}

/// Exclusive, process-local owner of one object in a segment.
///
/// Dropping the handle releases the object's children and then its storage.
/// Use [`into_raw`](Self::into_raw) to hand the object to another owner, e.g.
/// before publishing it by name.
pub struct ShmUnique<'s, T: ShmDrop> {
    boxed: ManuallyDrop<ShmBox<T>>,
    alloc: SegmentAllocator<'s>,
}

impl<'s, T: ShmDrop> ShmUnique<'s, T> {
    /// Allocate and build an object. See [`ShmBox::new_in`].
    pub fn new_in<E, F>(alloc: SegmentAllocator<'s>, build: F) -> Result<Self, E>
    where
        E: From<AllocError>,
        F: FnOnce(SegmentAllocator<'s>) -> Result<T, E>,
    {
        let boxed = ShmBox::new_in(alloc, build)?;
        Ok(Self {
            boxed: ManuallyDrop::new(boxed),
            alloc,
        })
    }

    /// Place an already-built value. On failure the value is released.
    pub fn new(mut value: T, alloc: SegmentAllocator<'s>) -> Result<Self, AllocError> {
        match alloc.rebind::<T>().allocate(1) {
            Ok(ptr) => {
                // SAFETY: fresh storage for one T.
                unsafe { alloc.segment().resolve_unchecked(ptr).write(value) };
                Ok(Self {
                    boxed: ManuallyDrop::new(ShmBox { ptr }),
                    alloc,
                })
            }
            Err(err) => {
                // SAFETY: we own `value` and drop it here.
                unsafe { value.release(alloc) };
                Err(err)
            }
        }
    }

    /// Re-adopt an object previously given up with [`into_raw`](Self::into_raw).
    ///
    /// # Safety
    ///
    /// `ptr` must point at a live `T` built with an allocator of `alloc`'s
    /// segment, and no one else may own it.
    pub unsafe fn from_raw(ptr: ShmPtr<T>, alloc: SegmentAllocator<'s>) -> Self {
        Self {
            boxed: ManuallyDrop::new(ShmBox { ptr }),
            alloc,
        }
    }

    /// Give up ownership without releasing anything.
    pub fn into_raw(self) -> ShmPtr<T> {
        let this = ManuallyDrop::new(self);
        this.boxed.ptr
    }

    /// Give up ownership to a parent segment value.
    pub fn into_box(self) -> ShmBox<T> {
        ShmBox {
            ptr: self.into_raw(),
        }
    }

    #[inline]
    pub fn as_ptr(&self) -> ShmPtr<T> {
        self.boxed.ptr
    }

    pub fn allocator(&self) -> SegmentAllocator<'s> {
        self.alloc
    }
}

impl<T: ShmDrop> Deref for ShmUnique<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the handle owns a live, initialized allocation.
        unsafe { &*self.alloc.segment().resolve_unchecked(self.boxed.ptr) }
    }
}

impl<T: ShmDrop> DerefMut for ShmUnique<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, and the handle is exclusive.
        unsafe { &mut *self.alloc.segment().resolve_unchecked(self.boxed.ptr) }
    }
}

impl<T: ShmDrop> Drop for ShmUnique<'_, T> {
    fn drop(&mut self) {
        // SAFETY: dropped once; the box is not used again.
        unsafe { self.boxed.release(self.alloc) };
    }
}

impl<T: ShmDrop> fmt::Debug for ShmUnique<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShmUnique").field(&self.boxed.ptr).finish()
    }
}
