//! Releasing what a value owns inside a segment.

use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::allocator::SegmentAllocator;

/// Values stored in a segment that may own other segment storage.
///
/// Segment values never run `Drop`: they are plain offsets and copying one
/// does not duplicate what it points to. Whoever owns a value calls
/// [`release`](Self::release) exactly once, threading the allocator that
/// built it.
pub trait ShmDrop {
    /// Whether `release` does anything. Containers skip the per-element walk
    /// when it doesn't.
    const NEEDS_RELEASE: bool = true;

    /// Free everything this value owns in the segment.
    ///
    /// # Safety
    ///
    /// `self` must have been built with allocators bound to `alloc`'s segment,
    /// and must not be read or released again afterwards.
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>);
}

macro_rules! plain_shm_drop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShmDrop for $ty {
                const NEEDS_RELEASE: bool = false;

                #[inline]
                unsafe fn release(&mut self, _alloc: SegmentAllocator<'_>) {}
            }
        )*
    };
}

plain_shm_drop!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

/// Releases a segment value on scope exit unless it is taken back with
/// [`into_inner`](Self::into_inner).
///
/// Builders hold partially constructed children in guards, so an early `?`
/// return frees everything built so far.
pub struct ShmGuard<'s, T: ShmDrop> {
    value: ManuallyDrop<T>,
    alloc: SegmentAllocator<'s>,
}

impl<'s, T: ShmDrop> ShmGuard<'s, T> {
    pub fn new(value: T, alloc: SegmentAllocator<'s>) -> Self {
        Self {
            value: ManuallyDrop::new(value),
            alloc,
        }
    }

    /// Disarm the guard.
    pub fn into_inner(self) -> T {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the value is moved out once.
        unsafe { ManuallyDrop::take(&mut this.value) }
    }
}

impl<T: ShmDrop> Deref for ShmGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ShmDrop> DerefMut for ShmGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: ShmDrop> Drop for ShmGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the guard owns the value and drops only once.
        unsafe { self.value.release(self.alloc) };
    }
}
