//! Raw views over the memory a segment lives in.

#[cfg(any(test, feature = "alloc"))]
use core::ptr::NonNull;

/// A borrowed view of a contiguous, writable memory range.
///
/// `Region` is `Copy` and carries no lifetime: whoever created it (a
/// [`HeapRegion`], a file mapping, or a raw `mmap`) is responsible for keeping
/// the memory alive for as long as any view of it is in use.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    base: *mut u8,
    len: usize,
}

unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Create a region view from a raw base pointer and length.
    ///
    /// # Safety
    ///
    /// `base` must be valid for reads and writes of `len` bytes for as long as
    /// the region (or anything built on it) is used, and must be 64-byte aligned.
    pub unsafe fn from_raw(base: *mut u8, len: usize) -> Self {
        debug_assert!(
            (base as usize).is_multiple_of(64),
            "region base must be 64-byte aligned"
        );
        Self { base, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.base
    }

    /// Pointer to the byte at `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be `<= len`.
    #[inline]
    pub unsafe fn offset(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.len);
        unsafe { self.base.add(offset) }
    }

    /// Shared reference to a `T` stored at `offset`.
    ///
    /// # Safety
    ///
    /// `offset..offset + size_of::<T>()` must be in bounds, suitably aligned,
    /// and hold an initialized `T`.
    #[inline]
    pub unsafe fn get<T>(&self, offset: usize) -> &T {
        unsafe { &*(self.offset(offset) as *const T) }
    }

    /// Mutable reference to a `T` stored at `offset`.
    ///
    /// # Safety
    ///
    /// Same as [`Region::get`], and the caller must guarantee exclusive access.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut<T>(&self, offset: usize) -> &mut T {
        unsafe { &mut *(self.offset(offset) as *mut T) }
    }

    /// Borrow the whole region as bytes.
    ///
    /// # Safety
    ///
    /// No other party may write the region while the slice is alive.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.base, self.len) }
    }
}

/// Heap-owned, zero-initialized backing memory for a [`Region`].
///
/// Used for in-process segments and tests; the bytes can be copied into a
/// second `HeapRegion` to simulate the same segment mapped at another address.
#[cfg(any(test, feature = "alloc"))]
pub struct HeapRegion {
    ptr: NonNull<u8>,
    layout: alloc::alloc::Layout,
}

#[cfg(any(test, feature = "alloc"))]
unsafe impl Send for HeapRegion {}
#[cfg(any(test, feature = "alloc"))]
unsafe impl Sync for HeapRegion {}

#[cfg(any(test, feature = "alloc"))]
impl HeapRegion {
    /// Allocate `len` zeroed bytes, 64-byte aligned.
    pub fn new_zeroed(len: usize) -> Self {
        let layout = alloc::alloc::Layout::from_size_align(len.max(1), 64)
            .expect("heap region layout overflow");
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            alloc::alloc::handle_alloc_error(layout);
        };
        Self { ptr, layout }
    }

    /// Allocate a new region holding a copy of `bytes`.
    pub fn copy_from(bytes: &[u8]) -> Self {
        let region = Self::new_zeroed(bytes.len());
        // SAFETY: freshly allocated, at least `bytes.len()` long, disjoint.
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), region.ptr.as_ptr(), bytes.len());
        }
        region
    }

    /// The owned bytes, borrowed for as long as `self` is.
    ///
    /// # Safety
    ///
    /// No [`Region`] view of this memory may be written through while the
    /// slice is alive.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        // SAFETY: the allocation is `layout.size()` bytes and lives as long as `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    /// A view of the owned memory. The view must not outlive `self`.
    pub fn region(&self) -> Region {
        Region {
            base: self.ptr.as_ptr(),
            len: self.layout.size(),
        }
    }
}

#[cfg(any(test, feature = "alloc"))]
impl Drop for HeapRegion {
    fn drop(&mut self) {
        // SAFETY: allocated in `new_zeroed` with this exact layout.
        unsafe { alloc::alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}
