//! Growable arrays in segment storage.

use core::fmt;
use core::mem::size_of;

use crate::allocator::SegmentAllocator;
use crate::error::{AllocError, SegmentError};
use crate::ptr::ShmPtr;
use crate::release::ShmDrop;
use crate::segment::Segment;

/// A contiguous array of `T` in a segment: offset, length, capacity.
///
/// Reserve up front when the final length is known; pushing past capacity
/// moves the elements into a larger block.
#[repr(C)]
pub struct ShmVec<T> {
    ptr: ShmPtr<T>,
    len: u32,
    capacity: u32,
}

impl<T> ShmVec<T> {
    pub const fn new() -> Self {
        Self {
            ptr: ShmPtr::null(),
            len: 0,
            capacity: 0,
        }
    }

    pub fn with_capacity(capacity: usize, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let mut vec = Self::new();
        if capacity > 0 {
            vec.capacity = u32::try_from(capacity).map_err(|_| AllocError::CapacityOverflow)?;
            vec.ptr = alloc.rebind::<T>().allocate(capacity)?;
        }
        Ok(vec)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Borrow the elements, validating the stored offset and length.
    pub fn as_slice<'a>(&self, segment: &'a Segment) -> Result<&'a [T], SegmentError> {
        if self.len == 0 {
            return Ok(&[]);
        }
        let raw = segment.resolve(self.ptr, self.len as usize)?;
        // SAFETY: bounds and alignment checked; the first `len` elements are
        // initialized.
        Ok(unsafe { core::slice::from_raw_parts(raw, self.len as usize) })
    }

    /// Push without growing. Hands the value back when full.
    pub fn push_within_capacity(&mut self, value: T, segment: &Segment) -> Result<(), T> {
        if self.len == self.capacity {
            return Err(value);
        }
        // SAFETY: slot `len` is inside our allocation and uninitialized.
        unsafe {
            segment
                .resolve_unchecked(self.ptr.add(self.len as usize))
                .write(value)
        };
        self.len += 1;
        Ok(())
    }

    fn grow(&mut self, alloc: SegmentAllocator<'_>) -> Result<(), AllocError> {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or(AllocError::CapacityOverflow)?
            .max(4);
        let typed = alloc.rebind::<T>();
        let new_ptr = typed.allocate(new_capacity as usize)?;

        if self.capacity > 0 {
            let segment = alloc.segment();
            // SAFETY: both blocks belong to us and do not overlap.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    segment.resolve_unchecked(self.ptr) as *const u8,
                    segment.resolve_unchecked(new_ptr) as *mut u8,
                    self.len as usize * size_of::<T>(),
                );
                typed.deallocate(self.ptr, self.capacity as usize);
            }
        }

        self.ptr = new_ptr;
        self.capacity = new_capacity;
        Ok(())
    }
}

impl<T: Copy> ShmVec<T> {
    /// A vector holding a copy of `items`, with exactly that capacity.
    pub fn from_slice(items: &[T], alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let mut vec = Self::with_capacity(items.len(), alloc)?;
        if !items.is_empty() {
            // SAFETY: the block holds `items.len()` elements and is ours alone.
            unsafe {
                core::ptr::copy_nonoverlapping(
                    items.as_ptr(),
                    alloc.segment().resolve_unchecked(vec.ptr),
                    items.len(),
                );
            }
            vec.len = vec.capacity;
        }
        Ok(vec)
    }
}

impl<T: ShmDrop> ShmVec<T> {
    /// Append, growing if needed. On failure `value` is released.
    pub fn push(&mut self, value: T, alloc: SegmentAllocator<'_>) -> Result<(), AllocError> {
        let mut value = value;
        if self.len == self.capacity
            && let Err(err) = self.grow(alloc)
        {
            // SAFETY: we own `value` and it goes nowhere else.
            unsafe { value.release(alloc) };
            return Err(err);
        }
        // SAFETY: slot `len` is inside our allocation and uninitialized.
        unsafe {
            alloc
                .segment()
                .resolve_unchecked(self.ptr.add(self.len as usize))
                .write(value)
        };
        self.len += 1;
        Ok(())
    }
}

impl<T: ShmDrop> ShmDrop for ShmVec<T> {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        if self.capacity == 0 {
            return;
        }
        let segment = alloc.segment();
        if let Ok(raw) = segment.resolve(self.ptr, self.capacity as usize) {
            if T::NEEDS_RELEASE {
                for i in 0..self.len as usize {
                    unsafe { (*raw.add(i)).release(alloc) };
                }
            }
            unsafe { alloc.rebind::<T>().deallocate(self.ptr, self.capacity as usize) };
        }
        *self = Self::new();
    }
}

impl<T> Default for ShmVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ShmVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShmVec")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxed::ShmBox;
    use crate::region::HeapRegion;
    use crate::segment::SEGMENT_OVERHEAD;

    #[test]
    fn reserved_push_does_not_move() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 4096);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let alloc = segment.allocator();

        let mut v = ShmVec::<u32>::with_capacity(3, alloc).unwrap();
        let ptr = v.ptr;
        for i in 0..3 {
            v.push(i * 10, alloc).unwrap();
        }
        assert_eq!(v.ptr, ptr);
        assert_eq!(v.as_slice(&segment).unwrap(), &[0, 10, 20]);
        assert_eq!(v.push_within_capacity(30, &segment), Err(30));

        unsafe { v.release(alloc) };
        assert!(v.is_empty());
    }

    #[test]
    fn from_slice_fills_exact_capacity() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 4096);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let alloc = segment.allocator();
        let before = segment.free_bytes();

        let mut v = ShmVec::from_slice(&[7u16, 8, 9, 10, 11], alloc).unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(v.capacity(), 5);
        assert_eq!(v.as_slice(&segment).unwrap(), &[7, 8, 9, 10, 11]);
        assert_eq!(v.push_within_capacity(12, &segment), Err(12));

        let empty = ShmVec::<u16>::from_slice(&[], alloc).unwrap();
        assert!(empty.ptr.is_null());

        unsafe { v.release(alloc) };
        assert_eq!(segment.free_bytes(), before);
    }

    #[test]
    fn growth_keeps_elements_and_frees_old_block() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 4096);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let alloc = segment.allocator();
        let before = segment.free_bytes();

        let mut v = ShmVec::<u64>::new();
        for i in 0..20u64 {
            v.push(i, alloc).unwrap();
        }
        assert!(v.capacity() >= 20);
        let expected: alloc::vec::Vec<u64> = (0..20).collect();
        assert_eq!(v.as_slice(&segment).unwrap(), expected.as_slice());

        unsafe { v.release(alloc) };
        assert_eq!(segment.free_bytes(), before);
    }

    #[test]
    fn release_walks_owned_elements() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 4096);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let alloc = segment.allocator();
        let before = segment.free_bytes();

        let mut v = ShmVec::<ShmBox<u32>>::with_capacity(4, alloc).unwrap();
        for i in 0..4u32 {
            let item = ShmBox::new_in(alloc, |_| Ok::<_, AllocError>(i)).unwrap();
            v.push(item, alloc).unwrap();
        }
        let third = v.as_slice(&segment).unwrap()[2].get(&segment).unwrap();
        assert_eq!(*third, 2);

        unsafe { v.release(alloc) };
        assert_eq!(segment.free_bytes(), before);
    }

    #[test]
    fn corrupt_length_is_caught() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 256);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let mut v = ShmVec::<u64>::with_capacity(2, segment.allocator()).unwrap();
        v.len = 1000;
        assert!(matches!(
            v.as_slice(&segment),
            Err(SegmentError::OutOfBounds { .. })
        ));
    }
}
