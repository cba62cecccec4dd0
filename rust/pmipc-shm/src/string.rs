use core::fmt;

use crate::allocator::SegmentAllocator;
use crate::error::{AllocError, SegmentError};
use crate::release::ShmDrop;
use crate::segment::Segment;
use crate::vec::ShmVec;

/// UTF-8 text in a segment. Not nul-terminated.
#[repr(C)]
pub struct ShmString {
    bytes: ShmVec<u8>,
}

impl ShmString {
    pub const fn new() -> Self {
        Self {
            bytes: ShmVec::new(),
        }
    }

    pub fn new_in(text: &str, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        Ok(Self {
            bytes: ShmVec::from_slice(text.as_bytes(), alloc)?,
        })
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes<'a>(&self, segment: &'a Segment) -> Result<&'a [u8], SegmentError> {
        self.bytes.as_slice(segment)
    }

    pub fn as_str<'a>(&self, segment: &'a Segment) -> Result<&'a str, SegmentError> {
        core::str::from_utf8(self.as_bytes(segment)?).map_err(|_| SegmentError::InvalidUtf8)
    }
}

impl ShmDrop for ShmString {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe { self.bytes.release(alloc) };
    }
}

impl Default for ShmString {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShmString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShmString").field(&self.bytes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::HeapRegion;
    use crate::segment::SEGMENT_OVERHEAD;

    #[test]
    fn text_round_trips_and_frees() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let alloc = segment.allocator();
        let before = segment.free_bytes();

        let mut s = ShmString::new_in("Arc 750", alloc).unwrap();
        assert_eq!(s.len(), 7);
        assert_eq!(s.as_str(&segment).unwrap(), "Arc 750");

        unsafe { s.release(alloc) };
        assert_eq!(segment.free_bytes(), before);
    }

    #[test]
    fn multibyte_text_is_copied_whole() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let text = "Caf\u{00e9} 72 \u{00b0}C";
        let s = ShmString::new_in(text, segment.allocator()).unwrap();
        assert_eq!(s.len(), text.len());
        assert_eq!(s.as_str(&segment).unwrap(), text);
    }

    #[test]
    fn string_that_does_not_fit_is_an_error() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 64);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let text = "x".repeat(65);
        assert!(matches!(
            ShmString::new_in(&text, segment.allocator()),
            Err(AllocError::Exhausted { .. })
        ));
        assert_eq!(segment.free_bytes(), segment.heap_capacity());
    }

    #[test]
    fn empty_string_takes_no_storage() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let s = ShmString::new_in("", segment.allocator()).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.as_str(&segment).unwrap(), "");
    }
}
