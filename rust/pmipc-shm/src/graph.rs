//! A small three-level object graph, used to exercise ownership and cleanup
//! of nested segment values.
//!
//! ```text
//! Root ─┬─ ShmBox<Branch> ── ShmVec<ShmBox<Leaf>> ── Leaf { ShmString }
//!       └─ ShmBox<Branch> ── ...
//! ```

use alloc::string::String;

use crate::allocator::SegmentAllocator;
use crate::boxed::ShmBox;
use crate::error::{AllocError, SegmentError};
use crate::release::{ShmDrop, ShmGuard};
use crate::segment::Segment;
use crate::string::ShmString;
use crate::vec::ShmVec;

/// Long enough that every leaf's text needs its own heap block.
pub const LEAF_TEXT_PREFIX: &str = "very-long-string-forcing-text-allocate-block-";

/// Separator between the two branches in [`Root::describe`].
pub const BRANCH_SEPARATOR: &str = " - $$ - ";

#[repr(C)]
pub struct Leaf {
    text: ShmString,
}

impl Leaf {
    pub fn new_in(index: i32, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let text = alloc::format!("{LEAF_TEXT_PREFIX}{index}");
        Ok(Self {
            text: ShmString::new_in(&text, alloc)?,
        })
    }

    pub fn text<'a>(&self, segment: &'a Segment) -> Result<&'a str, SegmentError> {
        self.text.as_str(segment)
    }
}

impl ShmDrop for Leaf {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe { self.text.release(alloc) };
    }
}

#[repr(C)]
pub struct Branch {
    leaves: ShmVec<ShmBox<Leaf>>,
}

impl Branch {
    /// A branch with `count` leaves numbered from zero.
    pub fn new_in(count: u32, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let mut leaves = ShmGuard::new(ShmVec::with_capacity(count as usize, alloc)?, alloc);
        for i in 0..count {
            let leaf = ShmBox::new_in(alloc, |alloc| Leaf::new_in(i as i32, alloc))?;
            leaves.push(leaf, alloc)?;
        }
        Ok(Self {
            leaves: leaves.into_inner(),
        })
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaf texts joined with `|`.
    pub fn describe(&self, segment: &Segment) -> Result<String, SegmentError> {
        let mut out = String::new();
        for (i, leaf) in self.leaves.as_slice(segment)?.iter().enumerate() {
            if i > 0 {
                out.push('|');
            }
            out.push_str(leaf.get(segment)?.text(segment)?);
        }
        Ok(out)
    }
}

impl ShmDrop for Branch {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe { self.leaves.release(alloc) };
    }
}

#[repr(C)]
pub struct Root {
    first: ShmBox<Branch>,
    second: ShmBox<Branch>,
}

impl Root {
    pub fn new_in(
        first: u32,
        second: u32,
        alloc: SegmentAllocator<'_>,
    ) -> Result<Self, AllocError> {
        let first = ShmGuard::new(
            ShmBox::new_in(alloc, |alloc| Branch::new_in(first, alloc))?,
            alloc,
        );
        let second = ShmBox::new_in(alloc, |alloc| Branch::new_in(second, alloc))?;
        Ok(Self {
            first: first.into_inner(),
            second,
        })
    }

    pub fn describe(&self, segment: &Segment) -> Result<String, SegmentError> {
        let mut out = self.first.get(segment)?.describe(segment)?;
        out.push_str(BRANCH_SEPARATOR);
        out.push_str(&self.second.get(segment)?.describe(segment)?);
        Ok(out)
    }
}

impl ShmDrop for Root {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe {
            self.first.release(alloc);
            self.second.release(alloc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxed::ShmUnique;
    use crate::region::HeapRegion;
    use crate::segment::SEGMENT_OVERHEAD;

    #[test]
    fn graph_describes_every_leaf() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 16 * 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();

        let root = ShmUnique::new_in(segment.allocator(), |alloc| Root::new_in(2, 1, alloc)).unwrap();
        let text = root.describe(&segment).unwrap();
        assert_eq!(
            text,
            "very-long-string-forcing-text-allocate-block-0|\
             very-long-string-forcing-text-allocate-block-1 - $$ - \
             very-long-string-forcing-text-allocate-block-0"
        );
    }

    #[test]
    fn dropping_the_root_frees_everything() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 64 * 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let before = segment.free_bytes();

        for _ in 0..3 {
            let root =
                ShmUnique::new_in(segment.allocator(), |alloc| Root::new_in(5, 7, alloc)).unwrap();
            assert!(segment.free_bytes() < before);
            drop(root);
            assert_eq!(segment.free_bytes(), before);
        }
    }

    #[test]
    fn exhaustion_mid_build_leaks_nothing() {
        // Enough for some leaves but not all of them.
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let before = segment.free_bytes();

        let result = ShmUnique::new_in(segment.allocator(), |alloc| Root::new_in(10, 10, alloc));
        assert!(matches!(result, Err(AllocError::Exhausted { .. })));
        assert_eq!(segment.free_bytes(), before);
    }
}
