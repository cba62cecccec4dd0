//! The sizing pass.

use std::ptr::NonNull;

use crate::block::FLAT_ALIGN;
use crate::clone::CloneAllocator;
use crate::error::CloneError;

/// Bytes needed to bring `offset` up to the alignment of `T`.
#[inline]
pub const fn padding_for<T>(offset: usize) -> usize {
    let align = align_of::<T>();
    (align - offset % align) % align
}

/// Counts the bytes a clone would place, without touching memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizingAllocator {
    total: usize,
}

impl SizingAllocator {
    pub const fn new() -> Self {
        Self { total: 0 }
    }

    /// Bytes requested so far, padding included.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl CloneAllocator for SizingAllocator {
    fn allocate<T>(&mut self, count: usize) -> Result<Option<NonNull<T>>, CloneError> {
        if align_of::<T>() > FLAT_ALIGN {
            return Err(CloneError::UnsupportedAlignment {
                align: align_of::<T>(),
            });
        }
        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(CloneError::SizeOverflow)?;
        self.total = self
            .total
            .checked_add(padding_for::<T>(self.total))
            .and_then(|start| start.checked_add(bytes))
            .ok_or(CloneError::SizeOverflow)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(padding_for::<u8>(7), 0);
        assert_eq!(padding_for::<u32>(0), 0);
        assert_eq!(padding_for::<u32>(5), 3);
        assert_eq!(padding_for::<u64>(8), 0);
        assert_eq!(padding_for::<u64>(9), 7);
    }

    #[test]
    fn accumulates_with_alignment() {
        let mut sizing = SizingAllocator::new();
        assert!(sizing.allocate::<u8>(3).unwrap().is_none());
        assert_eq!(sizing.total(), 3);
        sizing.allocate::<u64>(2).unwrap();
        assert_eq!(sizing.total(), 8 + 16);
        sizing.allocate::<u8>(0).unwrap();
        assert_eq!(sizing.total(), 24);
    }

    #[test]
    fn overflow_is_reported() {
        let mut sizing = SizingAllocator::new();
        assert_eq!(
            sizing.allocate::<u64>(usize::MAX),
            Err(CloneError::SizeOverflow)
        );
    }

    #[test]
    fn over_aligned_types_are_rejected() {
        #[repr(align(64))]
        struct Line([u8; 64]);

        let mut sizing = SizingAllocator::new();
        assert_eq!(
            sizing.allocate::<Line>(1),
            Err(CloneError::UnsupportedAlignment { align: 64 })
        );
    }
}
