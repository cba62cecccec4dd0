//! Shared memory segments for producer/consumer IPC.
//!
//! A [`Segment`] is a contiguous memory range holding a small header, a named
//! object directory and a heap. Everything stored in the heap refers to other
//! heap objects by [`ShmPtr`] (an offset from the segment base), so the same
//! bytes can be mapped at a different address in every process.
//!
//! # Building blocks
//!
//! - [`Segment`]: size-class heap (lock-free per-class free lists, bump
//!   fallback, splitting of larger blocks) plus the named object directory
//! - [`SegmentAllocator`]: a typed, rebindable allocator bound to a segment
//! - [`ShmBox`], [`ShmVec`], [`ShmString`]: offset-based containers
//! - [`ShmDrop`]: how segment values release what they own
//! - [`ShmUnique`]: process-local owning handle, frees the whole object graph
//!   on drop
//! - [`NamedSegment`]: a segment in a named, memory-mapped file (unix, `std`)
//!
//! # Loom Testing
//!
//! Enable the `loom` feature to check the allocator's free lists under every
//! interleaving:
//!
//! ```text
//! cargo test -p pmipc-shm --features loom
//! ```

#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod allocator;
pub mod boxed;
pub mod error;
#[cfg(any(test, feature = "alloc"))]
pub mod graph;
#[cfg(all(feature = "std", unix))]
pub mod named;
pub mod ptr;
pub mod region;
pub mod release;
pub mod segment;
pub mod string;
pub mod sync;
pub mod vec;

pub use allocator::SegmentAllocator;
pub use boxed::{ShmBox, ShmUnique};
pub use error::{AllocError, SegmentError};
#[cfg(all(feature = "std", unix))]
pub use named::{NamedSegment, NamedSegmentError};
pub use ptr::ShmPtr;
#[cfg(any(test, feature = "alloc"))]
pub use region::HeapRegion;
pub use region::Region;
pub use release::{ShmDrop, ShmGuard};
pub use segment::{
    HEAP_OFFSET, MAX_ALIGN, MAX_BLOCK_SIZE, NUM_SIZE_CLASSES, SEGMENT_OVERHEAD, Segment,
    SegmentStatus,
};
pub use string::ShmString;
pub use vec::ShmVec;

#[cfg(all(test, feature = "loom"))]
mod loom_tests;
