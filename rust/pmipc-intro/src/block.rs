//! The placement pass and the buffer a finished clone lives in.

use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use pmipc_shm::Segment;

use crate::clone::{ApiClone, CloneAllocator};
use crate::error::CloneError;
use crate::probe::{SizingAllocator, padding_for};

/// Alignment of every flat buffer, and the largest alignment a plain
/// counterpart may ask for.
pub const FLAT_ALIGN: usize = 16;

/// Carves consecutive ranges out of one caller-provided buffer.
pub struct FlatAllocator<'b> {
    base: NonNull<u8>,
    capacity: usize,
    cursor: usize,
    _buffer: PhantomData<&'b mut [u8]>,
}

impl<'b> FlatAllocator<'b> {
    /// Fails unless `buffer` starts on a [`FLAT_ALIGN`] boundary.
    pub fn new(buffer: &'b mut [u8]) -> Result<Self, CloneError> {
        if !(buffer.as_ptr() as usize).is_multiple_of(FLAT_ALIGN) {
            return Err(CloneError::MisalignedBuffer { align: FLAT_ALIGN });
        }
        Ok(Self {
            capacity: buffer.len(),
            base: NonNull::from(buffer).cast(),
            cursor: 0,
            _buffer: PhantomData,
        })
    }

    /// Bytes handed out so far, padding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl CloneAllocator for FlatAllocator<'_> {
    fn allocate<T>(&mut self, count: usize) -> Result<Option<NonNull<T>>, CloneError> {
        if align_of::<T>() > FLAT_ALIGN {
            return Err(CloneError::UnsupportedAlignment {
                align: align_of::<T>(),
            });
        }
        let bytes = size_of::<T>()
            .checked_mul(count)
            .ok_or(CloneError::SizeOverflow)?;
        let start = self
            .cursor
            .checked_add(padding_for::<T>(self.cursor))
            .ok_or(CloneError::SizeOverflow)?;
        let end = start.checked_add(bytes).ok_or(CloneError::SizeOverflow)?;
        if end > self.capacity {
            return Err(CloneError::BufferOverflow {
                needed: end,
                capacity: self.capacity,
            });
        }
        self.cursor = end;
        // SAFETY: start <= capacity, and the base is FLAT_ALIGN aligned so
        // offset alignment is address alignment.
        Ok(Some(unsafe { self.base.add(start) }.cast()))
    }
}

/// One [`FLAT_ALIGN`] aligned heap block, freed as a unit.
pub struct FlatBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: plain owned bytes.
unsafe impl Send for FlatBuffer {}
unsafe impl Sync for FlatBuffer {}

impl FlatBuffer {
    /// `len` bytes, every one set to `fill`.
    pub fn new_filled(len: usize, fill: u8) -> Result<Self, CloneError> {
        let layout = Layout::from_size_align(len.max(1), FLAT_ALIGN)
            .map_err(|_| CloneError::SizeOverflow)?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };
        // SAFETY: freshly allocated, layout.size() >= len.
        unsafe { ptr.as_ptr().write_bytes(fill, layout.size()) };
        Ok(Self { ptr, len, layout })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: owned, initialized, `len` bytes long.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for FlatBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `new_filled` with this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl std::fmt::Debug for FlatBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// A cloned tree and the buffer holding it.
///
/// Derefs to the root counterpart. The tree does not reference the source
/// segment, so it stays valid after the segment is unmapped.
pub struct FlatClone<T> {
    root: NonNull<T>,
    buffer: FlatBuffer,
}

// SAFETY: the root and everything it points to live in `buffer`, which moves
// with the clone and is never written after placement.
unsafe impl<T: Sync> Send for FlatClone<T> {}
unsafe impl<T: Sync> Sync for FlatClone<T> {}

impl<T> FlatClone<T> {
    /// Size of the backing buffer in bytes.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}

impl<T> Deref for FlatClone<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: placed and initialized by `deep_clone`; lives as long as `buffer`.
        unsafe { self.root.as_ref() }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for FlatClone<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatClone")
            .field("size", &self.size())
            .field("root", &**self)
            .finish()
    }
}

/// Bytes a flat clone of `node` needs.
pub fn measure<N: ApiClone>(node: &N, segment: &Segment) -> Result<usize, CloneError> {
    let mut sizing = SizingAllocator::new();
    node.api_clone(segment, &mut sizing)?;
    Ok(sizing.total())
}

/// Place a clone of `node` at the start of `buffer`.
///
/// Returns the root and the number of bytes used.
pub fn clone_into<'b, N: ApiClone>(
    node: &N,
    segment: &Segment,
    buffer: &'b mut [u8],
) -> Result<(&'b N::Api, usize), CloneError> {
    let mut flat = FlatAllocator::new(buffer)?;
    let root = node.api_clone(segment, &mut flat)?;
    // SAFETY: placed into `buffer`, which we borrow for 'b.
    let root = unsafe { root.as_ref() }.ok_or(CloneError::MissingRoot)?;
    Ok((root, flat.used()))
}

/// Measure, allocate and place `node` in one owned buffer.
pub fn deep_clone<N: ApiClone>(
    node: &N,
    segment: &Segment,
) -> Result<FlatClone<N::Api>, CloneError> {
    let measured = measure(node, segment)?;
    let mut buffer = FlatBuffer::new_filled(measured, 0)?;

    let (root, placed) = clone_into(node, segment, buffer.as_mut_slice())?;
    if placed != measured {
        return Err(CloneError::SizeMismatch { measured, placed });
    }
    let root = NonNull::from(root);

    tracing::debug!(bytes = measured, "cloned tree out of segment");
    Ok(FlatClone { root, buffer })
}
