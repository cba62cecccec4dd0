//! Segment layout and the size-class heap allocator.
//!
//! # Memory Layout
//!
//! ```text
//! +-------------------------------------------------------------------+
//! | SEGMENT HEADER (256 bytes)                                        |
//! |   magic: "PMIPCSG\0", version, total_size, heap_offset            |
//! |   bump cursor (atomic), free list head per size class (atomic)    |
//! +-------------------------------------------------------------------+
//! | NAMED OBJECT DIRECTORY (DIRECTORY_ENTRIES entries, 64 bytes each) |
//! |   name, published offset                                          |
//! +-------------------------------------------------------------------+
//! | HEAP                                                              |
//! |   blocks of 16 << class bytes, carved by the bump cursor and      |
//! |   recycled through per-class free lists                           |
//! +-------------------------------------------------------------------+
//! ```
//!
//! # Allocation Strategy
//!
//! 1. Round the request up to the smallest size class that fits
//! 2. Pop from that class's free list (tagged Treiber stack, O(1) with CAS)
//! 3. If empty, advance the bump cursor
//! 4. If the heap is fully carved, split a block taken from a larger class
//! 5. Otherwise merge neighbouring free blocks (returning a run that ends at
//!    the bump cursor to it) and try once more
//! 6. Otherwise report exhaustion
//!
//! Every reference stored inside the segment is an offset from the segment
//! base, never an address.

use core::mem::{align_of, size_of};

use crate::allocator::SegmentAllocator;
use crate::error::{AllocError, SegmentError};
use crate::ptr::ShmPtr;
use crate::region::Region;
use crate::sync::{AtomicU64, Ordering, spin_loop};

/// Magic bytes identifying a pmipc segment.
pub const SEGMENT_MAGIC: [u8; 8] = *b"PMIPCSG\0";

/// Current layout version (major.minor packed into u32).
pub const SEGMENT_VERSION: u32 = 1 << 16; // v1.0

/// Number of heap size classes.
pub const NUM_SIZE_CLASSES: usize = 17;

/// Block size of class 0. Every heap block is aligned to this.
pub const MIN_BLOCK_SIZE: usize = 16;

/// Block size of the largest class (1 MiB).
pub const MAX_BLOCK_SIZE: usize = MIN_BLOCK_SIZE << (NUM_SIZE_CLASSES - 1);

/// Largest element alignment the heap can honor.
pub const MAX_ALIGN: usize = MIN_BLOCK_SIZE;

/// Number of named object slots.
pub const DIRECTORY_ENTRIES: usize = 16;

/// Longest name a directory entry can hold.
pub const MAX_NAME_LEN: usize = 47;

/// Sentinel value indicating end of free list.
pub const FREE_LIST_END: u32 = u32::MAX;

/// Offset of the first heap block.
pub const HEAP_OFFSET: usize = align_up(
    size_of::<SegmentHeader>() + DIRECTORY_ENTRIES * size_of::<DirectoryEntry>(),
    64,
);

/// Smallest region a segment can be formatted into. A segment of exactly this
/// size has an empty heap.
pub const SEGMENT_OVERHEAD: usize = HEAP_OFFSET;

// =============================================================================
// Header
// =============================================================================

/// Segment header at the start of the region (256 bytes).
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic bytes: "PMIPCSG\0".
    pub magic: [u8; 8],
    /// Layout version (major.minor packed).
    pub version: u32,
    /// Feature flags (none defined).
    pub flags: u32,
    /// Size of the formatted region in bytes.
    pub total_size: u64,
    /// Offset of the first heap block.
    pub heap_offset: u64,
    /// Next never-allocated heap byte.
    pub bump: AtomicU64,
    /// Free list head per class: block index (low 32 bits) + tag (high 32 bits).
    pub free_heads: [AtomicU64; NUM_SIZE_CLASSES],
    _pad: [u8; 80],
}

#[cfg(not(feature = "loom"))]
const _: () = assert!(size_of::<SegmentHeader>() == 256);

impl SegmentHeader {
    fn new(total_size: u64) -> Self {
        Self {
            magic: SEGMENT_MAGIC,
            version: SEGMENT_VERSION,
            flags: 0,
            total_size,
            heap_offset: HEAP_OFFSET as u64,
            bump: AtomicU64::new(HEAP_OFFSET as u64),
            free_heads: core::array::from_fn(|_| {
                AtomicU64::new(pack_free_head(FREE_LIST_END, 0))
            }),
            _pad: [0; 80],
        }
    }

    /// Validate the header against the region it was found in.
    pub fn validate(&self, region_len: usize) -> Result<(), SegmentError> {
        if self.magic != SEGMENT_MAGIC {
            return Err(SegmentError::InvalidMagic);
        }
        let major = self.version >> 16;
        let our_major = SEGMENT_VERSION >> 16;
        if major != our_major {
            return Err(SegmentError::IncompatibleVersion {
                expected: SEGMENT_VERSION,
                found: self.version,
            });
        }
        if self.heap_offset != HEAP_OFFSET as u64 {
            return Err(SegmentError::InvalidConfig("unexpected heap offset"));
        }
        if self.total_size > region_len as u64 {
            return Err(SegmentError::SegmentTooSmall {
                required: self.total_size as usize,
                found: region_len,
            });
        }
        if self.total_size < HEAP_OFFSET as u64 {
            return Err(SegmentError::InvalidConfig("total size below header size"));
        }
        Ok(())
    }
}

// =============================================================================
// Directory
// =============================================================================

/// One named object slot (64 bytes).
///
/// An entry is free while `offset` is zero. The producer writes the name first
/// and publishes the offset last, with release ordering.
#[repr(C, align(64))]
pub struct DirectoryEntry {
    name: [u8; 48],
    name_len: u32,
    _pad: u32,
    offset: AtomicU64,
}

#[cfg(not(feature = "loom"))]
const _: () = assert!(size_of::<DirectoryEntry>() == 64);

impl DirectoryEntry {
    fn empty() -> Self {
        Self {
            name: [0; 48],
            name_len: 0,
            _pad: 0,
            offset: AtomicU64::new(0),
        }
    }

    fn name(&self) -> &[u8] {
        let len = (self.name_len as usize).min(MAX_NAME_LEN);
        &self.name[..len]
    }
}

// =============================================================================
// Segment
// =============================================================================

/// A process-local view of a formatted segment.
///
/// The segment does not own its memory; see [`crate::NamedSegment`] and
/// [`crate::HeapRegion`] for owners. Allocation and deallocation are lock-free
/// and may be called from several threads; directory publication assumes a
/// single writer.
pub struct Segment {
    region: Region,
    heap_end: u64,
}

unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Format a new segment over the whole region.
    ///
    /// # Safety
    ///
    /// The region must be writable and exclusively owned during initialization.
    pub unsafe fn init(region: Region) -> Result<Self, SegmentError> {
        check_region_size(region.len())?;

        let total_size = region.len() as u64;
        // SAFETY: region is at least HEAP_OFFSET bytes and 64-byte aligned.
        unsafe {
            (region.offset(0) as *mut SegmentHeader).write(SegmentHeader::new(total_size));
            for i in 0..DIRECTORY_ENTRIES {
                (region.offset(directory_offset(i)) as *mut DirectoryEntry)
                    .write(DirectoryEntry::empty());
            }
        }

        #[cfg(feature = "std")]
        tracing::debug!(
            total_size,
            heap_bytes = total_size - HEAP_OFFSET as u64,
            "formatted segment"
        );

        Ok(Self {
            region,
            heap_end: heap_end(total_size),
        })
    }

    /// Attach to a segment formatted by another process (or mapping).
    ///
    /// # Safety
    ///
    /// The region must stay mapped while the segment is used, and any other
    /// writer must only mutate it through this module's operations.
    pub unsafe fn attach(region: Region) -> Result<Self, SegmentError> {
        if region.len() < HEAP_OFFSET {
            return Err(SegmentError::SegmentTooSmall {
                required: HEAP_OFFSET,
                found: region.len(),
            });
        }
        // SAFETY: at least a header's worth of bytes are mapped.
        let header = unsafe { region.get::<SegmentHeader>(0) };
        header.validate(region.len())?;
        let total_size = header.total_size;

        #[cfg(feature = "std")]
        tracing::debug!(total_size, "attached to segment");

        Ok(Self {
            region,
            heap_end: heap_end(total_size),
        })
    }

    #[inline]
    fn header(&self) -> &SegmentHeader {
        // SAFETY: validated in init/attach.
        unsafe { self.region.get::<SegmentHeader>(0) }
    }

    #[inline]
    fn directory_entry(&self, index: usize) -> &DirectoryEntry {
        debug_assert!(index < DIRECTORY_ENTRIES);
        // SAFETY: the directory lies inside the validated header area.
        unsafe { self.region.get::<DirectoryEntry>(directory_offset(index)) }
    }

    /// An untyped allocator bound to this segment. Rebind it to allocate.
    pub fn allocator(&self) -> SegmentAllocator<'_> {
        SegmentAllocator::new(self)
    }

    /// The underlying region.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Size of the formatted segment in bytes.
    pub fn size(&self) -> usize {
        self.header().total_size as usize
    }

    /// Bytes available to the heap when it is empty.
    pub fn heap_capacity(&self) -> usize {
        (self.heap_end - HEAP_OFFSET as u64) as usize
    }

    // -------------------------------------------------------------------------
    // Allocation
    // -------------------------------------------------------------------------

    /// Reserve a block of at least `size` bytes aligned to `align`.
    ///
    /// Returns the block's segment offset.
    pub fn allocate(&self, size: usize, align: usize) -> Result<u64, AllocError> {
        if align > MAX_ALIGN {
            return Err(AllocError::UnsupportedAlignment { align });
        }
        let class = size_class_for(size).ok_or(AllocError::TooLarge {
            requested: size,
            max: MAX_BLOCK_SIZE,
        })?;

        if let Some(offset) = self.take_block(class) {
            return Ok(offset);
        }
        if self.coalesce()
            && let Some(offset) = self.take_block(class)
        {
            return Ok(offset);
        }

        Err(AllocError::Exhausted {
            requested: class_size(class),
            free: self.free_bytes(),
        })
    }

    /// Return a block obtained from [`Segment::allocate`].
    ///
    /// # Safety
    ///
    /// `offset` must come from `allocate` on this segment with the same `size`,
    /// and must not be used or returned again afterwards.
    pub unsafe fn deallocate(&self, offset: u64, size: usize) {
        let Some(class) = size_class_for(size) else {
            debug_assert!(false, "deallocate with size {} beyond any class", size);
            return;
        };
        debug_assert!(offset >= HEAP_OFFSET as u64 && offset < self.heap_end);
        debug_assert!(offset.is_multiple_of(MIN_BLOCK_SIZE as u64));
        self.push_free(class, offset);
    }

    fn take_block(&self, class: usize) -> Option<u64> {
        self.pop_free(class)
            .or_else(|| self.bump(class_size(class)))
            .or_else(|| self.split_from_larger(class))
    }

    fn bump(&self, block: usize) -> Option<u64> {
        let header = self.header();
        let mut current = header.bump.load(Ordering::Acquire);

        loop {
            let end = current.checked_add(block as u64)?;
            if end > self.heap_end {
                return None;
            }
            match header.bump.compare_exchange_weak(
                current,
                end,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(current),
                Err(actual) => {
                    current = actual;
                    spin_loop();
                }
            }
        }
    }

    /// Take a block from a larger class, keep its head and park the tail on
    /// the free lists of every class in between.
    fn split_from_larger(&self, class: usize) -> Option<u64> {
        for larger in (class + 1)..NUM_SIZE_CLASSES {
            let Some(offset) = self.pop_free(larger) else {
                continue;
            };
            // Block of class `larger` = head (class) + one block each of
            // class..larger, laid out back to back.
            for c in class..larger {
                self.push_free(c, offset + class_size(c) as u64);
            }
            return Some(offset);
        }
        None
    }

    fn pop_free(&self, class: usize) -> Option<u64> {
        let head = &self.header().free_heads[class];

        loop {
            let old_head = head.load(Ordering::Acquire);
            let (index, tag) = unpack_free_head(old_head);

            if index == FREE_LIST_END {
                return None;
            }

            // SAFETY: index came from the free list, so it names a heap block.
            let next = unsafe { self.read_next_free(index) };
            let new_head = pack_free_head(next, tag.wrapping_add(1));

            match head.compare_exchange_weak(
                old_head,
                new_head,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(block_offset(index)),
                Err(_) => spin_loop(),
            }
        }
    }

    fn push_free(&self, class: usize, offset: u64) {
        let head = &self.header().free_heads[class];
        let index = block_index(offset);

        loop {
            let old_head = head.load(Ordering::Acquire);
            let (old_index, tag) = unpack_free_head(old_head);

            // SAFETY: the caller owns the block being pushed.
            unsafe { self.write_next_free(index, old_index) };

            let new_head = pack_free_head(index, tag.wrapping_add(1));

            if head
                .compare_exchange_weak(old_head, new_head, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }
            spin_loop();
        }
    }

    // -------------------------------------------------------------------------
    // Coalescing
    // -------------------------------------------------------------------------

    /// Merge neighbouring free blocks.
    ///
    /// Drains every free list, sorts the drained blocks by offset (merge sort
    /// over the links stored in the blocks themselves), joins adjacent blocks
    /// into runs and hands each run back: to the bump cursor when the run ends
    /// at it, otherwise as the fewest blocks that tile it. Returns whether any
    /// two blocks were joined.
    ///
    /// Blocks drained here are invisible to other threads until they are
    /// handed back, so a concurrent allocation may see exhaustion meanwhile.
    fn coalesce(&self) -> bool {
        let mut list = FREE_LIST_END;
        let mut len = 0usize;
        for class in 0..NUM_SIZE_CLASSES {
            let mut index = self.take_free_list(class);
            while index != FREE_LIST_END {
                // SAFETY: the whole list is ours after `take_free_list`.
                unsafe {
                    let next = self.read_next_free(index);
                    self.write_free_class(index, class as u32);
                    self.write_next_free(index, list);
                    list = index;
                    index = next;
                }
                len += 1;
            }
        }
        if len == 0 {
            return false;
        }

        // SAFETY: every block on `list` is drained and owned by this call.
        let mut index = unsafe { self.sort_free_run(list, len) };
        let mut merged = false;
        let mut run: Option<(u64, u64)> = None;
        while index != FREE_LIST_END {
            // SAFETY: as above. Both words are read before the run that
            // follows may be handed back and overwritten.
            let (next, class) =
                unsafe { (self.read_next_free(index), self.read_free_class(index)) };
            let start = block_offset(index);
            let end = start + class_size(class as usize) as u64;
            run = match run {
                Some((run_start, run_end)) if run_end == start => {
                    merged = true;
                    Some((run_start, end))
                }
                Some((run_start, run_end)) => {
                    merged |= self.release_run(run_start, run_end);
                    Some((start, end))
                }
                None => Some((start, end)),
            };
            index = next;
        }
        if let Some((start, end)) = run {
            merged |= self.release_run(start, end);
        }

        #[cfg(feature = "std")]
        tracing::debug!(blocks = len, merged, "coalesced free lists");

        merged
    }

    /// Detach a whole free list. Returns its first block index.
    fn take_free_list(&self, class: usize) -> u32 {
        let head = &self.header().free_heads[class];
        let mut current = head.load(Ordering::Acquire);
        loop {
            let (index, tag) = unpack_free_head(current);
            if index == FREE_LIST_END {
                return FREE_LIST_END;
            }
            match head.compare_exchange_weak(
                current,
                pack_free_head(FREE_LIST_END, tag.wrapping_add(1)),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return index,
                Err(actual) => {
                    current = actual;
                    spin_loop();
                }
            }
        }
    }

    /// Return the free run `start..end`. Returns whether the bump cursor
    /// took it back.
    fn release_run(&self, start: u64, end: u64) -> bool {
        if self
            .header()
            .bump
            .compare_exchange(end, start, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return true;
        }
        let mut offset = start;
        while offset < end {
            let remaining = (end - offset) as usize;
            let class = (0..NUM_SIZE_CLASSES)
                .rev()
                .find(|c| class_size(*c) <= remaining)
                .unwrap_or(0);
            self.push_free(class, offset);
            offset += class_size(class) as u64;
        }
        false
    }

    /// Sort `len` linked blocks starting at `head` by offset.
    ///
    /// # Safety
    ///
    /// The caller owns every block on the list.
    unsafe fn sort_free_run(&self, head: u32, len: usize) -> u32 {
        if len <= 1 {
            return head;
        }
        let half = len / 2;
        let mut last = head;
        for _ in 1..half {
            last = unsafe { self.read_next_free(last) };
        }
        let second = unsafe { self.read_next_free(last) };
        unsafe { self.write_next_free(last, FREE_LIST_END) };

        let a = unsafe { self.sort_free_run(head, half) };
        let b = unsafe { self.sort_free_run(second, len - half) };
        unsafe { self.merge_free_runs(a, b) }
    }

    unsafe fn merge_free_runs(&self, mut a: u32, mut b: u32) -> u32 {
        let mut head = FREE_LIST_END;
        let mut tail = FREE_LIST_END;
        while a != FREE_LIST_END && b != FREE_LIST_END {
            let taken = if a < b {
                let taken = a;
                a = unsafe { self.read_next_free(a) };
                taken
            } else {
                let taken = b;
                b = unsafe { self.read_next_free(b) };
                taken
            };
            if tail == FREE_LIST_END {
                head = taken;
            } else {
                unsafe { self.write_next_free(tail, taken) };
            }
            tail = taken;
        }
        let rest = if a != FREE_LIST_END { a } else { b };
        if tail == FREE_LIST_END {
            return rest;
        }
        unsafe { self.write_next_free(tail, rest) };
        head
    }

    // Drained blocks carry their class in the word after the link.

    #[inline]
    unsafe fn read_free_class(&self, index: u32) -> u32 {
        let ptr = unsafe { self.region.offset(block_offset(index) as usize + 4) as *const u32 };
        unsafe { core::ptr::read_volatile(ptr) }
    }

    #[inline]
    unsafe fn write_free_class(&self, index: u32, class: u32) {
        let ptr = unsafe { self.region.offset(block_offset(index) as usize + 4) as *mut u32 };
        unsafe { core::ptr::write_volatile(ptr, class) };
    }

    #[inline]
    unsafe fn read_next_free(&self, index: u32) -> u32 {
        let offset = block_offset(index);
        debug_assert!(offset + 4 <= self.heap_end);
        let ptr = unsafe { self.region.offset(offset as usize) as *const u32 };
        unsafe { core::ptr::read_volatile(ptr) }
    }

    #[inline]
    unsafe fn write_next_free(&self, index: u32, next: u32) {
        let offset = block_offset(index);
        debug_assert!(offset + 4 <= self.heap_end);
        let ptr = unsafe { self.region.offset(offset as usize) as *mut u32 };
        unsafe { core::ptr::write_volatile(ptr, next) };
    }

    /// Approximate length of one class's free list.
    fn free_list_len(&self, class: usize) -> u32 {
        let limit = (self.heap_capacity() / class_size(class)) as u32 + 1;
        let mut len = 0u32;
        let (mut current, _tag) =
            unpack_free_head(self.header().free_heads[class].load(Ordering::Acquire));

        while current != FREE_LIST_END && len < limit {
            len += 1;
            if block_offset(current) < self.heap_end {
                current = unsafe { self.read_next_free(current) };
            } else {
                break;
            }
        }
        len
    }

    /// Bytes that can still be handed out: uncarved heap plus every block
    /// parked on a free list. Approximate while other threads allocate.
    ///
    /// Not every free byte serves every request: live blocks between free
    /// ones still fragment the heap.
    pub fn free_bytes(&self) -> usize {
        let bump = self.header().bump.load(Ordering::Acquire);
        let mut free = self.heap_end.saturating_sub(bump) as usize;
        for class in 0..NUM_SIZE_CLASSES {
            free += self.free_list_len(class) as usize * class_size(class);
        }
        free
    }

    /// Snapshot of heap usage (for diagnostics).
    pub fn status(&self) -> SegmentStatus {
        let bump = self.header().bump.load(Ordering::Acquire);
        let mut status = SegmentStatus {
            total: self.size(),
            heap: self.heap_capacity(),
            carved: (bump - HEAP_OFFSET as u64) as usize,
            free: 0,
            free_blocks: [0; NUM_SIZE_CLASSES],
            published: 0,
        };
        for class in 0..NUM_SIZE_CLASSES {
            status.free_blocks[class] = self.free_list_len(class);
        }
        status.free = self.free_bytes();
        status.published = (0..DIRECTORY_ENTRIES)
            .filter(|i| self.directory_entry(*i).offset.load(Ordering::Acquire) != 0)
            .count();
        status
    }

    // -------------------------------------------------------------------------
    // Typed access
    // -------------------------------------------------------------------------

    /// Resolve `count` consecutive `T` at `ptr`, checking that they lie inside
    /// the heap and are aligned.
    ///
    /// Use this for any offset read out of the segment.
    pub fn resolve<T>(&self, ptr: ShmPtr<T>, count: usize) -> Result<*mut T, SegmentError> {
        let offset = ptr.offset();
        let out_of_bounds = SegmentError::OutOfBounds {
            offset,
            len: size_of::<T>().saturating_mul(count),
        };
        let len = size_of::<T>()
            .checked_mul(count)
            .ok_or(out_of_bounds.clone())?;
        let end = offset.checked_add(len as u64).ok_or(out_of_bounds.clone())?;
        if offset < HEAP_OFFSET as u64 || end > self.heap_end {
            return Err(out_of_bounds);
        }
        if !offset.is_multiple_of(align_of::<T>() as u64) {
            return Err(SegmentError::Misaligned {
                offset,
                align: align_of::<T>(),
            });
        }
        // SAFETY: bounds checked above.
        Ok(unsafe { self.region.offset(offset as usize) as *mut T })
    }

    /// Resolve storage this process allocated itself.
    ///
    /// # Safety
    ///
    /// `ptr` must come from an allocator bound to this segment and still be live.
    #[inline]
    pub unsafe fn resolve_unchecked<T>(&self, ptr: ShmPtr<T>) -> *mut T {
        debug_assert!(ptr.offset() >= HEAP_OFFSET as u64 && ptr.offset() < self.heap_end);
        unsafe { self.region.offset(ptr.offset() as usize) as *mut T }
    }

    // -------------------------------------------------------------------------
    // Named objects
    // -------------------------------------------------------------------------

    /// Advertise `ptr` under `name` so other processes can [`find`](Self::find) it.
    pub fn publish<T>(&self, name: &str, ptr: ShmPtr<T>) -> Result<(), SegmentError> {
        check_name(name)?;
        if self.find_entry(name).is_some() {
            return Err(SegmentError::AlreadyPublished);
        }

        let index = (0..DIRECTORY_ENTRIES)
            .find(|i| self.directory_entry(*i).offset.load(Ordering::Acquire) == 0)
            .ok_or(SegmentError::DirectoryFull)?;

        // SAFETY: the entry is free and the directory has a single writer.
        let entry = unsafe { self.region.get_mut::<DirectoryEntry>(directory_offset(index)) };
        entry.name = [0; 48];
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        entry.name_len = name.len() as u32;
        entry.offset.store(ptr.offset(), Ordering::Release);

        #[cfg(feature = "std")]
        tracing::debug!(name, offset = ptr.offset(), "published named object");

        Ok(())
    }

    /// Look up a published object.
    pub fn find<T>(&self, name: &str) -> Option<ShmPtr<T>> {
        self.find_entry(name)
            .map(|index| {
                ShmPtr::from_offset(self.directory_entry(index).offset.load(Ordering::Acquire))
            })
            .filter(|ptr: &ShmPtr<T>| !ptr.is_null())
    }

    /// Withdraw a published name. Returns the offset it pointed to.
    pub fn unpublish<T>(&self, name: &str) -> Option<ShmPtr<T>> {
        let index = self.find_entry(name)?;
        let offset = self
            .directory_entry(index)
            .offset
            .swap(0, Ordering::AcqRel);
        (offset != 0).then(|| ShmPtr::from_offset(offset))
    }

    fn find_entry(&self, name: &str) -> Option<usize> {
        (0..DIRECTORY_ENTRIES).find(|i| {
            let entry = self.directory_entry(*i);
            entry.offset.load(Ordering::Acquire) != 0 && entry.name() == name.as_bytes()
        })
    }
}

/// Heap usage snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SegmentStatus {
    /// Formatted segment size.
    pub total: usize,
    /// Heap bytes (segment minus header and directory).
    pub heap: usize,
    /// Heap bytes ever carved by the bump cursor.
    pub carved: usize,
    /// Bytes available for allocation.
    pub free: usize,
    /// Blocks parked on each class's free list.
    pub free_blocks: [u32; NUM_SIZE_CLASSES],
    /// Number of published names.
    pub published: usize,
}

impl core::fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(
            f,
            "segment: {} bytes, heap {} bytes, {} carved, {} free, {} published",
            self.total, self.heap, self.carved, self.free, self.published
        )?;
        for (class, count) in self.free_blocks.iter().enumerate() {
            if *count > 0 {
                writeln!(
                    f,
                    "  class[{:>2}] ({:>7}B): {:>5} free",
                    class,
                    class_size(class),
                    count
                )?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Block size of a class.
#[inline]
pub const fn class_size(class: usize) -> usize {
    MIN_BLOCK_SIZE << class
}

/// Smallest class whose blocks hold `size` bytes.
pub fn size_class_for(size: usize) -> Option<usize> {
    (0..NUM_SIZE_CLASSES).find(|class| class_size(*class) >= size)
}

fn check_region_size(len: usize) -> Result<(), SegmentError> {
    if len < HEAP_OFFSET {
        return Err(SegmentError::SegmentTooSmall {
            required: HEAP_OFFSET,
            found: len,
        });
    }
    let max = (FREE_LIST_END as u64) * MIN_BLOCK_SIZE as u64;
    if len as u64 >= max {
        return Err(SegmentError::SegmentTooLarge {
            max: max as usize,
            found: len,
        });
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), SegmentError> {
    if name.is_empty() {
        return Err(SegmentError::EmptyName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(SegmentError::NameTooLong {
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

#[inline]
const fn directory_offset(index: usize) -> usize {
    size_of::<SegmentHeader>() + index * size_of::<DirectoryEntry>()
}

#[inline]
const fn heap_end(total_size: u64) -> u64 {
    total_size & !(MIN_BLOCK_SIZE as u64 - 1)
}

#[inline]
const fn block_index(offset: u64) -> u32 {
    (offset / MIN_BLOCK_SIZE as u64) as u32
}

#[inline]
const fn block_offset(index: u32) -> u64 {
    index as u64 * MIN_BLOCK_SIZE as u64
}

#[inline]
fn pack_free_head(index: u32, tag: u32) -> u64 {
    ((tag as u64) << 32) | (index as u64)
}

#[inline]
fn unpack_free_head(packed: u64) -> (u32, u32) {
    let index = packed as u32;
    let tag = (packed >> 32) as u32;
    (index, tag)
}

#[inline]
const fn align_up(value: usize, align: usize) -> usize {
    (value + (align - 1)) & !(align - 1)
}
