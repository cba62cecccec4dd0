//! Segment heap under random allocate/free sequences.

use pmipc_shm::segment::{class_size, size_class_for};
use pmipc_shm::{AllocError, HeapRegion, MAX_ALIGN, SEGMENT_OVERHEAD, Segment};

/// Smallest heap the harness builds.
pub const MIN_HEAP: usize = 256;
/// Largest heap the harness builds (small, so exhaustion is common).
pub const MAX_HEAP: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapOp {
    /// Allocate `size` bytes.
    Alloc(usize),
    /// Free the live block at this index (modulo the live count).
    Free(usize),
    /// Free everything still live.
    FreeAll,
}

#[derive(Debug, Clone, Copy)]
struct Live {
    offset: u64,
    size: usize,
    fill: u8,
}

/// Run `ops` against a fresh segment with `heap` bytes of heap.
///
/// Checks that blocks are aligned, in bounds, disjoint and keep their
/// contents, that exhaustion is only reported when neither the bump space
/// nor any free list can serve the request, and that freeing everything
/// restores every byte.
pub fn execute_and_verify(heap: usize, ops: &[HeapOp]) -> Result<(), String> {
    let heap = heap.clamp(MIN_HEAP, MAX_HEAP);
    let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + heap);
    // SAFETY: the region is freshly allocated and outlives the segment.
    let segment = unsafe { Segment::init(owner.region()) }.map_err(|e| e.to_string())?;
    let capacity = segment.heap_capacity();
    let mut live: Vec<Live> = Vec::new();
    let mut next_fill = 1u8;

    for (i, op) in ops.iter().enumerate() {
        match *op {
            HeapOp::Alloc(size) => match segment.allocate(size, MAX_ALIGN) {
                Ok(offset) => {
                    if offset % MAX_ALIGN as u64 != 0 {
                        return Err(format!("op {}: offset {} misaligned", i, offset));
                    }
                    let end = offset + size as u64;
                    let heap_end = (SEGMENT_OVERHEAD + capacity) as u64;
                    if offset < SEGMENT_OVERHEAD as u64 || end > heap_end {
                        return Err(format!("op {}: block {}..{} out of bounds", i, offset, end));
                    }
                    if let Some(other) = live
                        .iter()
                        .find(|l| offset < l.offset + l.size as u64 && l.offset < end)
                    {
                        return Err(format!(
                            "op {}: block {}..{} overlaps live block at {}",
                            i, offset, end, other.offset
                        ));
                    }
                    let fill = next_fill;
                    next_fill = next_fill.wrapping_add(1).max(1);
                    // SAFETY: freshly allocated, `size` bytes in bounds.
                    unsafe { owner.region().as_ptr().add(offset as usize).write_bytes(fill, size) };
                    live.push(Live { offset, size, fill });
                }
                Err(AllocError::Exhausted { .. }) => {
                    let Some(class) = size_class_for(size) else {
                        return Err(format!("op {}: exhausted for oversized request {}", i, size));
                    };
                    let status = segment.status();
                    let uncarved = status.heap - status.carved;
                    let parked = status.free_blocks[class..].iter().any(|n| *n > 0);
                    if parked || uncarved >= class_size(class) {
                        return Err(format!(
                            "op {}: exhausted for {} bytes with room left ({})",
                            i, size, status
                        ));
                    }
                }
                Err(AllocError::TooLarge { .. }) => {}
                Err(e) => return Err(format!("op {}: unexpected error {:?}", i, e)),
            },
            HeapOp::Free(index) => {
                if live.is_empty() {
                    continue;
                }
                let block = live.swap_remove(index % live.len());
                check_contents(&owner, &block).map_err(|e| format!("op {}: {}", i, e))?;
                // SAFETY: allocated above with this size and freed once.
                unsafe { segment.deallocate(block.offset, block.size) };
            }
            HeapOp::FreeAll => {
                for block in live.drain(..) {
                    check_contents(&owner, &block).map_err(|e| format!("op {}: {}", i, e))?;
                    // SAFETY: as above.
                    unsafe { segment.deallocate(block.offset, block.size) };
                }
                if segment.free_bytes() != capacity {
                    return Err(format!(
                        "op {}: {} of {} bytes free after releasing everything",
                        i,
                        segment.free_bytes(),
                        capacity
                    ));
                }
            }
        }
    }

    for block in &live {
        check_contents(&owner, block)?;
    }
    Ok(())
}

fn check_contents(owner: &HeapRegion, block: &Live) -> Result<(), String> {
    // SAFETY: the block is live and in bounds.
    let bytes = unsafe {
        std::slice::from_raw_parts(owner.region().as_ptr().add(block.offset as usize), block.size)
    };
    match bytes.iter().position(|b| *b != block.fill) {
        Some(at) => Err(format!(
            "block at {} corrupted at byte {}",
            block.offset, at
        )),
        None => Ok(()),
    }
}
