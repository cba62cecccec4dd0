//! Bolero harness for the segment heap.
//!
//! Properties tested:
//! - Blocks are 16-byte aligned and inside the heap
//! - Live blocks never overlap and keep their contents
//! - Exhaustion only when no free list or bump space can serve the class
//! - Releasing every block returns every byte

use bolero::check;
use pmipc_fuzz::heap_model::{HeapOp, execute_and_verify};

fn main() {
    check!()
        .with_type::<(u16, Vec<HeapOpInput>)>()
        .for_each(|(heap, ops)| {
            let ops: Vec<HeapOp> = ops.iter().map(HeapOpInput::to_heap_op).collect();
            if let Err(e) = execute_and_verify(*heap as usize, &ops) {
                panic!("Invariant violated: {}", e);
            }
        });
}

/// Fuzz-friendly input type for heap operations.
#[derive(Debug, Clone, bolero::TypeGenerator)]
enum HeapOpInput {
    Small(u8),
    Large(u16),
    Free(u8), // Index into the live list (will be modulo'd)
    FreeAll,
}

impl HeapOpInput {
    fn to_heap_op(&self) -> HeapOp {
        match self {
            HeapOpInput::Small(size) => HeapOp::Alloc(*size as usize),
            HeapOpInput::Large(size) => HeapOp::Alloc(*size as usize * 16),
            HeapOpInput::Free(index) => HeapOp::Free(*index as usize),
            HeapOpInput::FreeAll => HeapOp::FreeAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use pmipc_fuzz::heap_model::{HeapOp, execute_and_verify};

    #[test]
    fn alloc_free_reuse() {
        let ops = vec![
            HeapOp::Alloc(24),
            HeapOp::Alloc(100),
            HeapOp::Free(0),
            HeapOp::Alloc(24),
            HeapOp::FreeAll,
        ];
        execute_and_verify(4096, &ops).unwrap();
    }

    #[test]
    fn exhaust_then_split() {
        // Fill the heap with one big block, free it, then carve small ones
        // out of it by splitting.
        let mut ops = vec![HeapOp::Alloc(2048), HeapOp::FreeAll];
        ops.extend(std::iter::repeat_n(HeapOp::Alloc(16), 200));
        ops.push(HeapOp::FreeAll);
        execute_and_verify(2048, &ops).unwrap();
    }

    #[test]
    fn fragmented_heap_reports_exhaustion_honestly() {
        let mut ops: Vec<HeapOp> = std::iter::repeat_n(HeapOp::Alloc(16), 300).collect();
        ops.push(HeapOp::FreeAll);
        // Only small blocks are parked now; a large request must fail cleanly.
        ops.push(HeapOp::Alloc(1024));
        ops.push(HeapOp::Alloc(16));
        ops.push(HeapOp::FreeAll);
        execute_and_verify(1024, &ops).unwrap();
    }
}
