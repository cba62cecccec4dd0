#![cfg(all(test, feature = "loom"))]

use crate::region::HeapRegion;
use crate::segment::{HEAP_OFFSET, Segment};
use crate::sync::thread;
use loom::sync::Arc;

fn shared_segment(heap: usize) -> (Arc<HeapRegion>, Arc<Segment>) {
    let owner = Arc::new(HeapRegion::new_zeroed(HEAP_OFFSET + heap));
    let segment = unsafe { Segment::init(owner.region()) }.unwrap();
    (owner, Arc::new(segment))
}

#[test]
fn concurrent_alloc_free_same_class() {
    loom::model(|| {
        let (owner, segment) = shared_segment(64);
        // Park one block so both threads race on the free list first.
        let parked = segment.allocate(16, 8).unwrap();
        unsafe { segment.deallocate(parked, 16) };
        let before = segment.free_bytes();

        let handles: alloc::vec::Vec<_> = (0..2)
            .map(|_| {
                let segment = segment.clone();
                let owner = owner.clone();
                thread::spawn(move || {
                    let _keep = owner;
                    let offset = segment.allocate(16, 8).unwrap();
                    unsafe { segment.deallocate(offset, 16) };
                    offset
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(segment.free_bytes(), before);
    });
}

#[test]
fn concurrent_allocations_never_overlap() {
    loom::model(|| {
        let (owner, segment) = shared_segment(64);

        let t1_segment = segment.clone();
        let t1_owner = owner.clone();
        let t1 = thread::spawn(move || {
            let _keep = t1_owner;
            t1_segment.allocate(16, 8).ok()
        });

        let t2_segment = segment.clone();
        let t2_owner = owner.clone();
        let t2 = thread::spawn(move || {
            let _keep = t2_owner;
            t2_segment.allocate(32, 8).ok()
        });

        let a = t1.join().unwrap().unwrap();
        let b = t2.join().unwrap().unwrap();
        let (a_end, b_end) = (a + 16, b + 32);
        assert!(a_end <= b || b_end <= a, "blocks overlap: {a}..{a_end} / {b}..{b_end}");
    });
}

#[test]
fn split_races_with_free() {
    loom::model(|| {
        // One 64-byte block, already carved and parked.
        let (owner, segment) = shared_segment(64);
        let big = segment.allocate(64, 8).unwrap();
        unsafe { segment.deallocate(big, 64) };

        let t1_segment = segment.clone();
        let t1_owner = owner.clone();
        let t1 = thread::spawn(move || {
            let _keep = t1_owner;
            t1_segment.allocate(16, 8).ok()
        });

        let t2_segment = segment.clone();
        let t2_owner = owner.clone();
        let t2 = thread::spawn(move || {
            let _keep = t2_owner;
            t2_segment.allocate(16, 8).ok()
        });

        // A thread can observe every list empty while the other is midway
        // through a split; it then reports exhaustion.
        let got: alloc::vec::Vec<u64> = [t1.join().unwrap(), t2.join().unwrap()]
            .into_iter()
            .flatten()
            .collect();
        assert!(!got.is_empty());
        if let [a, b] = got[..] {
            assert_ne!(a, b);
        }
        assert_eq!(segment.free_bytes(), 64 - 16 * got.len());
    });
}

#[test]
fn coalesce_races_with_free() {
    loom::model(|| {
        // Four 16-byte blocks fill the heap; the first two are free.
        let (owner, segment) = shared_segment(64);
        let blocks = [(); 4].map(|_| segment.allocate(16, 8).unwrap());
        unsafe {
            segment.deallocate(blocks[0], 16);
            segment.deallocate(blocks[1], 16);
        }

        let t1_segment = segment.clone();
        let t1_owner = owner.clone();
        let t1 = thread::spawn(move || {
            let _keep = t1_owner;
            t1_segment.allocate(32, 8).ok()
        });

        let t2_segment = segment.clone();
        let t2_owner = owner.clone();
        let t2 = thread::spawn(move || {
            let _keep = t2_owner;
            unsafe { t2_segment.deallocate(blocks[2], 16) };
        });

        assert_eq!(t1.join().unwrap(), Some(blocks[0]));
        t2.join().unwrap();
        // blocks[3] and the 32-byte block stay live.
        assert_eq!(segment.free_bytes(), 16);
    });
}
