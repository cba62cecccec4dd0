//! A segment copied to another address must read back identically.

use pmipc_shm::graph::Root;
use pmipc_shm::{HeapRegion, SEGMENT_OVERHEAD, Segment, ShmUnique};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn graph_survives_relocation() {
    init_tracing();

    let producer = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 32 * 1024);
    let segment = unsafe { Segment::init(producer.region()) }.unwrap();
    let root = ShmUnique::new_in(segment.allocator(), |alloc| Root::new_in(3, 2, alloc)).unwrap();
    let expected = root.describe(&segment).unwrap();
    segment.publish("graph", root.into_raw()).unwrap();

    // Same bytes, different base address.
    let consumer = HeapRegion::copy_from(unsafe { producer.as_bytes() });
    assert_ne!(consumer.region().as_ptr(), producer.region().as_ptr());
    let view = unsafe { Segment::attach(consumer.region()) }.unwrap();

    let ptr = view.find::<Root>("graph").unwrap();
    let remote = unsafe { &*view.resolve(ptr, 1).unwrap() };
    assert_eq!(remote.describe(&view).unwrap(), expected);
}

#[test]
fn publishing_hands_off_ownership() {
    init_tracing();

    let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 32 * 1024);
    let segment = unsafe { Segment::init(owner.region()) }.unwrap();
    let before = segment.free_bytes();

    let root = ShmUnique::new_in(segment.allocator(), |alloc| Root::new_in(4, 4, alloc)).unwrap();
    segment.publish("graph", root.into_raw()).unwrap();
    assert!(segment.free_bytes() < before);

    // Whoever withdraws the name takes ownership back and frees the graph.
    let ptr = segment.unpublish::<Root>("graph").unwrap();
    drop(unsafe { ShmUnique::from_raw(ptr, segment.allocator()) });
    assert_eq!(segment.free_bytes(), before);
    tracing::debug!(status = %segment.status(), "after release");
}
