//! Cloning the introspection tree out of a segment.

use pmipc_intro::{
    ApiRoot, CloneError, DEVICES, ENUMS, METRICS, Metric, RootNode, clone_into, deep_clone,
    device_metric_info, measure,
};
use pmipc_shm::{HeapRegion, SEGMENT_OVERHEAD, Segment, ShmUnique};

const SEGMENT_SIZE: usize = SEGMENT_OVERHEAD + 256 * 1024;
const POISON: u8 = 0xA5;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Everything observable about a cloned tree, flattened to lines.
fn summarize(root: &ApiRoot) -> Vec<String> {
    let mut lines = Vec::new();
    for e in root.enums().iter() {
        lines.push(format!("enum {} {}", e.symbol(), e.description()));
        for k in e.keys().iter() {
            lines.push(format!(
                "  {}={} {} / {} / {}",
                k.symbol(),
                k.value(),
                k.name(),
                k.short_name(),
                k.description()
            ));
        }
    }
    for d in root.devices().iter() {
        lines.push(format!("device {} {:?} {:?} {}", d.id(), d.device_type(), d.vendor(), d.name()));
    }
    for m in root.metrics().iter() {
        let stats: Vec<_> = m.stats().collect();
        let devices: Vec<_> = m.device_info().iter().copied().collect();
        lines.push(format!(
            "metric {:?} {:?} {:?} {:?} {:?} {:?}",
            m.id(),
            m.metric_type(),
            m.unit(),
            m.type_info(),
            stats,
            devices
        ));
    }
    lines
}

fn count_nodes(root: &ApiRoot) -> usize {
    let enums: usize = root.enums().iter().map(|e| 1 + e.keys().len()).sum();
    let metrics: usize = root
        .metrics()
        .iter()
        .map(|m| 2 + m.device_info().len())
        .sum();
    1 + enums + root.devices().len() + metrics
}

#[test]
fn measured_size_is_exact() {
    init_tracing();

    let owner = HeapRegion::new_zeroed(SEGMENT_SIZE);
    let segment = unsafe { Segment::init(owner.region()) }.unwrap();
    let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();

    let measured = measure(&*root, &segment).unwrap();
    assert!(measured > 0);

    let mut buffer = pmipc_intro::FlatBuffer::new_filled(measured + 64, POISON).unwrap();
    let (_, used) = clone_into(&*root, &segment, buffer.as_mut_slice()).unwrap();
    assert_eq!(used, measured);
    assert!(buffer.as_slice()[measured..].iter().all(|b| *b == POISON));

    let mut short = pmipc_intro::FlatBuffer::new_filled(measured - 1, POISON).unwrap();
    let err = clone_into(&*root, &segment, short.as_mut_slice()).unwrap_err();
    assert!(matches!(err, CloneError::BufferOverflow { capacity, .. } if capacity == measured - 1));
}

#[test]
fn clone_matches_the_tables() {
    init_tracing();

    let owner = HeapRegion::new_zeroed(SEGMENT_SIZE);
    let segment = unsafe { Segment::init(owner.region()) }.unwrap();
    let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();
    let clone = deep_clone(&*root, &segment).unwrap();

    assert_eq!(count_nodes(&clone), root.node_count(&segment).unwrap());
    assert_eq!(clone.enums().len(), ENUMS.len());
    assert_eq!(clone.devices().len(), DEVICES.len());
    assert_eq!(clone.metrics().len(), METRICS.len());

    for (api, info) in clone.enums().iter().zip(ENUMS) {
        assert_eq!(api.id(), Some(info.id));
        assert_eq!(api.symbol(), info.symbol);
        let symbols: Vec<_> = api.keys().iter().map(|k| k.symbol()).collect();
        let expected: Vec<_> = info.keys.iter().map(|k| k.symbol).collect();
        assert_eq!(symbols, expected);
    }

    for (api, info) in clone.metrics().iter().zip(METRICS) {
        assert_eq!(api.id(), Some(info.metric));
        assert_eq!(api.metric_type(), Some(info.metric_type));
        assert_eq!(api.unit(), Some(info.unit));
        let type_info = api.type_info().unwrap();
        assert_eq!(type_info.data_type(), Some(info.data_type));
        assert_eq!(type_info.enum_id(), info.enum_id);
        assert_eq!(api.stats().collect::<Vec<_>>(), info.stats);

        let devices = device_metric_info(info);
        assert_eq!(api.device_info().len(), devices.len());
        for (a, d) in api.device_info().iter().zip(devices) {
            assert_eq!(a.device_id(), d.device_id);
            assert_eq!(a.availability(), Some(d.availability));
            assert_eq!(a.array_size(), d.array_size);
        }
    }

    let gpu = clone.find_device(2).unwrap();
    assert_eq!(gpu.name(), "GeForce RTX 2080 ti");
    let fan = clone.find_metric(Metric::GpuFanSpeed).unwrap();
    assert_eq!(fan.device_info().get(1).unwrap().array_size(), 2);
}

#[test]
fn clone_is_independent_of_the_segment_address() {
    init_tracing();

    let producer = HeapRegion::new_zeroed(SEGMENT_SIZE);
    let segment = unsafe { Segment::init(producer.region()) }.unwrap();
    let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();
    let local = deep_clone(&*root, &segment).unwrap();
    segment.publish(pmipc_intro::ROOT_NAME, root.into_raw()).unwrap();

    let consumer = HeapRegion::copy_from(unsafe { producer.as_bytes() });
    let view = unsafe { Segment::attach(consumer.region()) }.unwrap();
    let ptr = view.find::<RootNode>(pmipc_intro::ROOT_NAME).unwrap();
    let remote_root = unsafe { &*view.resolve(ptr, 1).unwrap() };
    let remote = deep_clone(remote_root, &view).unwrap();

    assert_eq!(remote.size(), local.size());
    assert_eq!(summarize(&remote), summarize(&local));
}

#[test]
fn clone_outlives_the_segment() {
    init_tracing();

    let clone = {
        let owner = HeapRegion::new_zeroed(SEGMENT_SIZE);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();
        deep_clone(&*root, &segment).unwrap()
    };

    let names = std::thread::spawn(move || {
        clone
            .devices()
            .iter()
            .map(|d| d.name().to_owned())
            .collect::<Vec<_>>()
    })
    .join()
    .unwrap();
    assert_eq!(names, ["Device-independent", "Arc 750", "GeForce RTX 2080 ti"]);
}
