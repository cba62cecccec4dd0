//! The introspection tree as it lives in the shared segment.
//!
//! Nodes are plain `repr(C)` values holding scalars and segment offsets.
//! Vocabulary values are stored as raw `u32` and decoded on read. Every node
//! owns its children outright; releasing a node releases its subtree.

use pmipc_shm::{
    AllocError, Segment, SegmentAllocator, SegmentError, ShmBox, ShmDrop, ShmGuard, ShmString,
    ShmVec,
};

use crate::enums::{EnumId, EnumInfo, EnumKeyInfo, Metric, ENUMS};
use crate::metrics::{
    DEVICES, DeviceInfo, DeviceMetricInfo, METRICS, MetricInfo, device_metric_info,
};

/// Name the producer publishes the root under.
pub const ROOT_NAME: &str = "introspection-root";

#[repr(C)]
pub struct EnumKeyNode {
    pub(crate) enum_id: u32,
    pub(crate) value: i32,
    pub(crate) symbol: ShmString,
    pub(crate) name: ShmString,
    pub(crate) short_name: ShmString,
    pub(crate) description: ShmString,
}

impl EnumKeyNode {
    pub fn new_in(
        enum_id: EnumId,
        key: &EnumKeyInfo,
        alloc: SegmentAllocator<'_>,
    ) -> Result<Self, AllocError> {
        let symbol = ShmGuard::new(ShmString::new_in(key.symbol, alloc)?, alloc);
        let name = ShmGuard::new(ShmString::new_in(key.name, alloc)?, alloc);
        let short_name = ShmGuard::new(ShmString::new_in(key.short_name, alloc)?, alloc);
        let description = ShmString::new_in(key.description, alloc)?;
        Ok(Self {
            enum_id: enum_id.as_u32(),
            value: key.value,
            symbol: symbol.into_inner(),
            name: name.into_inner(),
            short_name: short_name.into_inner(),
            description,
        })
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn symbol<'a>(&self, segment: &'a Segment) -> Result<&'a str, SegmentError> {
        self.symbol.as_str(segment)
    }
}

impl ShmDrop for EnumKeyNode {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe {
            self.symbol.release(alloc);
            self.name.release(alloc);
            self.short_name.release(alloc);
            self.description.release(alloc);
        }
    }
}

#[repr(C)]
pub struct EnumNode {
    pub(crate) id: u32,
    pub(crate) symbol: ShmString,
    pub(crate) description: ShmString,
    pub(crate) keys: ShmVec<ShmBox<EnumKeyNode>>,
}

impl EnumNode {
    /// An enumeration with all its keys, in declaration order.
    pub fn new_in(info: &EnumInfo, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let symbol = ShmGuard::new(ShmString::new_in(info.symbol, alloc)?, alloc);
        let description = ShmGuard::new(ShmString::new_in(info.description, alloc)?, alloc);
        let mut keys = ShmGuard::new(ShmVec::with_capacity(info.keys.len(), alloc)?, alloc);
        for key in info.keys {
            let node = ShmBox::new_in(alloc, |alloc| EnumKeyNode::new_in(info.id, key, alloc))?;
            keys.push(node, alloc)?;
        }
        Ok(Self {
            id: info.id.as_u32(),
            symbol: symbol.into_inner(),
            description: description.into_inner(),
            keys: keys.into_inner(),
        })
    }

    pub fn id(&self) -> Option<EnumId> {
        EnumId::from_u32(self.id)
    }

    pub fn keys<'a>(
        &self,
        segment: &'a Segment,
    ) -> Result<&'a [ShmBox<EnumKeyNode>], SegmentError> {
        self.keys.as_slice(segment)
    }
}

impl ShmDrop for EnumNode {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe {
            self.symbol.release(alloc);
            self.description.release(alloc);
            self.keys.release(alloc);
        }
    }
}

#[repr(C)]
pub struct DeviceNode {
    pub(crate) id: u32,
    pub(crate) device_type: u32,
    pub(crate) vendor: u32,
    pub(crate) name: ShmString,
}

impl DeviceNode {
    pub fn new_in(info: &DeviceInfo, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        Ok(Self {
            id: info.id,
            device_type: info.device_type.as_u32(),
            vendor: info.vendor.as_u32(),
            name: ShmString::new_in(info.name, alloc)?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name<'a>(&self, segment: &'a Segment) -> Result<&'a str, SegmentError> {
        self.name.as_str(segment)
    }
}

impl ShmDrop for DeviceNode {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe { self.name.release(alloc) };
    }
}

#[repr(C)]
pub struct DeviceMetricInfoNode {
    pub(crate) device_id: u32,
    pub(crate) availability: u32,
    pub(crate) array_size: u32,
}

impl From<&DeviceMetricInfo> for DeviceMetricInfoNode {
    fn from(info: &DeviceMetricInfo) -> Self {
        Self {
            device_id: info.device_id,
            availability: info.availability.as_u32(),
            array_size: info.array_size,
        }
    }
}

impl ShmDrop for DeviceMetricInfoNode {
    const NEEDS_RELEASE: bool = false;

    unsafe fn release(&mut self, _alloc: SegmentAllocator<'_>) {}
}

#[repr(C)]
pub struct DataTypeInfoNode {
    pub(crate) data_type: u32,
    /// Zero when the data type is not an enumeration.
    pub(crate) enum_id: u32,
}

impl ShmDrop for DataTypeInfoNode {
    const NEEDS_RELEASE: bool = false;

    unsafe fn release(&mut self, _alloc: SegmentAllocator<'_>) {}
}

#[repr(C)]
pub struct MetricNode {
    pub(crate) id: u32,
    pub(crate) metric_type: u32,
    pub(crate) unit: u32,
    pub(crate) type_info: ShmBox<DataTypeInfoNode>,
    pub(crate) stats: ShmVec<u32>,
    pub(crate) device_info: ShmVec<ShmBox<DeviceMetricInfoNode>>,
}

impl MetricNode {
    /// A metric from its table row, with per-device availability filled in.
    pub fn new_in(info: &MetricInfo, alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let type_info = ShmGuard::new(
            ShmBox::new_in(alloc, |_| {
                Ok::<_, AllocError>(DataTypeInfoNode {
                    data_type: info.data_type.as_u32(),
                    enum_id: info.enum_id.map_or(0, EnumId::as_u32),
                })
            })?,
            alloc,
        );

        let mut stats = ShmGuard::new(ShmVec::with_capacity(info.stats.len(), alloc)?, alloc);
        for stat in info.stats {
            stats.push(stat.as_u32(), alloc)?;
        }

        let devices = device_metric_info(info);
        let mut device_info = ShmGuard::new(ShmVec::with_capacity(devices.len(), alloc)?, alloc);
        for device in devices {
            let node = ShmBox::new_in(alloc, |_| {
                Ok::<_, AllocError>(DeviceMetricInfoNode::from(device))
            })?;
            device_info.push(node, alloc)?;
        }

        Ok(Self {
            id: info.metric.as_u32(),
            metric_type: info.metric_type.as_u32(),
            unit: info.unit.as_u32(),
            type_info: type_info.into_inner(),
            stats: stats.into_inner(),
            device_info: device_info.into_inner(),
        })
    }

    pub fn id(&self) -> Option<Metric> {
        Metric::from_u32(self.id)
    }

    pub fn stats<'a>(&self, segment: &'a Segment) -> Result<&'a [u32], SegmentError> {
        self.stats.as_slice(segment)
    }

    pub fn device_info<'a>(
        &self,
        segment: &'a Segment,
    ) -> Result<&'a [ShmBox<DeviceMetricInfoNode>], SegmentError> {
        self.device_info.as_slice(segment)
    }
}

impl ShmDrop for MetricNode {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe {
            self.type_info.release(alloc);
            self.stats.release(alloc);
            self.device_info.release(alloc);
        }
    }
}

#[repr(C)]
pub struct RootNode {
    pub(crate) metrics: ShmVec<ShmBox<MetricNode>>,
    pub(crate) enums: ShmVec<ShmBox<EnumNode>>,
    pub(crate) devices: ShmVec<ShmBox<DeviceNode>>,
}

impl RootNode {
    /// Build the full tree: enumerations, then devices, then metrics.
    pub fn populate(alloc: SegmentAllocator<'_>) -> Result<Self, AllocError> {
        let mut enums = ShmGuard::new(ShmVec::with_capacity(ENUMS.len(), alloc)?, alloc);
        for info in ENUMS {
            let node = ShmBox::new_in(alloc, |alloc| EnumNode::new_in(info, alloc))?;
            enums.push(node, alloc)?;
        }

        let mut devices = ShmGuard::new(ShmVec::with_capacity(DEVICES.len(), alloc)?, alloc);
        for info in DEVICES {
            let node = ShmBox::new_in(alloc, |alloc| DeviceNode::new_in(info, alloc))?;
            devices.push(node, alloc)?;
        }

        let mut metrics = ShmGuard::new(ShmVec::with_capacity(METRICS.len(), alloc)?, alloc);
        for info in METRICS {
            let node = ShmBox::new_in(alloc, |alloc| MetricNode::new_in(info, alloc))?;
            metrics.push(node, alloc)?;
        }

        tracing::debug!(
            enums = ENUMS.len(),
            devices = DEVICES.len(),
            metrics = METRICS.len(),
            "populated introspection tree"
        );

        Ok(Self {
            metrics: metrics.into_inner(),
            enums: enums.into_inner(),
            devices: devices.into_inner(),
        })
    }

    pub fn metrics<'a>(&self, segment: &'a Segment) -> Result<&'a [ShmBox<MetricNode>], SegmentError> {
        self.metrics.as_slice(segment)
    }

    pub fn enums<'a>(&self, segment: &'a Segment) -> Result<&'a [ShmBox<EnumNode>], SegmentError> {
        self.enums.as_slice(segment)
    }

    pub fn devices<'a>(&self, segment: &'a Segment) -> Result<&'a [ShmBox<DeviceNode>], SegmentError> {
        self.devices.as_slice(segment)
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self, segment: &Segment) -> Result<usize, SegmentError> {
        let mut count = 1;
        for e in self.enums(segment)? {
            count += 1 + e.get(segment)?.keys(segment)?.len();
        }
        count += self.devices(segment)?.len();
        for m in self.metrics(segment)? {
            // metric + type info + device infos
            count += 2 + m.get(segment)?.device_info(segment)?.len();
        }
        Ok(count)
    }
}

impl ShmDrop for RootNode {
    unsafe fn release(&mut self, alloc: SegmentAllocator<'_>) {
        unsafe {
            self.metrics.release(alloc);
            self.enums.release(alloc);
            self.devices.release(alloc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmipc_shm::{HeapRegion, SEGMENT_OVERHEAD, ShmUnique};

    #[test]
    fn populated_tree_mirrors_the_tables() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 256 * 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();

        let enums = root.enums(&segment).unwrap();
        assert_eq!(enums.len(), ENUMS.len());
        let present_mode = enums[4].get(&segment).unwrap();
        assert_eq!(present_mode.id(), Some(EnumId::PresentMode));
        let keys = present_mode.keys(&segment).unwrap();
        assert_eq!(keys.len(), crate::enums::PresentMode::KEYS.len());
        let first = keys[0].get(&segment).unwrap();
        assert_eq!(first.symbol(&segment).unwrap(), "PRESENT_MODE_HARDWARE_LEGACY_FLIP");

        let devices = root.devices(&segment).unwrap();
        assert_eq!(devices[1].get(&segment).unwrap().name(&segment).unwrap(), "Arc 750");

        let metrics = root.metrics(&segment).unwrap();
        let fan = metrics
            .iter()
            .map(|m| m.get(&segment).unwrap())
            .find(|m| m.id() == Some(Metric::GpuFanSpeed))
            .unwrap();
        let infos = fan.device_info(&segment).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].get(&segment).unwrap().array_size, 2);
    }

    #[test]
    fn dropping_the_tree_returns_every_byte() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 256 * 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let before = segment.free_bytes();

        let root = ShmUnique::new_in(segment.allocator(), RootNode::populate).unwrap();
        assert!(segment.free_bytes() < before);
        drop(root);
        assert_eq!(segment.free_bytes(), before);
    }

    #[test]
    fn exhaustion_during_population_leaks_nothing() {
        let owner = HeapRegion::new_zeroed(SEGMENT_OVERHEAD + 8 * 1024);
        let segment = unsafe { Segment::init(owner.region()) }.unwrap();
        let before = segment.free_bytes();

        let result = ShmUnique::new_in(segment.allocator(), RootNode::populate);
        assert!(matches!(result, Err(AllocError::Exhausted { .. })));
        assert_eq!(segment.free_bytes(), before);
    }
}
