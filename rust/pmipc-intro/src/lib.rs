//! Introspection metadata for pmipc.
//!
//! The producer describes every metric, enumeration and device it serves in
//! a tree built inside a shared [`Segment`](pmipc_shm::Segment) (see
//! [`RootNode::populate`]). Consumers never read that tree in place for long:
//! they [`deep_clone`] it into one flat, process-local buffer and drop the
//! segment whenever they like.
//!
//! Cloning runs the same traversal twice. The first pass uses a
//! [`SizingAllocator`] to learn the exact byte count; the second places the
//! tree with a [`FlatAllocator`] over a buffer of that size.

pub mod api;
pub mod block;
pub mod clone;
pub mod enums;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod tree;

pub use api::{
    ApiDataTypeInfo, ApiDevice, ApiDeviceMetricInfo, ApiEnum, ApiEnumKey, ApiMetric, ApiObjArray,
    ApiRoot, ApiString,
};
pub use block::{FLAT_ALIGN, FlatAllocator, FlatBuffer, FlatClone, clone_into, deep_clone, measure};
pub use clone::{ApiClone, CloneAllocator, emplace};
pub use enums::{
    DataType, DeviceType, DeviceVendor, ENUMS, EnumId, EnumInfo, EnumKeyInfo, GraphicsRuntime,
    Metric, MetricAvailability, MetricType, PresentMode, Stat, Status, Unit, data_type_size,
};
pub use error::CloneError;
pub use metrics::{
    DEVICES, DeviceInfo, DeviceMetricInfo, METRICS, MetricInfo, device_metric_info, metric_info,
};
pub use probe::{SizingAllocator, padding_for};
pub use tree::{
    DataTypeInfoNode, DeviceMetricInfoNode, DeviceNode, EnumKeyNode, EnumNode, MetricNode,
    ROOT_NAME, RootNode,
};
