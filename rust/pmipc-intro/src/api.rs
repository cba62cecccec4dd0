//! Plain, segment-independent counterparts of the tree nodes.
//!
//! These are only ever produced by cloning (see [`crate::deep_clone`]) and
//! live inside the flat buffer that the clone owns. Every pointer refers to
//! another part of the same buffer, so the accessors are safe for as long
//! as the value is borrowed from its [`crate::FlatClone`].

use std::ffi::CStr;
use std::marker::PhantomData;

use crate::enums::{
    DataType, DeviceType, DeviceVendor, EnumId, Metric, MetricAvailability, MetricType, Stat, Unit,
};

/// Borrow through a pointer placed by the clone.
///
/// # Safety
///
/// `ptr` must be null or point into the clone buffer that `'a` borrows.
unsafe fn place<'a, T>(ptr: *const T) -> Option<&'a T> {
    unsafe { ptr.as_ref() }
}

/// Counterparts are read-only once placed, and every pointer stays inside
/// the buffer that owns them.
macro_rules! shared_counterpart {
    ($($ty:ty),* $(,)?) => {
        $(
            unsafe impl Send for $ty {}
            unsafe impl Sync for $ty {}
        )*
    };
}

shared_counterpart!(
    ApiString,
    ApiEnumKey,
    ApiEnum,
    ApiDevice,
    ApiMetric,
    ApiRoot,
);

unsafe impl<T: Sync> Send for ApiObjArray<T> {}
unsafe impl<T: Sync> Sync for ApiObjArray<T> {}

/// Nul-terminated UTF-8 text.
#[repr(C)]
#[derive(Debug)]
pub struct ApiString {
    data: *const u8,
    len: usize,
}

impl ApiString {
    pub(crate) fn new(data: *const u8, len: usize) -> Self {
        Self { data, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        // SAFETY: `len` bytes (plus nul) were copied here from a validated string.
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }

    pub fn as_str(&self) -> &str {
        // Copied from a string that was UTF-8 checked on the way out of the segment.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// The text with its terminating nul, for C callers.
    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.data.is_null() {
            return None;
        }
        // SAFETY: the clone always writes `len + 1` bytes.
        let with_nul = unsafe { std::slice::from_raw_parts(self.data, self.len + 1) };
        CStr::from_bytes_with_nul(with_nul).ok()
    }
}

/// A counted array of pointers to cloned objects.
#[repr(C)]
pub struct ApiObjArray<T> {
    data: *const *const T,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> ApiObjArray<T> {
    pub(crate) fn new(data: *const *const T, len: usize) -> Self {
        Self {
            data,
            len,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len || self.data.is_null() {
            return None;
        }
        // SAFETY: the pointer table holds `len` entries placed by the clone.
        unsafe { place(*self.data.add(index)) }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(|i| self.get(i))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ApiObjArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ApiEnumKey {
    pub(crate) enum_id: u32,
    pub(crate) value: i32,
    pub(crate) symbol: *const ApiString,
    pub(crate) name: *const ApiString,
    pub(crate) short_name: *const ApiString,
    pub(crate) description: *const ApiString,
}

impl ApiEnumKey {
    pub fn enum_id(&self) -> Option<EnumId> {
        EnumId::from_u32(self.enum_id)
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn symbol(&self) -> &str {
        text(self.symbol)
    }

    pub fn name(&self) -> &str {
        text(self.name)
    }

    pub fn short_name(&self) -> &str {
        text(self.short_name)
    }

    pub fn description(&self) -> &str {
        text(self.description)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ApiEnum {
    pub(crate) id: u32,
    pub(crate) symbol: *const ApiString,
    pub(crate) description: *const ApiString,
    pub(crate) keys: *const ApiObjArray<ApiEnumKey>,
}

impl ApiEnum {
    pub fn id(&self) -> Option<EnumId> {
        EnumId::from_u32(self.id)
    }

    pub fn symbol(&self) -> &str {
        text(self.symbol)
    }

    pub fn description(&self) -> &str {
        text(self.description)
    }

    pub fn keys(&self) -> &ApiObjArray<ApiEnumKey> {
        array(self.keys)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ApiDevice {
    pub(crate) id: u32,
    pub(crate) device_type: u32,
    pub(crate) vendor: u32,
    pub(crate) name: *const ApiString,
}

impl ApiDevice {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn device_type(&self) -> Option<DeviceType> {
        DeviceType::from_u32(self.device_type)
    }

    pub fn vendor(&self) -> Option<DeviceVendor> {
        DeviceVendor::from_u32(self.vendor)
    }

    pub fn name(&self) -> &str {
        text(self.name)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiDeviceMetricInfo {
    pub(crate) device_id: u32,
    pub(crate) availability: u32,
    pub(crate) array_size: u32,
}

impl ApiDeviceMetricInfo {
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn availability(&self) -> Option<MetricAvailability> {
        MetricAvailability::from_u32(self.availability)
    }

    pub fn array_size(&self) -> u32 {
        self.array_size
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiDataTypeInfo {
    pub(crate) data_type: u32,
    pub(crate) enum_id: u32,
}

impl ApiDataTypeInfo {
    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_u32(self.data_type)
    }

    /// The enumeration values belong to, for enum-typed metrics.
    pub fn enum_id(&self) -> Option<EnumId> {
        EnumId::from_u32(self.enum_id)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ApiMetric {
    pub(crate) id: u32,
    pub(crate) metric_type: u32,
    pub(crate) unit: u32,
    pub(crate) type_info: *const ApiDataTypeInfo,
    pub(crate) stats: *const ApiObjArray<u32>,
    pub(crate) device_info: *const ApiObjArray<ApiDeviceMetricInfo>,
}

impl ApiMetric {
    pub fn id(&self) -> Option<Metric> {
        Metric::from_u32(self.id)
    }

    pub fn metric_type(&self) -> Option<MetricType> {
        MetricType::from_u32(self.metric_type)
    }

    pub fn unit(&self) -> Option<Unit> {
        Unit::from_u32(self.unit)
    }

    pub fn type_info(&self) -> Option<&ApiDataTypeInfo> {
        // SAFETY: placed by the clone into the buffer `self` lives in.
        unsafe { place(self.type_info) }
    }

    /// Raw stat values; see [`ApiMetric::stats`] for the decoded list.
    pub fn stat_values(&self) -> &ApiObjArray<u32> {
        array(self.stats)
    }

    pub fn stats(&self) -> impl Iterator<Item = Stat> + '_ {
        self.stat_values().iter().filter_map(|v| Stat::from_u32(*v))
    }

    pub fn device_info(&self) -> &ApiObjArray<ApiDeviceMetricInfo> {
        array(self.device_info)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct ApiRoot {
    pub(crate) metrics: *const ApiObjArray<ApiMetric>,
    pub(crate) enums: *const ApiObjArray<ApiEnum>,
    pub(crate) devices: *const ApiObjArray<ApiDevice>,
}

impl ApiRoot {
    pub fn metrics(&self) -> &ApiObjArray<ApiMetric> {
        array(self.metrics)
    }

    pub fn enums(&self) -> &ApiObjArray<ApiEnum> {
        array(self.enums)
    }

    pub fn devices(&self) -> &ApiObjArray<ApiDevice> {
        array(self.devices)
    }

    pub fn find_metric(&self, metric: Metric) -> Option<&ApiMetric> {
        self.metrics().iter().find(|m| m.id == metric.as_u32())
    }

    pub fn find_enum(&self, id: EnumId) -> Option<&ApiEnum> {
        self.enums().iter().find(|e| e.id == id.as_u32())
    }

    pub fn find_device(&self, id: u32) -> Option<&ApiDevice> {
        self.devices().iter().find(|d| d.id == id)
    }
}

fn text<'a>(ptr: *const ApiString) -> &'a str {
    // SAFETY: every string pointer is placed by the clone; callers tie 'a to
    // the owning buffer through `&self`.
    unsafe { place(ptr) }.map(ApiString::as_str).unwrap_or_default()
}

fn array<'a, T>(ptr: *const ApiObjArray<T>) -> &'a ApiObjArray<T> {
    const EMPTY: ApiObjArray<()> = ApiObjArray {
        data: std::ptr::null(),
        len: 0,
        _marker: PhantomData,
    };
    // SAFETY: as in `text`.
    match unsafe { place(ptr) } {
        Some(array) => array,
        // SAFETY: an empty array never dereferences its (null) table, and the
        // layout does not depend on T.
        None => unsafe { &*(&EMPTY as *const ApiObjArray<()>).cast::<ApiObjArray<T>>() },
    }
}
