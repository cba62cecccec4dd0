//! Deep-copying segment trees into plain, segment-independent memory.
//!
//! Every node type implements [`ApiClone`]: it allocates its own counterpart,
//! clones its children through the same allocator, then writes itself. The
//! same code runs for the sizing pass and the placement pass; only the
//! [`CloneAllocator`] differs. A sizing allocator hands out no storage, so
//! every write goes through [`emplace`], which skips it.
//!
//! Allocation order is the contract between the two passes. A clone must
//! request the same sizes in the same order no matter which allocator it
//! runs against.

use std::ptr::{self, NonNull};

use pmipc_shm::{Segment, ShmBox, ShmString, ShmVec};

use crate::api::{
    ApiDataTypeInfo, ApiDevice, ApiDeviceMetricInfo, ApiEnum, ApiEnumKey, ApiMetric, ApiObjArray,
    ApiRoot, ApiString,
};
use crate::error::CloneError;
use crate::tree::{
    DataTypeInfoNode, DeviceMetricInfoNode, DeviceNode, EnumKeyNode, EnumNode, MetricNode,
    RootNode,
};

/// Destination of a clone pass.
pub trait CloneAllocator {
    /// Reserve room for `count` values of `T`.
    ///
    /// Returns `None` when the allocator only measures.
    fn allocate<T>(&mut self, count: usize) -> Result<Option<NonNull<T>>, CloneError>;
}

/// A segment value with a plain counterpart.
pub trait ApiClone {
    type Api;

    /// Clone `self` (resolved against `segment`) into `alloc`.
    ///
    /// Returns null when `alloc` hands out no storage.
    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const Self::Api, CloneError>;
}

/// Write `value` into `slot` if there is one.
pub fn emplace<T>(slot: Option<NonNull<T>>, value: T) -> *const T {
    match slot {
        Some(slot) => {
            // SAFETY: slots come from a CloneAllocator and are sized and
            // aligned for one T.
            unsafe { slot.as_ptr().write(value) };
            slot.as_ptr()
        }
        None => ptr::null(),
    }
}

impl ApiClone for ShmString {
    type Api = ApiString;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiString, CloneError> {
        let text = self.as_str(segment)?;
        let slot = alloc.allocate::<ApiString>(1)?;
        let bytes = alloc.allocate::<u8>(text.len() + 1)?;

        let data = match bytes {
            Some(bytes) => {
                // SAFETY: `bytes` holds len + 1 bytes and cannot overlap the segment.
                unsafe {
                    ptr::copy_nonoverlapping(text.as_ptr(), bytes.as_ptr(), text.len());
                    bytes.as_ptr().add(text.len()).write(0);
                }
                bytes.as_ptr().cast_const()
            }
            None => ptr::null(),
        };
        Ok(emplace(slot, ApiString::new(data, text.len())))
    }
}

impl<E: ApiClone> ApiClone for ShmVec<E> {
    type Api = ApiObjArray<E::Api>;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const Self::Api, CloneError> {
        let elements = self.as_slice(segment)?;
        let slot = alloc.allocate::<ApiObjArray<E::Api>>(1)?;
        let table = alloc.allocate::<*const E::Api>(elements.len())?;

        for (i, element) in elements.iter().enumerate() {
            let cloned = element.api_clone(segment, alloc)?;
            if let Some(table) = table {
                // SAFETY: the table has room for every element.
                unsafe { table.as_ptr().add(i).write(cloned) };
            }
        }

        let data = table.map_or(ptr::null(), |t| t.as_ptr().cast_const());
        Ok(emplace(slot, ApiObjArray::new(data, elements.len())))
    }
}

impl<T: ApiClone> ApiClone for ShmBox<T> {
    type Api = T::Api;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const T::Api, CloneError> {
        self.get(segment)?.api_clone(segment, alloc)
    }
}

impl ApiClone for u32 {
    type Api = u32;

    fn api_clone<A: CloneAllocator>(
        &self,
        _segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const u32, CloneError> {
        let slot = alloc.allocate::<u32>(1)?;
        Ok(emplace(slot, *self))
    }
}

impl ApiClone for EnumKeyNode {
    type Api = ApiEnumKey;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiEnumKey, CloneError> {
        let slot = alloc.allocate::<ApiEnumKey>(1)?;
        let symbol = self.symbol.api_clone(segment, alloc)?;
        let name = self.name.api_clone(segment, alloc)?;
        let short_name = self.short_name.api_clone(segment, alloc)?;
        let description = self.description.api_clone(segment, alloc)?;
        Ok(emplace(
            slot,
            ApiEnumKey {
                enum_id: self.enum_id,
                value: self.value,
                symbol,
                name,
                short_name,
                description,
            },
        ))
    }
}

impl ApiClone for EnumNode {
    type Api = ApiEnum;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiEnum, CloneError> {
        let slot = alloc.allocate::<ApiEnum>(1)?;
        let symbol = self.symbol.api_clone(segment, alloc)?;
        let description = self.description.api_clone(segment, alloc)?;
        let keys = self.keys.api_clone(segment, alloc)?;
        Ok(emplace(
            slot,
            ApiEnum {
                id: self.id,
                symbol,
                description,
                keys,
            },
        ))
    }
}

impl ApiClone for DeviceNode {
    type Api = ApiDevice;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiDevice, CloneError> {
        let slot = alloc.allocate::<ApiDevice>(1)?;
        let name = self.name.api_clone(segment, alloc)?;
        Ok(emplace(
            slot,
            ApiDevice {
                id: self.id,
                device_type: self.device_type,
                vendor: self.vendor,
                name,
            },
        ))
    }
}

impl ApiClone for DeviceMetricInfoNode {
    type Api = ApiDeviceMetricInfo;

    fn api_clone<A: CloneAllocator>(
        &self,
        _segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiDeviceMetricInfo, CloneError> {
        let slot = alloc.allocate::<ApiDeviceMetricInfo>(1)?;
        Ok(emplace(
            slot,
            ApiDeviceMetricInfo {
                device_id: self.device_id,
                availability: self.availability,
                array_size: self.array_size,
            },
        ))
    }
}

impl ApiClone for DataTypeInfoNode {
    type Api = ApiDataTypeInfo;

    fn api_clone<A: CloneAllocator>(
        &self,
        _segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiDataTypeInfo, CloneError> {
        let slot = alloc.allocate::<ApiDataTypeInfo>(1)?;
        Ok(emplace(
            slot,
            ApiDataTypeInfo {
                data_type: self.data_type,
                enum_id: self.enum_id,
            },
        ))
    }
}

impl ApiClone for MetricNode {
    type Api = ApiMetric;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiMetric, CloneError> {
        let slot = alloc.allocate::<ApiMetric>(1)?;
        let type_info = self.type_info.api_clone(segment, alloc)?;
        let stats = self.stats.api_clone(segment, alloc)?;
        let device_info = self.device_info.api_clone(segment, alloc)?;
        Ok(emplace(
            slot,
            ApiMetric {
                id: self.id,
                metric_type: self.metric_type,
                unit: self.unit,
                type_info,
                stats,
                device_info,
            },
        ))
    }
}

impl ApiClone for RootNode {
    type Api = ApiRoot;

    fn api_clone<A: CloneAllocator>(
        &self,
        segment: &Segment,
        alloc: &mut A,
    ) -> Result<*const ApiRoot, CloneError> {
        let slot = alloc.allocate::<ApiRoot>(1)?;
        let metrics = self.metrics.api_clone(segment, alloc)?;
        let enums = self.enums.api_clone(segment, alloc)?;
        let devices = self.devices.api_clone(segment, alloc)?;
        Ok(emplace(
            slot,
            ApiRoot {
                metrics,
                enums,
                devices,
            },
        ))
    }
}
