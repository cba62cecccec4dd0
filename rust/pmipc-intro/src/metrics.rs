//! The static metric table and the device list.
//!
//! This table is the only description of which metrics exist. The producer
//! builds the introspection tree from it; nothing else decides metric types,
//! units or stat lists.

use crate::enums::{
    DataType, DeviceType, DeviceVendor, EnumId, Metric, MetricAvailability, MetricType, Stat, Unit,
};

/// One row of the metric table.
#[derive(Debug, Clone, Copy)]
pub struct MetricInfo {
    pub metric: Metric,
    pub metric_type: MetricType,
    pub unit: Unit,
    pub data_type: DataType,
    /// Enumeration the values belong to, for [`DataType::Enum`].
    pub enum_id: Option<EnumId>,
    /// Device category the metric is reported for.
    pub device_type: DeviceType,
    pub stats: &'static [Stat],
}

/// A device advertised by the producer.
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo {
    pub id: u32,
    pub device_type: DeviceType,
    pub vendor: DeviceVendor,
    pub name: &'static str,
}

/// Availability of one metric on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMetricInfo {
    pub device_id: u32,
    pub availability: MetricAvailability,
    pub array_size: u32,
}

const WINDOW_STATS: &[Stat] = &[
    Stat::Avg,
    Stat::Percentile99,
    Stat::Percentile95,
    Stat::Percentile90,
    Stat::Max,
    Stat::Min,
];

const TELEMETRY_STATS: &[Stat] = &[Stat::Avg, Stat::Max, Stat::Min];

const RAW: &[Stat] = &[Stat::None];

const fn row(
    metric: Metric,
    metric_type: MetricType,
    unit: Unit,
    data_type: DataType,
    enum_id: Option<EnumId>,
    device_type: DeviceType,
    stats: &'static [Stat],
) -> MetricInfo {
    MetricInfo {
        metric,
        metric_type,
        unit,
        data_type,
        enum_id,
        device_type,
        stats,
    }
}

use DataType as D;
use DeviceType::{GraphicsAdapter as ADAPTER, Independent as INDEPENDENT};
use MetricType as T;
use Unit as U;

#[rustfmt::skip]
pub const METRICS: &[MetricInfo] = &[
    row(Metric::DisplayedFps,   T::Dynamic,      U::FramesPerSecond, D::Double, None,                           INDEPENDENT, WINDOW_STATS),
    row(Metric::PresentedFps,   T::Dynamic,      U::FramesPerSecond, D::Double, None,                           INDEPENDENT, WINDOW_STATS),
    row(Metric::FrameTime,      T::Dynamic,      U::Milliseconds,    D::Double, None,                           INDEPENDENT, WINDOW_STATS),
    row(Metric::GpuBusyTime,    T::Dynamic,      U::Milliseconds,    D::Double, None,                           INDEPENDENT, WINDOW_STATS),
    row(Metric::PresentQpc,     T::FrameEvent,   U::Ticks,           D::Uint64, None,                           INDEPENDENT, RAW),
    row(Metric::PresentRuntime, T::FrameEvent,   U::Dimensionless,   D::Enum,   Some(EnumId::GraphicsRuntime),  INDEPENDENT, RAW),
    row(Metric::PresentMode,    T::FrameEvent,   U::Dimensionless,   D::Enum,   Some(EnumId::PresentMode),      INDEPENDENT, RAW),
    row(Metric::SyncInterval,   T::FrameEvent,   U::Dimensionless,   D::Int32,  None,                           INDEPENDENT, RAW),
    row(Metric::AllowsTearing,  T::FrameEvent,   U::Boolean,         D::Bool,   None,                           INDEPENDENT, RAW),
    row(Metric::TimeInPresent,  T::FrameEvent,   U::Ticks,           D::Uint64, None,                           INDEPENDENT, RAW),
    row(Metric::ReadyTime,      T::FrameEvent,   U::Ticks,           D::Uint64, None,                           INDEPENDENT, RAW),
    row(Metric::GpuPower,       T::DynamicFrame, U::Watts,           D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::GpuVoltage,     T::DynamicFrame, U::Volts,           D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::GpuFrequency,   T::DynamicFrame, U::Megahertz,       D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::GpuTemperature, T::DynamicFrame, U::Celsius,         D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::GpuFanSpeed,    T::DynamicFrame, U::Rpm,             D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::GpuUtilization, T::DynamicFrame, U::Percent,         D::Float,  None,                           ADAPTER,     TELEMETRY_STATS),
    row(Metric::CpuUtilization, T::DynamicFrame, U::Percent,         D::Double, None,                           INDEPENDENT, TELEMETRY_STATS),
    row(Metric::CpuPower,       T::DynamicFrame, U::Watts,           D::Double, None,                           INDEPENDENT, TELEMETRY_STATS),
    row(Metric::CpuFrequency,   T::DynamicFrame, U::Megahertz,       D::Double, None,                           INDEPENDENT, TELEMETRY_STATS),
    row(Metric::GpuVendor,      T::Static,       U::Dimensionless,   D::Enum,   Some(EnumId::DeviceVendor),     ADAPTER,     RAW),
    row(Metric::GpuName,        T::Static,       U::Dimensionless,   D::String, None,                           ADAPTER,     RAW),
];

pub const DEVICES: &[DeviceInfo] = &[
    DeviceInfo {
        id: 0,
        device_type: DeviceType::Independent,
        vendor: DeviceVendor::Unknown,
        name: "Device-independent",
    },
    DeviceInfo {
        id: 1,
        device_type: DeviceType::GraphicsAdapter,
        vendor: DeviceVendor::Intel,
        name: "Arc 750",
    },
    DeviceInfo {
        id: 2,
        device_type: DeviceType::GraphicsAdapter,
        vendor: DeviceVendor::Nvidia,
        name: "GeForce RTX 2080 ti",
    },
];

const fn available(device_id: u32, array_size: u32) -> DeviceMetricInfo {
    DeviceMetricInfo {
        device_id,
        availability: MetricAvailability::Available,
        array_size,
    }
}

const ON_INDEPENDENT: &[DeviceMetricInfo] = &[available(0, 1)];
const ON_ADAPTERS: &[DeviceMetricInfo] = &[available(1, 1), available(2, 1)];
const FANS_ON_ADAPTERS: &[DeviceMetricInfo] = &[available(1, 1), available(2, 2)];

/// Devices that report `info`, in device order.
pub fn device_metric_info(info: &MetricInfo) -> &'static [DeviceMetricInfo] {
    match (info.device_type, info.metric) {
        (DeviceType::Independent, _) => ON_INDEPENDENT,
        (_, Metric::GpuFanSpeed) => FANS_ON_ADAPTERS,
        _ => ON_ADAPTERS,
    }
}

/// Table row for `metric`.
pub fn metric_info(metric: Metric) -> Option<&'static MetricInfo> {
    METRICS.iter().find(|info| info.metric == metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_metric_has_exactly_one_row() {
        assert_eq!(METRICS.len(), Metric::ALL.len());
        for metric in Metric::ALL {
            assert_eq!(
                METRICS.iter().filter(|i| i.metric == *metric).count(),
                1,
                "{metric}"
            );
        }
    }

    #[test]
    fn enum_typed_rows_name_their_enum() {
        for info in METRICS {
            assert_eq!(
                info.data_type == DataType::Enum,
                info.enum_id.is_some(),
                "{}",
                info.metric
            );
        }
    }

    #[test]
    fn availability_rule() {
        let fps = metric_info(Metric::DisplayedFps).unwrap();
        assert_eq!(device_metric_info(fps), &[available(0, 1)]);

        let fan = metric_info(Metric::GpuFanSpeed).unwrap();
        assert_eq!(device_metric_info(fan), &[available(1, 1), available(2, 2)]);

        let power = metric_info(Metric::GpuPower).unwrap();
        assert_eq!(device_metric_info(power), &[available(1, 1), available(2, 1)]);
    }

    #[test]
    fn device_ids_are_dense() {
        for (i, device) in DEVICES.iter().enumerate() {
            assert_eq!(device.id, i as u32);
        }
    }
}
