//! Where each metric lives inside a [`FrameRecord`](crate::FrameRecord).

use std::mem::offset_of;

use pmipc_intro::Metric;

use crate::record::FrameRecord;

/// Placement of one metric inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    /// Byte offset of element 0.
    pub offset: usize,
    pub element_size: usize,
    /// Number of elements; 1 for scalars.
    pub array_len: usize,
}

const fn scalar(offset: usize, element_size: usize) -> Option<FieldLayout> {
    Some(FieldLayout {
        offset,
        element_size,
        array_len: 1,
    })
}

/// Layout of `metric` in the current record revision.
///
/// Metrics that are not carried per frame (window statistics, static device
/// properties) have no layout.
pub const fn field_layout(metric: Metric) -> Option<FieldLayout> {
    match metric {
        Metric::PresentQpc => scalar(offset_of!(FrameRecord, present_event.qpc_start), 8),
        Metric::PresentMode => scalar(offset_of!(FrameRecord, present_event.present_mode), 4),
        Metric::PresentRuntime => scalar(offset_of!(FrameRecord, present_event.runtime), 4),
        Metric::SyncInterval => scalar(offset_of!(FrameRecord, present_event.sync_interval), 4),
        Metric::AllowsTearing => scalar(offset_of!(FrameRecord, present_event.allows_tearing), 1),
        Metric::TimeInPresent => scalar(offset_of!(FrameRecord, present_event.time_in_present), 8),
        Metric::ReadyTime => scalar(offset_of!(FrameRecord, present_event.ready_time), 8),
        Metric::GpuPower => scalar(offset_of!(FrameRecord, power_telemetry.gpu_power_w), 4),
        Metric::GpuVoltage => scalar(offset_of!(FrameRecord, power_telemetry.gpu_voltage_v), 4),
        Metric::GpuFrequency => {
            scalar(offset_of!(FrameRecord, power_telemetry.gpu_frequency_mhz), 4)
        }
        Metric::GpuTemperature => {
            scalar(offset_of!(FrameRecord, power_telemetry.gpu_temperature_c), 4)
        }
        Metric::GpuFanSpeed => Some(FieldLayout {
            offset: offset_of!(FrameRecord, power_telemetry.fan_speed_rpm),
            element_size: 4,
            array_len: 5,
        }),
        Metric::GpuUtilization => {
            scalar(offset_of!(FrameRecord, power_telemetry.gpu_utilization), 4)
        }
        Metric::CpuUtilization => {
            scalar(offset_of!(FrameRecord, cpu_telemetry.cpu_utilization), 8)
        }
        Metric::CpuPower => scalar(offset_of!(FrameRecord, cpu_telemetry.cpu_power_w), 8),
        Metric::CpuFrequency => scalar(offset_of!(FrameRecord, cpu_telemetry.cpu_frequency), 8),
        Metric::DisplayedFps
        | Metric::PresentedFps
        | Metric::FrameTime
        | Metric::GpuBusyTime
        | Metric::GpuVendor
        | Metric::GpuName => None,
    }
}

/// Widest single element any metric copies.
pub const MAX_ELEMENT_SIZE: usize = {
    let mut max = 0;
    let mut i = 0;
    while i < Metric::ALL.len() {
        if let Some(layout) = field_layout(Metric::ALL[i])
            && layout.element_size > max
        {
            max = layout.element_size;
        }
        i += 1;
    }
    max
};

#[cfg(test)]
mod tests {
    use super::*;
    use pmipc_intro::{data_type_size, metric_info};

    #[test]
    fn widest_element_is_eight_bytes() {
        assert_eq!(MAX_ELEMENT_SIZE, 8);
    }

    #[test]
    fn known_offsets() {
        assert_eq!(field_layout(Metric::PresentMode), scalar(8, 4));
        assert_eq!(field_layout(Metric::GpuPower), scalar(40, 4));
        assert_eq!(
            field_layout(Metric::GpuFanSpeed),
            Some(FieldLayout {
                offset: 56,
                element_size: 4,
                array_len: 5
            })
        );
        assert_eq!(field_layout(Metric::FrameTime), None);
    }

    #[test]
    fn element_sizes_match_the_metric_table() {
        for metric in Metric::ALL {
            let Some(layout) = field_layout(*metric) else {
                continue;
            };
            let info = metric_info(*metric).unwrap();
            assert_eq!(layout.element_size, data_type_size(info.data_type), "{metric}");
        }
    }

    #[test]
    fn every_field_lies_inside_the_record() {
        for metric in Metric::ALL {
            if let Some(layout) = field_layout(*metric) {
                let end = layout.offset + layout.element_size * layout.array_len;
                assert!(end <= size_of::<FrameRecord>(), "{metric}");
                assert_eq!(layout.offset % layout.element_size, 0, "{metric}");
            }
        }
    }
}
