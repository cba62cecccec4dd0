//! The native frame record the producer writes for every present.
//!
//! Field offsets are part of the contract with consumers' compiled queries.
//! Changing the layout means bumping [`FRAME_RECORD_VERSION`] and updating
//! [`crate::field_layout`] together.

use static_assertions::{assert_eq_align, assert_eq_size, const_assert_eq};
use std::mem::offset_of;

/// Layout revision of [`FrameRecord`].
pub const FRAME_RECORD_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentEvent {
    /// Performance counter value when the present started.
    pub qpc_start: u64,
    pub present_mode: u32,
    pub runtime: u32,
    pub sync_interval: i32,
    /// Zero or one.
    pub allows_tearing: u8,
    pub _reserved: [u8; 3],
    pub time_in_present: u64,
    pub ready_time: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerTelemetry {
    pub gpu_power_w: f32,
    pub gpu_voltage_v: f32,
    pub gpu_frequency_mhz: f32,
    pub gpu_temperature_c: f32,
    pub fan_speed_rpm: [f32; 5],
    pub gpu_utilization: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTelemetry {
    pub cpu_utilization: f64,
    pub cpu_power_w: f64,
    pub cpu_frequency: f64,
}

/// Everything known about one frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameRecord {
    pub present_event: PresentEvent,
    pub power_telemetry: PowerTelemetry,
    pub cpu_telemetry: CpuTelemetry,
}

assert_eq_size!(FrameRecord, [u8; 104]);
assert_eq_align!(FrameRecord, u64);
const_assert_eq!(offset_of!(FrameRecord, present_event.qpc_start), 0);
const_assert_eq!(offset_of!(FrameRecord, present_event.present_mode), 8);
const_assert_eq!(offset_of!(FrameRecord, present_event.runtime), 12);
const_assert_eq!(offset_of!(FrameRecord, present_event.sync_interval), 16);
const_assert_eq!(offset_of!(FrameRecord, present_event.allows_tearing), 20);
const_assert_eq!(offset_of!(FrameRecord, present_event.time_in_present), 24);
const_assert_eq!(offset_of!(FrameRecord, present_event.ready_time), 32);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.gpu_power_w), 40);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.gpu_voltage_v), 44);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.gpu_frequency_mhz), 48);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.gpu_temperature_c), 52);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.fan_speed_rpm), 56);
const_assert_eq!(offset_of!(FrameRecord, power_telemetry.gpu_utilization), 76);
const_assert_eq!(offset_of!(FrameRecord, cpu_telemetry.cpu_utilization), 80);
const_assert_eq!(offset_of!(FrameRecord, cpu_telemetry.cpu_power_w), 88);
const_assert_eq!(offset_of!(FrameRecord, cpu_telemetry.cpu_frequency), 96);

impl FrameRecord {
    /// The record's bytes as a query reads them.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: repr(C) with no padding (checked above), so every byte is
        // initialized.
        unsafe {
            std::slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>())
        }
    }
}
