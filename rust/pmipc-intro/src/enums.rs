//! Closed vocabularies shared by the producer and every consumer.
//!
//! Each enumeration is declared once with [`wire_enum!`], which yields the
//! Rust enum (with a stable `u32` wire value), checked decoding, and a table
//! of per-key descriptive strings used to populate the introspection tree.

use std::fmt;

/// Descriptive strings for one key of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumKeyInfo {
    pub value: i32,
    pub symbol: &'static str,
    pub name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
}

/// One enumeration as published in the introspection tree.
#[derive(Debug, Clone, Copy)]
pub struct EnumInfo {
    pub id: EnumId,
    pub symbol: &'static str,
    pub description: &'static str,
    pub keys: &'static [EnumKeyInfo],
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $enum_id:ident ($symbol:literal, $description:literal) {
            $(
                $variant:ident = $value:literal =>
                    ($key_symbol:literal, $key_name:literal, $short:literal, $key_description:literal)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $( $variant = $value, )*
        }

        impl $name {
            pub const ENUM_ID: EnumId = EnumId::$enum_id;
            pub const SYMBOL: &'static str = $symbol;
            pub const DESCRIPTION: &'static str = $description;

            pub const ALL: &'static [Self] = &[ $( Self::$variant, )* ];

            pub const KEYS: &'static [EnumKeyInfo] = &[
                $(
                    EnumKeyInfo {
                        value: $value,
                        symbol: $key_symbol,
                        name: $key_name,
                        short_name: $short,
                        description: $key_description,
                    },
                )*
            ];

            pub const INFO: EnumInfo = EnumInfo {
                id: EnumId::$enum_id,
                symbol: $symbol,
                description: $description,
                keys: Self::KEYS,
            };

            #[inline]
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )*
                    _ => None,
                }
            }

            #[inline]
            pub const fn as_u32(self) -> u32 {
                self as u32
            }

            pub fn key(self) -> &'static EnumKeyInfo {
                let index = Self::ALL
                    .iter()
                    .position(|v| *v == self)
                    .unwrap_or_default();
                &Self::KEYS[index]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key().symbol)
            }
        }
    };
}

wire_enum! {
    /// Identifies each enumeration; the enumeration of enumerations.
    pub enum EnumId as Enum ("ENUM", "List of all enumerations") {
        Status = 1 => ("ENUM_STATUS", "Status", "Status", "Operation status codes"),
        Metric = 2 => ("ENUM_METRIC", "Metric", "Metric", "Metric identifiers"),
        MetricType = 3 => ("ENUM_METRIC_TYPE", "Metric Type", "Met Type", "How and when a metric is sampled"),
        DeviceVendor = 4 => ("ENUM_DEVICE_VENDOR", "Device Vendor", "Vendor", "Hardware vendors"),
        PresentMode = 5 => ("ENUM_PRESENT_MODE", "Present Mode", "Pres Mode", "How frames reach the display"),
        Unit = 6 => ("ENUM_UNIT", "Unit", "Unit", "Units of measure"),
        Stat = 7 => ("ENUM_STAT", "Statistic", "Stat", "Statistics computed over a window of samples"),
        DataType = 8 => ("ENUM_DATA_TYPE", "Data Type", "Type", "Value types of metric data"),
        GraphicsRuntime = 9 => ("ENUM_GRAPHICS_RUNTIME", "Graphics Runtime", "Runtime", "Graphics runtimes issuing presents"),
        DeviceType = 10 => ("ENUM_DEVICE_TYPE", "Device Type", "Dev Type", "Kinds of device a metric can be attributed to"),
        MetricAvailability = 11 => ("ENUM_METRIC_AVAILABILITY", "Metric Availability", "Avail", "Whether a device provides a metric"),
        Enum = 12 => ("ENUM_ENUM", "Enumeration", "Enum", "The list of enumerations itself"),
    }
}

wire_enum! {
    pub enum Status as Status ("STATUS", "Operation status codes") {
        Success = 0 => ("STATUS_SUCCESS", "Success", "Ok", "Operation succeeded"),
        Failure = 1 => ("STATUS_FAILURE", "Failure", "Fail", "Operation failed"),
        SessionNotOpen = 2 => ("STATUS_SESSION_NOT_OPEN", "Session Not Open", "No Sess", "No session is open"),
        InvalidQuery = 3 => ("STATUS_INVALID_QUERY", "Invalid Query", "Bad Qry", "A query element could not be compiled"),
    }
}

wire_enum! {
    pub enum Metric as Metric ("METRIC", "Metric identifiers") {
        DisplayedFps = 0 => ("METRIC_DISPLAYED_FPS", "Displayed FPS", "Disp FPS", "Rate of frames reaching the display"),
        PresentedFps = 1 => ("METRIC_PRESENTED_FPS", "Presented FPS", "Pres FPS", "Rate of frames presented by the application"),
        FrameTime = 2 => ("METRIC_FRAME_TIME", "Frame Time", "Frm Time", "Time between consecutive presents"),
        GpuBusyTime = 3 => ("METRIC_GPU_BUSY_TIME", "GPU Busy Time", "GPU Busy", "Time the GPU spent working on a frame"),
        PresentQpc = 4 => ("METRIC_PRESENT_QPC", "Present Start QPC", "Pres QPC", "Timestamp of the start of the present call"),
        PresentRuntime = 5 => ("METRIC_PRESENT_RUNTIME", "Present Runtime", "Runtime", "Graphics runtime that issued the present"),
        PresentMode = 6 => ("METRIC_PRESENT_MODE", "Present Mode", "Pres Mode", "How the frame reached the display"),
        SyncInterval = 7 => ("METRIC_SYNC_INTERVAL", "Sync Interval", "Sync Int", "Sync interval passed to the present call"),
        AllowsTearing = 8 => ("METRIC_ALLOWS_TEARING", "Allows Tearing", "Tearing", "Whether the present allowed tearing"),
        TimeInPresent = 9 => ("METRIC_TIME_IN_PRESENT", "Time In Present", "In Pres", "Ticks spent inside the present call"),
        ReadyTime = 10 => ("METRIC_READY_TIME", "Ready Time", "Ready", "Ticks until the frame was ready for display"),
        GpuPower = 11 => ("METRIC_GPU_POWER", "GPU Power", "GPU Pwr", "GPU board power draw"),
        GpuVoltage = 12 => ("METRIC_GPU_VOLTAGE", "GPU Voltage", "GPU Volt", "GPU core voltage"),
        GpuFrequency = 13 => ("METRIC_GPU_FREQUENCY", "GPU Frequency", "GPU Freq", "GPU core clock"),
        GpuTemperature = 14 => ("METRIC_GPU_TEMPERATURE", "GPU Temperature", "GPU Temp", "GPU die temperature"),
        GpuFanSpeed = 15 => ("METRIC_GPU_FAN_SPEED", "GPU Fan Speed", "GPU Fan", "Rotation speed of each GPU fan"),
        GpuUtilization = 16 => ("METRIC_GPU_UTILIZATION", "GPU Utilization", "GPU Util", "Share of time the GPU was busy"),
        CpuUtilization = 17 => ("METRIC_CPU_UTILIZATION", "CPU Utilization", "CPU Util", "Share of time the CPU was busy"),
        CpuPower = 18 => ("METRIC_CPU_POWER", "CPU Power", "CPU Pwr", "CPU package power draw"),
        CpuFrequency = 19 => ("METRIC_CPU_FREQUENCY", "CPU Frequency", "CPU Freq", "CPU core clock"),
        GpuVendor = 20 => ("METRIC_GPU_VENDOR", "GPU Vendor", "Vendor", "Vendor of the graphics adapter"),
        GpuName = 21 => ("METRIC_GPU_NAME", "GPU Name", "GPU", "Marketing name of the graphics adapter"),
    }
}

wire_enum! {
    pub enum MetricType as MetricType ("METRIC_TYPE", "How and when a metric is sampled") {
        Dynamic = 0 => ("METRIC_TYPE_DYNAMIC", "Dynamic", "Dyn", "Computed over a sliding window"),
        Static = 1 => ("METRIC_TYPE_STATIC", "Static", "Stat", "Fixed for the lifetime of a device"),
        FrameEvent = 2 => ("METRIC_TYPE_FRAME_EVENT", "Frame Event", "Frame", "Reported once per frame"),
        DynamicFrame = 3 => ("METRIC_TYPE_DYNAMIC_FRAME", "Dynamic and Frame Event", "Dyn/Frm", "Available both per frame and over a window"),
    }
}

wire_enum! {
    pub enum DeviceVendor as DeviceVendor ("DEVICE_VENDOR", "Hardware vendors") {
        Unknown = 0 => ("DEVICE_VENDOR_UNKNOWN", "Unknown", "Unk", "Vendor not known"),
        Intel = 1 => ("DEVICE_VENDOR_INTEL", "Intel", "INTC", "Intel Corporation"),
        Nvidia = 2 => ("DEVICE_VENDOR_NVIDIA", "NVIDIA", "NV", "NVIDIA Corporation"),
        Amd = 3 => ("DEVICE_VENDOR_AMD", "AMD", "AMD", "Advanced Micro Devices"),
    }
}

wire_enum! {
    pub enum PresentMode as PresentMode ("PRESENT_MODE", "How frames reach the display") {
        HardwareLegacyFlip = 0 => ("PRESENT_MODE_HARDWARE_LEGACY_FLIP", "Hardware: Legacy Flip", "HW Flip", "Legacy flip scanned out by hardware"),
        HardwareLegacyCopyToFrontBuffer = 1 => ("PRESENT_MODE_HARDWARE_LEGACY_COPY_TO_FRONT_BUFFER", "Hardware: Legacy Copy to front buffer", "HW Copy", "Legacy blit to the front buffer"),
        HardwareIndependentFlip = 2 => ("PRESENT_MODE_HARDWARE_INDEPENDENT_FLIP", "Hardware: Independent Flip", "HW iFlip", "Flip bypassing the compositor"),
        ComposedFlip = 3 => ("PRESENT_MODE_COMPOSED_FLIP", "Composed: Flip", "Cmp Flip", "Flip composed by the desktop compositor"),
        HardwareComposedIndependentFlip = 4 => ("PRESENT_MODE_HARDWARE_COMPOSED_INDEPENDENT_FLIP", "Hardware Composed: Independent Flip", "HW Cmp", "Flip composed in a hardware overlay plane"),
        ComposedCopyWithGpuGdi = 5 => ("PRESENT_MODE_COMPOSED_COPY_WITH_GPU_GDI", "Composed: Copy with GPU GDI", "Cmp GPU", "Copy composed with GPU GDI"),
        ComposedCopyWithCpuGdi = 6 => ("PRESENT_MODE_COMPOSED_COPY_WITH_CPU_GDI", "Composed: Copy with CPU GDI", "Cmp CPU", "Copy composed with CPU GDI"),
        Unknown = 7 => ("PRESENT_MODE_UNKNOWN", "Unknown", "Unk", "Present mode could not be determined"),
    }
}

wire_enum! {
    pub enum Unit as Unit ("UNIT", "Units of measure") {
        Dimensionless = 0 => ("UNIT_DIMENSIONLESS", "Dimensionless", "", "Plain number or identifier"),
        Boolean = 1 => ("UNIT_BOOLEAN", "Boolean", "T/F", "True or false"),
        FramesPerSecond = 2 => ("UNIT_FPS", "Frames Per Second", "fps", "Frames per second"),
        Milliseconds = 3 => ("UNIT_MILLISECONDS", "Milliseconds", "ms", "Thousandths of a second"),
        Percent = 4 => ("UNIT_PERCENT", "Percent", "%", "Hundredths of a whole"),
        Watts = 5 => ("UNIT_WATTS", "Watts", "W", "Power in watts"),
        Volts = 6 => ("UNIT_VOLTS", "Volts", "V", "Potential in volts"),
        Megahertz = 7 => ("UNIT_MEGAHERTZ", "Megahertz", "MHz", "Frequency in millions of cycles per second"),
        Celsius = 8 => ("UNIT_CELSIUS", "Degrees Celsius", "C", "Temperature in degrees Celsius"),
        Rpm = 9 => ("UNIT_RPM", "Revolutions Per Minute", "rpm", "Rotation speed"),
        Ticks = 10 => ("UNIT_TICKS", "Performance Counter Ticks", "ticks", "High resolution timer ticks"),
    }
}

wire_enum! {
    pub enum Stat as Stat ("STAT", "Statistics computed over a window of samples") {
        None = 0 => ("STAT_NONE", "None", "", "Raw value, no statistic"),
        Avg = 1 => ("STAT_AVG", "Average", "avg", "Arithmetic mean"),
        Percentile99 = 2 => ("STAT_PERCENTILE_99", "99th Percentile", "99%", "Value below which 99% of samples fall"),
        Percentile95 = 3 => ("STAT_PERCENTILE_95", "95th Percentile", "95%", "Value below which 95% of samples fall"),
        Percentile90 = 4 => ("STAT_PERCENTILE_90", "90th Percentile", "90%", "Value below which 90% of samples fall"),
        Max = 5 => ("STAT_MAX", "Maximum", "max", "Largest sample"),
        Min = 6 => ("STAT_MIN", "Minimum", "min", "Smallest sample"),
    }
}

wire_enum! {
    pub enum DataType as DataType ("DATA_TYPE", "Value types of metric data") {
        Double = 0 => ("DATA_TYPE_DOUBLE", "Double", "f64", "64-bit floating point"),
        Int32 = 1 => ("DATA_TYPE_INT32", "32-bit Signed Integer", "i32", "32-bit signed integer"),
        Uint32 = 2 => ("DATA_TYPE_UINT32", "32-bit Unsigned Integer", "u32", "32-bit unsigned integer"),
        Enum = 3 => ("DATA_TYPE_ENUM", "Enumeration", "enum", "Key of an enumeration, stored as 32 bits"),
        String = 4 => ("DATA_TYPE_STRING", "String", "str", "Nul-terminated text, fixed 260-byte buffer"),
        Uint64 = 5 => ("DATA_TYPE_UINT64", "64-bit Unsigned Integer", "u64", "64-bit unsigned integer"),
        Bool = 6 => ("DATA_TYPE_BOOL", "Boolean", "bool", "One byte, zero or one"),
        Float = 7 => ("DATA_TYPE_FLOAT", "Float", "f32", "32-bit floating point"),
    }
}

wire_enum! {
    pub enum GraphicsRuntime as GraphicsRuntime ("GRAPHICS_RUNTIME", "Graphics runtimes issuing presents") {
        Unknown = 0 => ("GRAPHICS_RUNTIME_UNKNOWN", "Unknown", "Unk", "Runtime not known"),
        Dxgi = 1 => ("GRAPHICS_RUNTIME_DXGI", "DXGI", "DXGI", "DirectX Graphics Infrastructure"),
        D3d9 = 2 => ("GRAPHICS_RUNTIME_D3D9", "Direct3D 9", "D3D9", "Direct3D 9"),
    }
}

wire_enum! {
    pub enum DeviceType as DeviceType ("DEVICE_TYPE", "Kinds of device a metric can be attributed to") {
        Independent = 0 => ("DEVICE_TYPE_INDEPENDENT", "Device Independent", "Indep", "Not tied to any device"),
        GraphicsAdapter = 1 => ("DEVICE_TYPE_GRAPHICS_ADAPTER", "Graphics Adapter", "GPU", "A graphics adapter"),
    }
}

wire_enum! {
    pub enum MetricAvailability as MetricAvailability ("METRIC_AVAILABILITY", "Whether a device provides a metric") {
        Available = 0 => ("METRIC_AVAILABILITY_AVAILABLE", "Available", "Avail", "The device reports this metric"),
        Unavailable = 1 => ("METRIC_AVAILABILITY_UNAVAILABLE", "Unavailable", "N/A", "The device cannot report this metric"),
    }
}

/// Every enumeration, in [`EnumId`] order.
pub const ENUMS: &[EnumInfo] = &[
    Status::INFO,
    Metric::INFO,
    MetricType::INFO,
    DeviceVendor::INFO,
    PresentMode::INFO,
    Unit::INFO,
    Stat::INFO,
    DataType::INFO,
    GraphicsRuntime::INFO,
    DeviceType::INFO,
    MetricAvailability::INFO,
    EnumId::INFO,
];

/// Bytes one value of `data_type` occupies.
pub const fn data_type_size(data_type: DataType) -> usize {
    match data_type {
        DataType::Double => 8,
        DataType::Int32 => 4,
        DataType::Uint32 => 4,
        DataType::Enum => 4,
        DataType::String => 260,
        DataType::Uint64 => 8,
        DataType::Bool => 1,
        DataType::Float => 4,
    }
}
