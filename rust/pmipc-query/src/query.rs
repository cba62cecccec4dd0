//! Query compilation and execution.
//!
//! A query is a list of [`QueryElement`]s. Compiling it produces one
//! [`CopyCommand`] per element and writes each element's place in the output
//! blob back onto the element. Executing the query replays the commands
//! against any number of records, filling one blob per record.

use std::mem::size_of;

use pmipc_intro::{Metric, Stat};
use static_assertions::{assert_eq_size, const_assert};

use crate::layout::{FieldLayout, MAX_ELEMENT_SIZE, field_layout};
use crate::record::FrameRecord;

/// One requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryElement {
    pub metric: Metric,
    pub stat: Stat,
    pub device_id: u32,
    pub array_index: u32,
    /// Set by compilation: where the value starts in the blob.
    pub data_offset: u64,
    /// Set by compilation: how many bytes the value occupies.
    pub data_size: u64,
}

impl QueryElement {
    pub const fn new(metric: Metric, device_id: u32, array_index: u32) -> Self {
        Self {
            metric,
            stat: Stat::None,
            device_id,
            array_index,
            data_offset: 0,
            data_size: 0,
        }
    }
}

/// Copy `size` bytes from `source_offset` in the record, after `padding`
/// bytes of alignment in the blob.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCommand {
    pub source_offset: u32,
    pub padding: u8,
    pub size: u16,
}

assert_eq_size!(CopyCommand, [u8; 8]);
// Offsets, sizes and padding (< element size) fit the command's fields.
const_assert!(size_of::<FrameRecord>() <= u16::MAX as usize);
const_assert!(MAX_ELEMENT_SIZE <= u8::MAX as usize);

impl CopyCommand {
    fn source(&self) -> std::ops::Range<usize> {
        let start = self.source_offset as usize;
        start..start + self.size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The metric is not carried in the frame record.
    UnknownMetric { element: usize, metric: Metric },
    /// Frame queries only return raw values.
    UnsupportedStat { element: usize, stat: Stat },
    ArrayIndexOutOfRange {
        element: usize,
        array_index: u32,
        array_len: usize,
    },
    /// A record handed to execution is shorter than the fields it reads.
    RecordTooSmall { needed: usize, len: usize },
    /// The destination cannot hold the blobs requested.
    BlobTooSmall { needed: usize, len: usize },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMetric { element, metric } => {
                write!(f, "element {}: {} is not a frame metric", element, metric)
            }
            Self::UnsupportedStat { element, stat } => write!(
                f,
                "element {}: stat {} is not available for frame queries",
                element, stat
            ),
            Self::ArrayIndexOutOfRange {
                element,
                array_index,
                array_len,
            } => write!(
                f,
                "element {}: array index {} out of range (len {})",
                element, array_index, array_len
            ),
            Self::RecordTooSmall { needed, len } => {
                write!(f, "record too small: need {} bytes, got {}", needed, len)
            }
            Self::BlobTooSmall { needed, len } => {
                write!(f, "blob too small: need {} bytes, got {}", needed, len)
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// A compiled frame query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    commands: Vec<CopyCommand>,
    blob_size: usize,
    /// Furthest record byte any command reads.
    record_extent: usize,
}

impl CompiledQuery {
    /// Compile `elements` in order, writing each one's blob placement back.
    ///
    /// Elements are left untouched if any of them fails to compile.
    pub fn compile(elements: &mut [QueryElement]) -> Result<Self, QueryError> {
        let mut commands = Vec::with_capacity(elements.len());
        let mut placements = Vec::with_capacity(elements.len());
        let mut blob_size = 0usize;
        let mut record_extent = 0usize;

        for (i, element) in elements.iter().enumerate() {
            let layout = resolve(i, element)?;
            let size = layout.element_size;
            let padding = (size - blob_size % size) % size;
            let source_offset = layout.offset + size * element.array_index as usize;

            commands.push(CopyCommand {
                source_offset: source_offset as u32,
                padding: padding as u8,
                size: size as u16,
            });
            placements.push((blob_size + padding, size));
            blob_size += padding + size;
            record_extent = record_extent.max(source_offset + size);
        }

        for (element, (offset, size)) in elements.iter_mut().zip(placements) {
            element.data_offset = offset as u64;
            element.data_size = size as u64;
        }

        tracing::debug!(
            elements = elements.len(),
            blob_size,
            "compiled frame query"
        );
        Ok(Self {
            commands,
            blob_size,
            record_extent,
        })
    }

    pub fn commands(&self) -> &[CopyCommand] {
        &self.commands
    }

    /// Bytes one executed blob occupies.
    pub fn blob_size(&self) -> usize {
        self.blob_size
    }

    /// Fill `blob` from the raw bytes of one record.
    pub fn gather(&self, record: &[u8], blob: &mut [u8]) -> Result<(), QueryError> {
        if record.len() < self.record_extent {
            return Err(QueryError::RecordTooSmall {
                needed: self.record_extent,
                len: record.len(),
            });
        }
        if blob.len() < self.blob_size {
            return Err(QueryError::BlobTooSmall {
                needed: self.blob_size,
                len: blob.len(),
            });
        }
        self.replay(record, blob);
        Ok(())
    }

    pub fn gather_record(&self, record: &FrameRecord, blob: &mut [u8]) -> Result<(), QueryError> {
        self.gather(record.as_bytes(), blob)
    }

    /// Fill one blob per record, back to back in `out`.
    pub fn gather_records(
        &self,
        records: &[FrameRecord],
        out: &mut [u8],
    ) -> Result<(), QueryError> {
        let needed = self.blob_size.saturating_mul(records.len());
        if out.len() < needed {
            return Err(QueryError::BlobTooSmall {
                needed,
                len: out.len(),
            });
        }
        if self.blob_size == 0 {
            return Ok(());
        }
        for (record, blob) in records.iter().zip(out.chunks_exact_mut(self.blob_size)) {
            self.replay(record.as_bytes(), blob);
        }
        Ok(())
    }

    /// Bounds were checked by the caller.
    fn replay(&self, record: &[u8], blob: &mut [u8]) {
        let mut cursor = 0;
        for command in &self.commands {
            cursor += command.padding as usize;
            let size = command.size as usize;
            blob[cursor..cursor + size].copy_from_slice(&record[command.source()]);
            cursor += size;
        }
    }
}

fn resolve(index: usize, element: &QueryElement) -> Result<FieldLayout, QueryError> {
    let layout = field_layout(element.metric).ok_or(QueryError::UnknownMetric {
        element: index,
        metric: element.metric,
    })?;
    if element.stat != Stat::None {
        return Err(QueryError::UnsupportedStat {
            element: index,
            stat: element.stat,
        });
    }
    if element.array_index as usize >= layout.array_len {
        return Err(QueryError::ArrayIndexOutOfRange {
            element: index,
            array_index: element.array_index,
            array_len: layout.array_len,
        });
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(present_mode: u32, gpu_power_w: f32) -> FrameRecord {
        let mut record = FrameRecord::default();
        record.present_event.present_mode = present_mode;
        record.power_telemetry.gpu_power_w = gpu_power_w;
        record
    }

    #[test]
    fn present_mode_and_gpu_power() {
        let mut elements = [
            QueryElement::new(Metric::PresentMode, 0, 0),
            QueryElement::new(Metric::GpuPower, 1, 0),
        ];
        let query = CompiledQuery::compile(&mut elements).unwrap();

        assert_eq!(query.blob_size(), 8);
        assert_eq!(
            query.commands(),
            &[
                CopyCommand {
                    source_offset: 8,
                    padding: 0,
                    size: 4
                },
                CopyCommand {
                    source_offset: 40,
                    padding: 0,
                    size: 4
                },
            ]
        );
        assert_eq!((elements[0].data_offset, elements[0].data_size), (0, 4));
        assert_eq!((elements[1].data_offset, elements[1].data_size), (4, 4));

        let mut blob = [0u8; 8];
        query.gather_record(&record(2, 150.5), &mut blob).unwrap();
        assert_eq!(&blob[..4], &2u32.to_ne_bytes());
        assert_eq!(&blob[4..], &150.5f32.to_ne_bytes());
    }

    #[test]
    fn commands_use_compact_widths() {
        let mut elements = [
            QueryElement::new(Metric::AllowsTearing, 0, 0),
            QueryElement::new(Metric::CpuFrequency, 0, 0),
            QueryElement::new(Metric::GpuFanSpeed, 2, 4),
        ];
        let query = CompiledQuery::compile(&mut elements).unwrap();
        assert_eq!(std::mem::size_of::<CopyCommand>(), 8);
        assert_eq!(
            query.commands(),
            &[
                CopyCommand {
                    source_offset: 20,
                    padding: 0,
                    size: 1
                },
                CopyCommand {
                    source_offset: 96,
                    padding: 7,
                    size: 8
                },
                CopyCommand {
                    source_offset: 72,
                    padding: 0,
                    size: 4
                },
            ]
        );
        assert_eq!(query.blob_size(), 20);
    }

    #[test]
    fn compilation_is_deterministic_and_keeps_order() {
        let request = [
            QueryElement::new(Metric::PresentMode, 0, 0),
            QueryElement::new(Metric::GpuFanSpeed, 2, 2),
            QueryElement::new(Metric::PresentMode, 0, 0),
        ];
        let mut first = request;
        let mut second = request;
        let a = CompiledQuery::compile(&mut first).unwrap();
        let b = CompiledQuery::compile(&mut second).unwrap();
        assert_eq!(a, b);
        assert_eq!(first, second);

        assert_eq!(a.commands()[1].source_offset, 56 + 2 * 4);
        assert_eq!(
            first.map(|e| (e.data_offset, e.data_size)),
            [(0, 4), (4, 4), (8, 4)]
        );
    }

    #[test]
    fn fields_are_aligned_to_their_size() {
        let mut elements = [
            QueryElement::new(Metric::AllowsTearing, 0, 0),
            QueryElement::new(Metric::PresentQpc, 0, 0),
            QueryElement::new(Metric::AllowsTearing, 0, 0),
            QueryElement::new(Metric::GpuPower, 1, 0),
            QueryElement::new(Metric::CpuPower, 0, 0),
        ];
        let query = CompiledQuery::compile(&mut elements).unwrap();
        for element in &elements {
            assert_eq!(element.data_offset % element.data_size, 0, "{:?}", element);
        }
        // 1 + pad 7 + 8 + 1 + pad 3 + 4 + 8
        assert_eq!(query.blob_size(), 32);
        assert_eq!(query.commands()[1].padding, 7);
        assert_eq!(query.commands()[3].padding, 3);
    }

    #[test]
    fn execution_is_repeatable_across_records() {
        let mut elements = [
            QueryElement::new(Metric::SyncInterval, 0, 0),
            QueryElement::new(Metric::CpuUtilization, 0, 0),
        ];
        let query = CompiledQuery::compile(&mut elements).unwrap();

        let mut a = FrameRecord::default();
        a.present_event.sync_interval = 1;
        a.cpu_telemetry.cpu_utilization = 12.5;
        let mut b = a;
        b.cpu_telemetry.cpu_utilization = 99.0;

        let mut blob_a = vec![0u8; query.blob_size()];
        let mut blob_b = vec![0u8; query.blob_size()];
        query.gather_record(&a, &mut blob_a).unwrap();
        query.gather_record(&b, &mut blob_b).unwrap();

        let start = elements[1].data_offset as usize;
        let value = start..start + elements[1].data_size as usize;
        for i in 0..blob_a.len() {
            if value.contains(&i) {
                continue;
            }
            assert_eq!(blob_a[i], blob_b[i], "byte {i}");
        }
        assert_eq!(&blob_a[value.clone()], &12.5f64.to_ne_bytes());
        assert_eq!(&blob_b[value], &99.0f64.to_ne_bytes());
    }

    #[test]
    fn rejected_elements() {
        let mut unknown = [QueryElement::new(Metric::DisplayedFps, 0, 0)];
        assert_eq!(
            CompiledQuery::compile(&mut unknown),
            Err(QueryError::UnknownMetric {
                element: 0,
                metric: Metric::DisplayedFps
            })
        );

        let mut stat = [QueryElement {
            stat: Stat::Avg,
            ..QueryElement::new(Metric::GpuPower, 1, 0)
        }];
        assert!(matches!(
            CompiledQuery::compile(&mut stat),
            Err(QueryError::UnsupportedStat { .. })
        ));

        let mut elements = [
            QueryElement::new(Metric::GpuPower, 1, 0),
            QueryElement::new(Metric::GpuFanSpeed, 2, 5),
        ];
        assert_eq!(
            CompiledQuery::compile(&mut elements),
            Err(QueryError::ArrayIndexOutOfRange {
                element: 1,
                array_index: 5,
                array_len: 5
            })
        );
        assert_eq!(elements[0].data_size, 0, "no write-back on failure");
    }

    #[test]
    fn short_buffers_are_rejected() {
        let mut elements = [QueryElement::new(Metric::CpuFrequency, 0, 0)];
        let query = CompiledQuery::compile(&mut elements).unwrap();

        let mut blob = [0u8; 4];
        assert_eq!(
            query.gather_record(&FrameRecord::default(), &mut blob),
            Err(QueryError::BlobTooSmall { needed: 8, len: 4 })
        );

        let mut blob = [0u8; 8];
        assert_eq!(
            query.gather(&[0u8; 64], &mut blob),
            Err(QueryError::RecordTooSmall {
                needed: 104,
                len: 64
            })
        );
    }

    #[test]
    fn many_records_fill_consecutive_blobs() {
        let mut elements = [
            QueryElement::new(Metric::PresentMode, 0, 0),
            QueryElement::new(Metric::GpuPower, 1, 0),
        ];
        let query = CompiledQuery::compile(&mut elements).unwrap();
        let records = [record(1, 10.0), record(3, 30.0)];

        let mut out = vec![0u8; query.blob_size() * records.len()];
        query.gather_records(&records, &mut out).unwrap();
        assert_eq!(&out[0..4], &1u32.to_ne_bytes());
        assert_eq!(&out[8..12], &3u32.to_ne_bytes());
        assert_eq!(&out[12..16], &30.0f32.to_ne_bytes());
    }
}
