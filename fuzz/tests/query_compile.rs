//! Bolero harness for frame query compilation.
//!
//! Properties tested:
//! - Valid requests compile to size-aligned fields in request order
//! - The blob ends exactly at the last field
//! - Execution copies exactly the bytes each command names
//! - Unknown metrics and out-of-range array indices are rejected

use bolero::check;
use pmipc_fuzz::query_model::{Request, execute_and_verify};
use pmipc_query::FrameRecord;

fn main() {
    check!()
        .with_type::<(Vec<RequestInput>, Vec<u8>)>()
        .for_each(|(requests, raw)| {
            let requests: Vec<Request> = requests.iter().map(RequestInput::to_request).collect();
            let record = record_from(raw);
            if let Err(e) = execute_and_verify(&requests, &record) {
                panic!("Invariant violated: {}", e);
            }
        });
}

/// Fuzz-friendly input type for one query element.
#[derive(Debug, Clone, bolero::TypeGenerator)]
struct RequestInput {
    metric: u8,
    array_index: u8,
}

impl RequestInput {
    fn to_request(&self) -> Request {
        Request {
            metric: self.metric as usize,
            array_index: (self.array_index % 8) as u32,
        }
    }
}

/// Spread arbitrary bytes over the record's fields; missing bytes read as 0.
fn record_from(raw: &[u8]) -> FrameRecord {
    let mut record = FrameRecord::default();
    let byte = |i: usize| raw.get(i).copied().unwrap_or(0);
    let word = |i: usize| u32::from_ne_bytes([byte(i), byte(i + 1), byte(i + 2), byte(i + 3)]);
    record.present_event.qpc_start = u64::from(word(0)) << 32 | u64::from(word(4));
    record.present_event.present_mode = word(8);
    record.present_event.runtime = word(12);
    record.present_event.sync_interval = word(16) as i32;
    record.present_event.allows_tearing = byte(20) & 1;
    record.present_event.time_in_present = u64::from(word(24));
    record.present_event.ready_time = u64::from(word(32));
    record.power_telemetry.gpu_power_w = f32::from_bits(word(40));
    for (i, fan) in record.power_telemetry.fan_speed_rpm.iter_mut().enumerate() {
        *fan = f32::from_bits(word(56 + 4 * i));
    }
    record.cpu_telemetry.cpu_power_w = f64::from(word(88));
    record
}

#[cfg(test)]
mod tests {
    use pmipc_fuzz::query_model::{Request, execute_and_verify};
    use pmipc_query::FrameRecord;

    #[test]
    fn mixed_sizes() {
        // Metric indices follow declaration order: 8 = allows tearing,
        // 4 = present qpc, 15 = gpu fan speed, 18 = cpu power.
        let requests = [
            Request { metric: 8, array_index: 0 },
            Request { metric: 4, array_index: 0 },
            Request { metric: 15, array_index: 4 },
            Request { metric: 18, array_index: 0 },
        ];
        execute_and_verify(&requests, &FrameRecord::default()).unwrap();
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let requests = [
            Request { metric: 6, array_index: 0 },
            Request { metric: 0, array_index: 0 },
        ];
        execute_and_verify(&requests, &FrameRecord::default()).unwrap();

        let requests = [Request { metric: 15, array_index: 5 }];
        execute_and_verify(&requests, &FrameRecord::default()).unwrap();
    }
}
