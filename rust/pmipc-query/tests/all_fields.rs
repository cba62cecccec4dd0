use pmipc_intro::Metric;
use pmipc_query::{CompiledQuery, FrameRecord, QueryElement, field_layout};

fn sample_record() -> FrameRecord {
    let mut record = FrameRecord::default();
    record.present_event.qpc_start = 0x0102_0304_0506_0708;
    record.present_event.present_mode = 3;
    record.present_event.runtime = 1;
    record.present_event.sync_interval = -1;
    record.present_event.allows_tearing = 1;
    record.present_event.time_in_present = 4242;
    record.present_event.ready_time = 9001;
    record.power_telemetry.gpu_power_w = 150.5;
    record.power_telemetry.gpu_voltage_v = 1.05;
    record.power_telemetry.gpu_frequency_mhz = 2100.0;
    record.power_telemetry.gpu_temperature_c = 71.0;
    record.power_telemetry.fan_speed_rpm = [1000.0, 1100.0, 1200.0, 0.0, 0.0];
    record.power_telemetry.gpu_utilization = 97.0;
    record.cpu_telemetry.cpu_utilization = 35.25;
    record.cpu_telemetry.cpu_power_w = 65.0;
    record.cpu_telemetry.cpu_frequency = 4800.0;
    record
}

#[test]
fn every_frame_field_lands_where_the_element_says() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut elements = Vec::new();
    for metric in Metric::ALL {
        if let Some(layout) = field_layout(*metric) {
            for index in 0..layout.array_len as u32 {
                elements.push(QueryElement::new(*metric, 1, index));
            }
        }
    }
    let query = CompiledQuery::compile(&mut elements).unwrap();

    let record = sample_record();
    let mut blob = vec![0u8; query.blob_size()];
    query.gather_record(&record, &mut blob).unwrap();

    let bytes = record.as_bytes();
    for (element, command) in elements.iter().zip(query.commands()) {
        let offset = element.data_offset as usize;
        let size = element.data_size as usize;
        assert_eq!(offset % size, 0);
        assert_eq!(
            &blob[offset..offset + size],
            &bytes[command.source_offset as usize..][..size],
            "{:?}",
            element.metric
        );
    }

    let tearing = elements
        .iter()
        .find(|e| e.metric == Metric::AllowsTearing)
        .unwrap();
    assert_eq!(blob[tearing.data_offset as usize], 1);
}
