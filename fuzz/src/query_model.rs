//! Query compilation over arbitrary element lists.

use pmipc_intro::Metric;
use pmipc_query::{CompiledQuery, FrameRecord, QueryElement, QueryError, field_layout};

/// A request as the harness generates it: metric by index into
/// [`Metric::ALL`], plus an array index that may be out of range.
#[derive(Debug, Clone, Copy)]
pub struct Request {
    pub metric: usize,
    pub array_index: u32,
}

/// Compile `requests` and check the plan and one execution against `record`.
///
/// Valid requests must compile to size-aligned, non-overlapping fields laid
/// out in request order; executing the plan must copy exactly the record
/// bytes each command names. Invalid requests must be rejected, never
/// compiled to a silent no-op.
pub fn execute_and_verify(requests: &[Request], record: &FrameRecord) -> Result<(), String> {
    let mut elements: Vec<QueryElement> = requests
        .iter()
        .map(|r| QueryElement::new(Metric::ALL[r.metric % Metric::ALL.len()], 0, r.array_index))
        .collect();

    let first_invalid = elements.iter().position(|e| match field_layout(e.metric) {
        Some(layout) => e.array_index as usize >= layout.array_len,
        None => true,
    });

    let query = match (CompiledQuery::compile(&mut elements), first_invalid) {
        (Ok(query), None) => query,
        (Ok(_), Some(i)) => return Err(format!("element {} should have been rejected", i)),
        (Err(e), None) => return Err(format!("valid request rejected: {}", e)),
        (Err(e), Some(i)) => {
            return match e {
                QueryError::UnknownMetric { element, .. }
                | QueryError::ArrayIndexOutOfRange { element, .. }
                    if element == i =>
                {
                    Ok(())
                }
                other => Err(format!("element {} invalid, got {:?}", i, other)),
            };
        }
    };

    let mut cursor = 0u64;
    for (i, element) in elements.iter().enumerate() {
        if element.data_size == 0 || element.data_offset % element.data_size != 0 {
            return Err(format!("element {} misplaced: {:?}", i, element));
        }
        if element.data_offset < cursor {
            return Err(format!("element {} overlaps its predecessor", i));
        }
        cursor = element.data_offset + element.data_size;
    }
    if cursor as usize != query.blob_size() {
        return Err(format!(
            "blob size {} but last field ends at {}",
            query.blob_size(),
            cursor
        ));
    }

    let mut blob = vec![0u8; query.blob_size()];
    query
        .gather_record(record, &mut blob)
        .map_err(|e| e.to_string())?;
    let bytes = record.as_bytes();
    for (element, command) in elements.iter().zip(query.commands()) {
        let at = element.data_offset as usize;
        let size = element.data_size as usize;
        let source = command.source_offset as usize;
        if size != command.size as usize || blob[at..at + size] != bytes[source..source + size] {
            return Err(format!("{:?} copied the wrong bytes", element.metric));
        }
    }
    Ok(())
}
