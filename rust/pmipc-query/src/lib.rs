//! Frame queries.
//!
//! A consumer names the per-frame fields it wants as [`QueryElement`]s and
//! compiles them once into a [`CompiledQuery`]: a list of copy commands
//! against the fixed [`FrameRecord`] layout plus the packed size of the
//! result. Executing the query copies those fields out of each record into a
//! blob, aligning every value to its own size.

pub mod layout;
pub mod query;
pub mod record;

pub use layout::{FieldLayout, field_layout};
pub use query::{CompiledQuery, CopyCommand, QueryElement, QueryError};
pub use record::{CpuTelemetry, FRAME_RECORD_VERSION, FrameRecord, PowerTelemetry, PresentEvent};
