//! Property harnesses for pmipc.
//!
//! The heap model drives a real [`pmipc_shm::Segment`] over a heap buffer and
//! checks it against a shadow list of live blocks. The query model compiles
//! arbitrary element lists and checks the resulting blob layout.

pub mod heap_model;
pub mod query_model;
