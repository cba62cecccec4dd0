//! The consumer side.

use pmipc_intro::{ApiRoot, FlatClone, ROOT_NAME, RootNode, deep_clone};
use pmipc_query::{CompiledQuery, CopyCommand, FrameRecord, QueryElement, QueryError};
use pmipc_shm::{NamedSegment, Segment};

use crate::config::ServiceConfig;
use crate::error::SessionError;

/// A consumer's view of a producer's segment.
pub struct Session {
    segment: NamedSegment,
}

impl Session {
    /// Attach to the segment named by `config`.
    pub fn open(config: &ServiceConfig) -> Result<Self, SessionError> {
        let segment = NamedSegment::open(&config.directory, &config.segment_name)?;
        Ok(Self { segment })
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Clone the published introspection tree into process-local memory.
    ///
    /// The result does not borrow the session and survives it.
    pub fn introspection_root(&self) -> Result<FlatClone<ApiRoot>, SessionError> {
        let ptr = self
            .segment
            .find::<RootNode>(ROOT_NAME)
            .ok_or(SessionError::NotPublished(ROOT_NAME))?;
        let root = self.segment.resolve(ptr, 1)?;
        // SAFETY: resolved in bounds and aligned; the producer publishes the
        // tree only once it is complete and never mutates it afterwards.
        let root = unsafe { &*root };

        let clone = deep_clone(root, &self.segment)?;
        tracing::debug!(
            bytes = clone.size(),
            metrics = clone.metrics().len(),
            "cloned introspection root"
        );
        Ok(clone)
    }

    /// Compile a frame query, writing each element's blob placement back.
    pub fn register_frame_query(
        &self,
        elements: &mut [QueryElement],
    ) -> Result<FrameQuery, SessionError> {
        let compiled = CompiledQuery::compile(elements)?;
        Ok(FrameQuery { compiled })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.segment.path())
            .finish()
    }
}

/// A registered frame query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameQuery {
    compiled: CompiledQuery,
}

impl FrameQuery {
    pub fn blob_size(&self) -> usize {
        self.compiled.blob_size()
    }

    pub fn commands(&self) -> &[CopyCommand] {
        self.compiled.commands()
    }

    /// A zeroed blob of the right size for one frame.
    pub fn new_blob(&self) -> Vec<u8> {
        vec![0; self.compiled.blob_size()]
    }

    pub fn consume(&self, record: &FrameRecord, blob: &mut [u8]) -> Result<(), QueryError> {
        self.compiled.gather_record(record, blob)
    }

    /// One blob per record, back to back in `out`.
    pub fn consume_all(&self, records: &[FrameRecord], out: &mut [u8]) -> Result<(), QueryError> {
        self.compiled.gather_records(records, out)
    }
}
