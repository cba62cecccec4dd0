//! The producer side.

use std::path::Path;

use pmipc_intro::{ROOT_NAME, RootNode};
use pmipc_shm::{NamedSegment, Segment, SegmentStatus, ShmPtr, ShmUnique};

use crate::config::ServiceConfig;
use crate::error::SessionError;

/// Owns the named segment and the introspection tree published in it.
///
/// Dropping the service withdraws the tree, frees it and removes the
/// segment name. Consumers that already mapped the segment keep their
/// mapping.
pub struct Service {
    segment: NamedSegment,
    root: ShmPtr<RootNode>,
}

impl Service {
    pub fn create(config: &ServiceConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let segment = NamedSegment::create(
            &config.directory,
            &config.segment_name,
            config.segment_size,
        )?;

        let tree = ShmUnique::new_in(segment.allocator(), RootNode::populate)?;
        let root = tree.into_raw();
        if let Err(e) = segment.publish(ROOT_NAME, root) {
            // SAFETY: `root` came from `into_raw` above and was never shared.
            drop(unsafe { ShmUnique::from_raw(root, segment.allocator()) });
            return Err(e.into());
        }

        tracing::debug!(
            path = %segment.path().display(),
            status = %segment.status(),
            "published introspection tree"
        );
        Ok(Self { segment, root })
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn path(&self) -> &Path {
        self.segment.path()
    }

    pub fn status(&self) -> SegmentStatus {
        self.segment.status()
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if self.segment.unpublish::<RootNode>(ROOT_NAME) != Some(self.root) {
            tracing::warn!(name = ROOT_NAME, "introspection root no longer published under its name");
        }
        // SAFETY: the service is the only owner of the tree.
        drop(unsafe { ShmUnique::from_raw(self.root, self.segment.allocator()) });
        tracing::debug!(status = %self.segment.status(), "released introspection tree");
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("path", &self.segment.path())
            .field("root", &self.root)
            .finish()
    }
}
