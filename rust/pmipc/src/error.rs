use pmipc_intro::CloneError;
use pmipc_query::QueryError;
use pmipc_shm::{AllocError, NamedSegmentError, SegmentError};

use crate::config::ConfigError;

/// Errors from producer and consumer sessions.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    /// Creating, opening or mapping the named segment failed.
    Segment(NamedSegmentError),
    /// An offset or name in the segment did not check out.
    Layout(SegmentError),
    /// The segment ran out of room while building the tree.
    Alloc(AllocError),
    Clone(CloneError),
    Query(QueryError),
    /// Nothing is published under this name.
    NotPublished(&'static str),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Segment(e) => write!(f, "named segment: {}", e),
            Self::Layout(e) => write!(f, "segment layout: {}", e),
            Self::Alloc(e) => write!(f, "segment allocation: {}", e),
            Self::Clone(e) => write!(f, "introspection clone: {}", e),
            Self::Query(e) => write!(f, "query: {}", e),
            Self::NotPublished(name) => write!(f, "nothing published as {:?}", name),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Segment(e) => Some(e),
            Self::Layout(e) => Some(e),
            Self::Alloc(e) => Some(e),
            Self::Clone(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::NotPublished(_) => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<NamedSegmentError> for SessionError {
    fn from(e: NamedSegmentError) -> Self {
        Self::Segment(e)
    }
}

impl From<SegmentError> for SessionError {
    fn from(e: SegmentError) -> Self {
        Self::Layout(e)
    }
}

impl From<AllocError> for SessionError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

impl From<CloneError> for SessionError {
    fn from(e: CloneError) -> Self {
        Self::Clone(e)
    }
}

impl From<QueryError> for SessionError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}
