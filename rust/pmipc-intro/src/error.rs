use pmipc_shm::SegmentError;

/// Errors from cloning a tree out of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneError {
    /// The source tree holds an offset or string that does not check out.
    Segment(SegmentError),
    /// The destination buffer is smaller than the placement pass needs.
    BufferOverflow { needed: usize, capacity: usize },
    /// The destination buffer does not start on a [`crate::FLAT_ALIGN`] boundary.
    MisalignedBuffer { align: usize },
    /// A counterpart type needs more alignment than flat buffers provide.
    UnsupportedAlignment { align: usize },
    /// Byte counts overflowed.
    SizeOverflow,
    /// Placement used a different number of bytes than sizing measured.
    SizeMismatch { measured: usize, placed: usize },
    /// The placement pass produced no root.
    MissingRoot,
}

impl std::fmt::Display for CloneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Segment(e) => write!(f, "source segment: {}", e),
            Self::BufferOverflow { needed, capacity } => write!(
                f,
                "clone buffer overflow: need {} bytes, have {}",
                needed, capacity
            ),
            Self::MisalignedBuffer { align } => {
                write!(f, "clone buffer must be {}-byte aligned", align)
            }
            Self::UnsupportedAlignment { align } => {
                write!(f, "unsupported alignment: {}", align)
            }
            Self::SizeOverflow => write!(f, "clone size overflow"),
            Self::SizeMismatch { measured, placed } => write!(
                f,
                "sizing pass measured {} bytes but placement used {}",
                measured, placed
            ),
            Self::MissingRoot => write!(f, "placement produced no root"),
        }
    }
}

impl std::error::Error for CloneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Segment(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SegmentError> for CloneError {
    fn from(e: SegmentError) -> Self {
        Self::Segment(e)
    }
}
