use core::fmt;

/// Errors from reserving storage in a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Neither a free list, the bump cursor nor a larger block could satisfy
    /// the request.
    Exhausted { requested: usize, free: usize },
    /// Request is larger than the largest size class.
    TooLarge { requested: usize, max: usize },
    /// Element alignment exceeds what heap blocks guarantee.
    UnsupportedAlignment { align: usize },
    /// Element count times element size overflowed.
    CapacityOverflow,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { requested, free } => write!(
                f,
                "segment exhausted: need {} bytes, {} bytes free",
                requested, free
            ),
            Self::TooLarge { requested, max } => {
                write!(f, "allocation too large: {} bytes, max {}", requested, max)
            }
            Self::UnsupportedAlignment { align } => {
                write!(f, "unsupported alignment: {}", align)
            }
            Self::CapacityOverflow => write!(f, "capacity overflow"),
        }
    }
}

impl core::error::Error for AllocError {}

/// Errors from formatting, attaching to, or reading a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentError {
    /// Invalid magic bytes.
    InvalidMagic,
    /// Incompatible layout version.
    IncompatibleVersion { expected: u32, found: u32 },
    /// Region too small to hold the segment header and directory.
    SegmentTooSmall { required: usize, found: usize },
    /// Region too large for 32-bit block indices.
    SegmentTooLarge { max: usize, found: usize },
    /// Header fields disagree with the region.
    InvalidConfig(&'static str),
    /// An offset read from the segment points outside the heap.
    OutOfBounds { offset: u64, len: usize },
    /// An offset read from the segment is not aligned for its type.
    Misaligned { offset: u64, align: usize },
    /// A string stored in the segment is not UTF-8.
    InvalidUtf8,
    /// Directory names are limited in length.
    NameTooLong { len: usize, max: usize },
    /// Directory names must be non-empty.
    EmptyName,
    /// Every directory entry is taken.
    DirectoryFull,
    /// A directory entry with this name already exists.
    AlreadyPublished,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid segment magic bytes"),
            Self::IncompatibleVersion { expected, found } => write!(
                f,
                "incompatible segment version: expected {}.{}, found {}.{}",
                expected >> 16,
                expected & 0xFFFF,
                found >> 16,
                found & 0xFFFF
            ),
            Self::SegmentTooSmall { required, found } => {
                write!(f, "segment too small: need {} bytes, got {}", required, found)
            }
            Self::SegmentTooLarge { max, found } => {
                write!(f, "segment too large: max {} bytes, got {}", max, found)
            }
            Self::InvalidConfig(msg) => write!(f, "invalid segment header: {}", msg),
            Self::OutOfBounds { offset, len } => {
                write!(f, "offset {} (+{} bytes) is outside the heap", offset, len)
            }
            Self::Misaligned { offset, align } => {
                write!(f, "offset {} is not {}-byte aligned", offset, align)
            }
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::NameTooLong { len, max } => {
                write!(f, "name too long: {} bytes, max {}", len, max)
            }
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::DirectoryFull => write!(f, "named object directory is full"),
            Self::AlreadyPublished => write!(f, "name already published"),
        }
    }
}

impl core::error::Error for SegmentError {}
