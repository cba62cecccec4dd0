//! Segments backed by a named, memory-mapped file.
//!
//! The producer creates the file, formats a segment in it and removes the
//! name when it goes away. Consumers open the same name and attach; each
//! process maps the file at whatever address its kernel picks.

use std::fs::{File, OpenOptions};
use std::io;
use std::ops::Deref;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::string::{String, ToString};

use crate::error::SegmentError;
use crate::region::Region;
use crate::segment::{MAX_NAME_LEN, SEGMENT_OVERHEAD, Segment};

/// A shared file mapping.
struct ShmMapping {
    /// Base address of the mapping.
    base_addr: *mut u8,
    /// Size of the mapping.
    size: usize,
    /// The underlying file (kept open).
    _file: File,
}

// SAFETY: the mapped memory is only mutated through the segment's atomics.
unsafe impl Send for ShmMapping {}
unsafe impl Sync for ShmMapping {}

impl ShmMapping {
    fn map(file: File, size: usize) -> io::Result<Self> {
        // SAFETY: fd is open read/write and at least `size` bytes long.
        let base_addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };

        if base_addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            base_addr: base_addr as *mut u8,
            size,
            _file: file,
        })
    }

    fn region(&self) -> Region {
        // SAFETY: page-aligned mapping that lives as long as `self`.
        unsafe { Region::from_raw(self.base_addr, self.size) }
    }
}

impl Drop for ShmMapping {
    fn drop(&mut self) {
        // SAFETY: base_addr and size were valid when created.
        unsafe {
            libc::munmap(self.base_addr as *mut libc::c_void, self.size);
        }
    }
}

/// A segment living in a named shared file.
pub struct NamedSegment {
    segment: Segment,
    _mapping: ShmMapping,
    path: PathBuf,
    owner: bool,
}

impl NamedSegment {
    /// Create (or replace) `dir/name`, size it and format a fresh segment.
    ///
    /// The file is removed again when the returned value is dropped.
    pub fn create(dir: &Path, name: &str, size: usize) -> Result<Self, NamedSegmentError> {
        let path = segment_path(dir, name)?;
        if size < SEGMENT_OVERHEAD {
            return Err(NamedSegmentError::Segment(SegmentError::SegmentTooSmall {
                required: SEGMENT_OVERHEAD,
                found: size,
            }));
        }

        if path.exists() {
            tracing::warn!(path = %path.display(), "replacing stale segment file");
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(NamedSegmentError::Io)?;
        file.set_len(size as u64).map_err(NamedSegmentError::Io)?;

        let mapping = ShmMapping::map(file, size).map_err(NamedSegmentError::Io)?;
        // SAFETY: we just created and mapped the file; nobody else has it yet.
        let segment = match unsafe { Segment::init(mapping.region()) } {
            Ok(segment) => segment,
            Err(e) => {
                let _ = std::fs::remove_file(&path);
                return Err(NamedSegmentError::Segment(e));
            }
        };

        tracing::debug!(path = %path.display(), size, "created named segment");

        Ok(Self {
            segment,
            _mapping: mapping,
            path,
            owner: true,
        })
    }

    /// Map an existing segment created by another process.
    pub fn open(dir: &Path, name: &str) -> Result<Self, NamedSegmentError> {
        let path = segment_path(dir, name)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(NamedSegmentError::Io)?;
        let size = file.metadata().map_err(NamedSegmentError::Io)?.len() as usize;
        if size < SEGMENT_OVERHEAD {
            return Err(NamedSegmentError::Segment(SegmentError::SegmentTooSmall {
                required: SEGMENT_OVERHEAD,
                found: size,
            }));
        }

        let mapping = ShmMapping::map(file, size).map_err(NamedSegmentError::Io)?;
        // SAFETY: the mapping outlives the segment (both owned by Self).
        let segment =
            unsafe { Segment::attach(mapping.region()) }.map_err(NamedSegmentError::Segment)?;

        tracing::debug!(path = %path.display(), size, "opened named segment");

        Ok(Self {
            segment,
            _mapping: mapping,
            path,
            owner: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether dropping this value removes the name.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}

impl Deref for NamedSegment {
    type Target = Segment;

    fn deref(&self) -> &Segment {
        &self.segment
    }
}

impl Drop for NamedSegment {
    fn drop(&mut self) {
        if self.owner
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove segment file");
        }
    }
}

fn segment_path(dir: &Path, name: &str) -> Result<PathBuf, NamedSegmentError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        && !name.starts_with('.');
    if !valid {
        return Err(NamedSegmentError::InvalidName(name.to_string()));
    }
    Ok(dir.join(name))
}

/// Errors from creating or opening a named segment.
#[derive(Debug)]
pub enum NamedSegmentError {
    /// I/O error.
    Io(io::Error),
    /// Name is empty, too long or contains path characters.
    InvalidName(String),
    /// The mapped file does not hold a usable segment.
    Segment(SegmentError),
}

impl std::fmt::Display for NamedSegmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::InvalidName(name) => write!(f, "invalid segment name: {:?}", name),
            Self::Segment(e) => write!(f, "segment error: {}", e),
        }
    }
}

impl std::error::Error for NamedSegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Segment(e) => Some(e),
            Self::InvalidName(_) => None,
        }
    }
}
