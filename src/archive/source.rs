//! Random-access byte source behind an open archive.
//! Supports both memory-mapped and buffered stream modes.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use parking_lot::Mutex;

use crate::util::{Error, Result};

/// Any seekable reader the archive can own.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Bytes of an archive, read by absolute offset.
pub struct BlockSource {
    inner: SourceInner,
    size: u64,
}

enum SourceInner {
    /// Memory-mapped file (preferred for large files)
    #[cfg(feature = "mmap")]
    Mmap(Mmap),
    /// Seekable stream; reads are serialized by the lock
    Stream(Mutex<Box<dyn ReadSeek>>),
}

impl BlockSource {
    /// Open a file, mapping it when `use_mmap` is set and the feature is on.
    pub fn open(path: &Path, use_mmap: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();

        #[cfg(feature = "mmap")]
        if use_mmap && size > 0 {
            // Safety: the map is read-only and private to this source.
            let mmap = unsafe { Mmap::map(&file) }?;
            return Ok(Self { inner: SourceInner::Mmap(mmap), size });
        }
        #[cfg(not(feature = "mmap"))]
        let _ = use_mmap;

        let reader = std::io::BufReader::new(file);
        Ok(Self {
            inner: SourceInner::Stream(Mutex::new(Box::new(reader))),
            size,
        })
    }

    /// Wrap an arbitrary seekable reader; its size is found by seeking to the end.
    pub fn from_reader<R: Read + Seek + Send + 'static>(mut reader: R) -> Result<Self> {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: SourceInner::Stream(Mutex::new(Box::new(reader))),
            size,
        })
    }

    /// Total size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        match &self.inner {
            #[cfg(feature = "mmap")]
            SourceInner::Mmap(_) => true,
            SourceInner::Stream(_) => false,
        }
    }

    /// Read `len` bytes at `pos`. Ranges past the end fail before any I/O.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let end = pos
            .checked_add(len as u64)
            .ok_or(Error::UnexpectedEof(u64::MAX))?;
        if end > self.size {
            return Err(Error::UnexpectedEof(end));
        }
        tracing::trace!(pos, len, "read block");

        match &self.inner {
            #[cfg(feature = "mmap")]
            SourceInner::Mmap(mmap) => Ok(mmap[pos as usize..end as usize].to_vec()),
            SourceInner::Stream(stream) => {
                let mut s = stream.lock();
                s.seek(SeekFrom::Start(pos))?;
                let mut buf = vec![0u8; len];
                s.read_exact(&mut buf)?;
                Ok(buf)
            }
        }
    }

    /// Read the byte range `[start, end)`.
    pub fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        if end < start {
            return Err(Error::invalid(format!("block ends at {end} before it starts at {start}")));
        }
        let len = usize::try_from(end - start)
            .map_err(|_| Error::invalid(format!("block of {} bytes", end - start)))?;
        self.read_bytes(start, len)
    }
}

impl std::fmt::Debug for BlockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSource")
            .field("size", &self.size)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
