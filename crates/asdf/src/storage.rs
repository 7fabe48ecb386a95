//! Byte-level access to a container file.
//!
//! Writable containers go through a plain file handle with positioned
//! reads and writes (`pread`/`pwrite` on unix, so handles keep no shared
//! cursor). Read-only containers are memory-mapped when the `mmap`
//! feature is on and [`FileAccessProps::memory_map`] allows it, and read
//! into a buffer otherwise.

use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io;
#[cfg(not(unix))]
use std::io::{Read, Seek, SeekFrom, Write};
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;

use asdf_format::superblock::HDF5_SIGNATURE;
use asdf_format::{FileAccessProps, FormatError, Superblock, OFFSET_SIZE};

use crate::error::{Error, Result};

pub(crate) enum Storage {
    Writable {
        file: fs::File,
        /// End of allocated space; new blocks are placed here.
        eoa: Cell<u64>,
    },
    #[cfg(feature = "mmap")]
    Mapped { _file: fs::File, map: Mmap },
    Buffered(Vec<u8>),
}

#[cfg(unix)]
fn read_exact_at(file: &fs::File, buf: &mut [u8], addr: u64) -> io::Result<()> {
    file.read_exact_at(buf, addr)
}

#[cfg(not(unix))]
fn read_exact_at(mut file: &fs::File, buf: &mut [u8], addr: u64) -> io::Result<()> {
    file.seek(SeekFrom::Start(addr))?;
    file.read_exact(buf)
}

#[cfg(unix)]
fn write_all_at(file: &fs::File, data: &[u8], addr: u64) -> io::Result<()> {
    file.write_all_at(data, addr)
}

#[cfg(not(unix))]
fn write_all_at(mut file: &fs::File, data: &[u8], addr: u64) -> io::Result<()> {
    file.seek(SeekFrom::Start(addr))?;
    file.write_all(data)
}

fn eof(addr: u64, len: usize) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {len} bytes at {addr:#x} runs past end of file"),
    ))
}

impl Storage {
    /// Create or truncate a file; space up to the superblock is reserved.
    pub(crate) fn create(path: &Path) -> Result<Storage> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let reserved = Superblock::encoded_size(OFFSET_SIZE) as u64;
        file.set_len(reserved)?;
        Ok(Storage::Writable {
            file,
            eoa: Cell::new(reserved),
        })
    }

    /// Open an existing file for reading and writing. The end of allocation
    /// is set once the superblock has been read.
    pub(crate) fn open_read_write(path: &Path) -> Result<Storage> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Storage::Writable {
            file,
            eoa: Cell::new(len),
        })
    }

    pub(crate) fn open_read_only(path: &Path, props: &FileAccessProps) -> Result<Storage> {
        if props.memory_map {
            if let Some(mapped) = Self::map(path)? {
                return Ok(mapped);
            }
        }
        Ok(Storage::Buffered(fs::read(path)?))
    }

    #[cfg(feature = "mmap")]
    fn map(path: &Path) -> Result<Option<Storage>> {
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(None);
        }
        // SAFETY: the mapping is read-only. Participants that write the
        // same file only do so before the collective open.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Some(Storage::Mapped { _file: file, map }))
    }

    #[cfg(not(feature = "mmap"))]
    fn map(_path: &Path) -> Result<Option<Storage>> {
        Ok(None)
    }

    pub(crate) fn is_writable(&self) -> bool {
        matches!(self, Storage::Writable { .. })
    }

    fn bytes(&self) -> Option<&[u8]> {
        match self {
            Storage::Writable { .. } => None,
            #[cfg(feature = "mmap")]
            Storage::Mapped { map, .. } => Some(&map[..]),
            Storage::Buffered(v) => Some(v.as_slice()),
        }
    }

    pub(crate) fn len(&self) -> Result<u64> {
        match self {
            Storage::Writable { file, .. } => Ok(file.metadata()?.len()),
            _ => Ok(self.bytes().map_or(0, |b| b.len() as u64)),
        }
    }

    pub(crate) fn read_at(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        match self {
            Storage::Writable { file, .. } => {
                read_exact_at(file, buf, addr)?;
                Ok(())
            }
            _ => {
                let bytes = self.bytes().unwrap_or(&[]);
                let start = usize::try_from(addr).map_err(|_| eof(addr, buf.len()))?;
                let src = start
                    .checked_add(buf.len())
                    .and_then(|end| bytes.get(start..end))
                    .ok_or_else(|| eof(addr, buf.len()))?;
                buf.copy_from_slice(src);
                Ok(())
            }
        }
    }

    /// Read up to `max` bytes at `addr`, fewer if the file ends first.
    pub(crate) fn read_upto(&self, addr: u64, max: usize) -> Result<Vec<u8>> {
        let len = self.len()?;
        let available = len.saturating_sub(addr).min(max as u64) as usize;
        let mut buf = vec![0u8; available];
        self.read_at(addr, &mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write_at(&self, addr: u64, data: &[u8]) -> Result<()> {
        match self {
            Storage::Writable { file, .. } => {
                write_all_at(file, data, addr)?;
                Ok(())
            }
            _ => Err(Error::ReadOnly),
        }
    }

    pub(crate) fn end_of_allocation(&self) -> u64 {
        match self {
            Storage::Writable { eoa, .. } => eoa.get(),
            _ => self.bytes().map_or(0, |b| b.len() as u64),
        }
    }

    pub(crate) fn set_end_of_allocation(&self, value: u64) {
        if let Storage::Writable { eoa, .. } = self {
            eoa.set(value);
        }
    }

    /// Reserve `size` bytes and extend the file over them, so the block
    /// reads back as zeros until written.
    pub(crate) fn allocate(&self, size: u64, props: &FileAccessProps) -> Result<u64> {
        Ok(self.allocate_many(size, 1, props)?[0])
    }

    /// Reserve `count` blocks of `size` bytes, each placed per `props`.
    ///
    /// Every placement is computed before the file grows, so on failure
    /// nothing is reserved.
    pub(crate) fn allocate_many(&self, size: u64, count: usize, props: &FileAccessProps) -> Result<Vec<u64>> {
        let (file, eoa) = match self {
            Storage::Writable { file, eoa } => (file, eoa),
            _ => return Err(Error::ReadOnly),
        };
        let too_large = || {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot allocate {count} x {size} bytes past {:#x}", eoa.get()),
            ))
        };
        let mut addrs = Vec::with_capacity(count);
        let mut end = eoa.get();
        for _ in 0..count {
            let addr = props.place(end, size).ok_or_else(too_large)?;
            end = addr.checked_add(size).ok_or_else(too_large)?;
            addrs.push(addr);
        }
        if end > file.metadata()?.len() {
            file.set_len(end)?;
        }
        eoa.set(end);
        Ok(addrs)
    }

    /// Offset of the format signature: 0 or a power of two from 512.
    pub(crate) fn signature_offset(&self) -> Result<u64> {
        let len = self.len()?;
        let mut offset = 0u64;
        while offset.saturating_add(8) <= len {
            let mut sig = [0u8; 8];
            self.read_at(offset, &mut sig)?;
            if sig == HDF5_SIGNATURE {
                return Ok(offset);
            }
            offset = if offset == 0 { 512 } else { offset.saturating_mul(2) };
        }
        Err(FormatError::SignatureNotFound.into())
    }

    pub(crate) fn sync(&self) -> Result<()> {
        if let Storage::Writable { file, .. } = self {
            file.sync_all()?;
        }
        Ok(())
    }
}
