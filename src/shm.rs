//! Anonymous shared memory for wl_shm pools
//!
//! A region is an anonymous `memfd` sized to exactly the requested byte
//! count. The descriptor is owned from the moment the kernel hands it out,
//! so every early return closes it. Mappings are scoped guards: dropping a
//! [`PixelMapping`] unmaps it on every exit path.

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};

use log::{debug, trace};
use memmap2::MmapMut;

use crate::error::{ClientError, Result};

const SHM_NAME: &[u8] = b"wlstart-shm\0";

/// A memory-backed file the compositor can map through the transport
#[derive(Debug)]
pub struct ShmRegion {
    file: File,
    size: usize,
}

impl ShmRegion {
    /// Creates an anonymous memory file of exactly `size` bytes
    pub fn allocate(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(ClientError::resource(
                "allocation",
                io::Error::new(io::ErrorKind::InvalidInput, "size must be positive"),
            ));
        }

        // SAFETY: SHM_NAME is NUL-terminated and outlives the call.
        let raw = unsafe { libc::memfd_create(SHM_NAME.as_ptr().cast(), libc::MFD_CLOEXEC) };
        if raw < 0 {
            return Err(ClientError::resource("memfd_create", io::Error::last_os_error()));
        }

        // SAFETY: `raw` is a fresh descriptor nobody else owns.
        let file = File::from(unsafe { OwnedFd::from_raw_fd(raw) });
        file.set_len(size as u64)
            .map_err(|e| ClientError::resource("ftruncate", e))?;

        debug!("🧠 Allocated {} byte shared memory region (fd {})", size, raw);
        Ok(Self { file, size })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Maps the whole region read/write into this process
    pub fn map(&self) -> Result<PixelMapping> {
        // SAFETY: the memfd is private to this process until it is handed
        // to the compositor, and nothing truncates it while mapped.
        let map = unsafe { MmapMut::map_mut(&self.file) }
            .map_err(|e| ClientError::resource("mmap", e))?;
        trace!("Mapped {} bytes", map.len());
        Ok(PixelMapping { map })
    }
}

impl AsFd for ShmRegion {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Read/write view of a [`ShmRegion`], unmapped on drop
#[derive(Debug)]
pub struct PixelMapping {
    map: MmapMut,
}

impl PixelMapping {
    pub fn bytes(&self) -> &[u8] {
        &self.map
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Drop for PixelMapping {
    fn drop(&mut self) {
        trace!("Unmapping {} bytes", self.map.len());
    }
}

/// Allocates a region and maps it in one step
pub fn allocate(size: usize) -> Result<(ShmRegion, PixelMapping)> {
    let region = ShmRegion::allocate(size)?;
    let mapping = region.map()?;
    Ok((region, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_exact_size() {
        let (region, mapping) = allocate(4096 + 17).unwrap();
        assert_eq!(region.size(), 4113);
        assert_eq!(mapping.len(), 4113);
        assert_eq!(region.file.metadata().unwrap().len(), 4113);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let err = ShmRegion::allocate(0).unwrap_err();
        assert!(matches!(err, ClientError::Resource { operation: "allocation", .. }));
    }

    #[test]
    fn test_writes_are_visible_through_second_mapping() {
        let region = ShmRegion::allocate(64).unwrap();
        {
            let mut first = region.map().unwrap();
            first.bytes_mut()[10] = 0xAB;
        }
        let second = region.map().unwrap();
        assert_eq!(second.bytes()[10], 0xAB);
        assert_eq!(second.bytes()[11], 0);
    }
}
