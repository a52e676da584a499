//! MappedRegion - unix backing via a memory-mapped regular file.
//!
//! The backing object is an ordinary file addressed by filesystem path, so
//! any process that can open the path can attach to the same physical pages.
//! All unsafe operations are encapsulated with bounds known at map time.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::error::{SlotError, SlotResult};

/// A shared mapping over a file-backed region.
///
/// This struct owns the mapping and file descriptor and releases both on
/// drop. The backing file itself is never removed: it outlives every
/// attached process and acts as the rendezvous point for peers.
pub struct MappedRegion {
    /// Path of the backing file.
    path: PathBuf,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Length of the mapping in bytes (page-rounded).
    len: usize,
    /// File descriptor kept open for the mapping's lifetime.
    fd: RawFd,
}

// SAFETY: MappedRegion can be sent between threads; the fd is an integer
// handle and the pointer refers to OS-managed shared pages.
unsafe impl Send for MappedRegion {}

// SAFETY: concurrent access to the mapped bytes is coordinated by the lock
// byte in SharedSlot; the region itself holds no thread-local state.
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// Attach to the backing file at `path`, creating it when absent.
    ///
    /// A fresh file is sized with `ftruncate`, which zero-fills the new
    /// bytes, so a region observed for the first time reads all zeroes
    /// with the lock byte unlocked. The mapped length is `size` rounded
    /// up to the page size.
    ///
    /// # Errors
    /// Returns `OpenFailed` when the file can neither be opened nor
    /// created, `MapFailed` when the mapping itself fails. Both are fatal
    /// for this attempt; any descriptor acquired on the way is closed
    /// before returning.
    pub fn open_or_create(path: &Path, size: usize) -> SlotResult<Self> {
        let len = map_length(size);

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| {
            SlotError::OpenFailed {
                path: path.to_path_buf(),
                reason: format!("invalid path: {}", e),
            }
        })?;

        // Attach to an existing backing file first; create only when the
        // open reports it absent.
        // SAFETY: c_path is a valid CString, flags are valid open flags
        let mut fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            fd = unsafe {
                libc::open(
                    c_path.as_ptr(),
                    libc::O_RDWR | libc::O_CREAT,
                    0o660 as libc::c_uint,
                )
            };
            if fd < 0 {
                return Err(SlotError::OpenFailed {
                    path: path.to_path_buf(),
                    reason: format!("open failed: {}", std::io::Error::last_os_error()),
                });
            }
        }

        // Size the file; idempotent when a peer already sized it, zero-fills
        // when this process is the creator.
        let len_off = libc::off_t::try_from(len).unwrap_or(libc::off_t::MAX);
        // SAFETY: fd is a valid file descriptor
        if unsafe { libc::ftruncate(fd, len_off) } < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(SlotError::OpenFailed {
                path: path.to_path_buf(),
                reason: format!("ftruncate failed: {}", err),
            });
        }

        // SAFETY: fd is valid, len is page-rounded and matches the file size
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(SlotError::MapFailed {
                reason: format!("mmap failed: {}", err),
            });
        }

        let ptr = NonNull::new(ptr as *mut u8).expect("mmap returned null but not MAP_FAILED");

        tracing::debug!(path = %path.display(), len = len, "mapped shared region");

        Ok(Self {
            path: path.to_path_buf(),
            ptr,
            len,
            fd,
        })
    }

    /// Get the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the mapped length in bytes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Get a raw pointer to the mapped memory.
    ///
    /// # Safety
    /// Caller must ensure proper synchronization when accessing the memory.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Get a slice view of the mapped memory.
    ///
    /// # Safety
    /// Caller must ensure no concurrent writes to the accessed region.
    pub unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }

    /// Get a mutable slice view of the mapped memory.
    ///
    /// # Safety
    /// Caller must ensure exclusive access to the accessed region.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and len were set by mmap during construction
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
        if result < 0 {
            tracing::error!(
                path = %self.path.display(),
                error = %std::io::Error::last_os_error(),
                "failed to unmap shared region"
            );
        }

        // SAFETY: fd was opened during construction
        unsafe { libc::close(self.fd) };

        // The backing file is intentionally NOT removed. Peers may still be
        // attached, and the record must survive until every process is gone
        // and an operator deletes the file.
    }
}

/// Round the requested size up to the platform allocation granularity.
fn map_length(size: usize) -> usize {
    // SAFETY: sysconf with a valid name has no preconditions
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let page = if page > 0 { page as usize } else { 4096 };
    size.div_ceil(page) * page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_length_rounds_to_page() {
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        assert_eq!(map_length(1), page);
        assert_eq!(map_length(page), page);
        assert_eq!(map_length(page + 1), 2 * page);
    }

    #[test]
    fn test_open_or_create_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("region.shm");

        let mut region = MappedRegion::open_or_create(&path, 64).expect("create region");
        assert!(region.size() >= 65);

        // Fresh region is zero-filled
        // SAFETY: no other mapping of this file exists yet
        let data = unsafe { region.as_slice() };
        assert!(data.iter().all(|&b| b == 0));

        // SAFETY: single mapping, exclusive access
        let data = unsafe { region.as_mut_slice() };
        data[0] = 0x42;
        data[64] = 0x01;

        drop(region);

        // Reopening observes the persisted bytes
        let region = MappedRegion::open_or_create(&path, 64).expect("reopen region");
        // SAFETY: single mapping again
        let data = unsafe { region.as_slice() };
        assert_eq!(data[0], 0x42);
        assert_eq!(data[64], 0x01);
    }

    #[test]
    fn test_open_or_create_missing_parent() {
        let result = MappedRegion::open_or_create(Path::new("/nonexistent-dir/region.shm"), 64);
        assert!(matches!(result, Err(SlotError::OpenFailed { .. })));
    }
}
