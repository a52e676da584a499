//! MappedRegion - windows backing via a file-backed mapping object.
//!
//! Win32 specifics:
//! - `CreateFileW` with `OPEN_EXISTING`, falling back to `CREATE_NEW`
//! - anonymous `CreateFileMappingW` over the file handle (no global name)
//! - the file handle is closed once the mapping holds its own reference
//!
//! The mapping object rounds the requested length to the allocation
//! granularity internally, so no explicit page rounding happens here.

use std::os::windows::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use winapi::ctypes::c_void;
use winapi::shared::minwindef::DWORD;
use winapi::um::fileapi::{CreateFileW, CREATE_NEW, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::memoryapi::{
    CreateFileMappingW, MapViewOfFile, UnmapViewOfFile, FILE_MAP_ALL_ACCESS,
};
use winapi::um::winnt::{
    FILE_ATTRIBUTE_NORMAL, FILE_SHARE_READ, FILE_SHARE_WRITE, GENERIC_READ, GENERIC_WRITE, HANDLE,
    PAGE_READWRITE,
};

use crate::error::{SlotError, SlotResult};

/// A shared mapping over a file-backed region.
///
/// This struct owns the view and the mapping handle and releases both on
/// drop. The backing file itself is never removed: it outlives every
/// attached process and acts as the rendezvous point for peers.
pub struct MappedRegion {
    /// Path of the backing file.
    path: PathBuf,
    /// Pointer to the mapped view.
    ptr: NonNull<u8>,
    /// Length of the mapped view in bytes.
    len: usize,
    /// Handle of the file mapping object.
    mapping: HANDLE,
}

// SAFETY: MappedRegion can be sent between threads; the mapping handle is
// process-wide and the pointer refers to OS-managed shared pages.
unsafe impl Send for MappedRegion {}

// SAFETY: concurrent access to the mapped bytes is coordinated by the lock
// byte in SharedSlot; the region itself holds no thread-local state.
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// Attach to the backing file at `path`, creating it when absent.
    ///
    /// `CreateFileMappingW` extends a freshly created file to `size` and
    /// zero-fills it, so a region observed for the first time reads all
    /// zeroes with the lock byte unlocked.
    ///
    /// # Errors
    /// Returns `OpenFailed` when the file can neither be opened nor
    /// created, `MapFailed` when creating or mapping the view fails. Both
    /// are fatal for this attempt; any handle acquired on the way is
    /// closed before returning.
    pub fn open_or_create(path: &Path, size: usize) -> SlotResult<Self> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // Attach to an existing backing file first; create only when the
        // open reports it absent.
        // SAFETY: wide is a NUL-terminated UTF-16 path, flags are valid
        let mut file = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                std::ptr::null_mut(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                std::ptr::null_mut(),
            )
        };
        if file == INVALID_HANDLE_VALUE {
            file = unsafe {
                CreateFileW(
                    wide.as_ptr(),
                    GENERIC_READ | GENERIC_WRITE,
                    FILE_SHARE_READ | FILE_SHARE_WRITE,
                    std::ptr::null_mut(),
                    CREATE_NEW,
                    FILE_ATTRIBUTE_NORMAL,
                    std::ptr::null_mut(),
                )
            };
            if file == INVALID_HANDLE_VALUE {
                return Err(SlotError::OpenFailed {
                    path: path.to_path_buf(),
                    reason: format!("CreateFileW failed: {}", std::io::Error::last_os_error()),
                });
            }
        }

        // SAFETY: file is a valid handle, size fits in the low DWORD
        let mapping = unsafe {
            CreateFileMappingW(
                file,
                std::ptr::null_mut(),
                PAGE_READWRITE,
                0,
                size as DWORD,
                std::ptr::null(),
            )
        };
        if mapping.is_null() {
            let err = std::io::Error::last_os_error();
            unsafe { CloseHandle(file) };
            return Err(SlotError::OpenFailed {
                path: path.to_path_buf(),
                reason: format!("CreateFileMappingW failed: {}", err),
            });
        }

        // SAFETY: mapping is a valid handle, size matches the mapping length
        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_ALL_ACCESS, 0, 0, size) };
        if view.is_null() {
            let err = std::io::Error::last_os_error();
            unsafe {
                CloseHandle(mapping);
                CloseHandle(file);
            }
            return Err(SlotError::MapFailed {
                reason: format!("MapViewOfFile failed: {}", err),
            });
        }

        // The mapping object keeps its own reference to the file.
        // SAFETY: file is a valid handle owned by this function
        unsafe { CloseHandle(file) };

        let ptr = NonNull::new(view as *mut u8).expect("MapViewOfFile returned null view");

        tracing::debug!(path = %path.display(), len = size, "mapped shared region");

        Ok(Self {
            path: path.to_path_buf(),
            ptr,
            len: size,
            mapping,
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
        // SAFETY: ptr was returned by MapViewOfFile, mapping by
        // CreateFileMappingW; both are released exactly once here
        unsafe {
            if UnmapViewOfFile(self.ptr.as_ptr() as *const c_void) == 0 {
                tracing::error!(
                    path = %self.path.display(),
                    error = %std::io::Error::last_os_error(),
                    "failed to unmap shared region"
                );
            }
            CloseHandle(self.mapping);
        }

        // The backing file is intentionally NOT removed. Peers may still be
        // attached, and the record must survive until every process is gone
        // and an operator deletes the file.
    }
}
