// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Guarded single-record exchange over a mapped region.
//!
//! The region layout is `[ record_bytes | lock_byte ]`. The lock byte is
//! the entire synchronization state: 0 = unlocked, 1 = locked. Acquisition
//! is a single atomic compare-and-swap, so two peers can never both win the
//! lock and splice their copies.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crate::error::{SlotError, SlotResult};
use crate::shm::MappedRegion;
use crate::types::RecordSize;

/// Lock byte value when no peer holds the slot.
const LOCK_FREE: u8 = 0;

/// Lock byte value while a peer is mid-copy.
const LOCK_HELD: u8 = 1;

/// A fixed-size record slot shared between processes.
///
/// Every process attached to the same backing path is a peer; none is
/// privileged. `try_read` and `try_write` spin on the lock byte for at most
/// the caller's timeout, then copy the whole record inside the critical
/// section. The timeout bounds only the waiting phase - once the lock is
/// held, the copy always runs to completion.
///
/// The record size must agree across all peers of one path. The layout
/// carries no size field, so a disagreement cannot be detected here; it is
/// a caller contract violation.
pub struct SharedSlot {
    /// Underlying platform mapping, sized for the record plus lock byte.
    region: MappedRegion,
    /// Fixed record length in bytes.
    record_len: usize,
}

impl SharedSlot {
    /// Attach to the slot backed by `path`, creating it when absent.
    ///
    /// A freshly created region is zero-filled, so the first `try_read`
    /// observes an all-zero record and an unlocked lock byte.
    pub fn open(path: impl AsRef<Path>, record_size: RecordSize) -> SlotResult<Self> {
        let record_len = record_size.get();
        let region = MappedRegion::open_or_create(path.as_ref(), record_len + 1)?;

        tracing::debug!(
            path = %region.path().display(),
            record_len = record_len,
            "opened shared slot"
        );

        Ok(Self { region, record_len })
    }

    /// Get the fixed record length in bytes.
    pub fn record_size(&self) -> usize {
        self.record_len
    }

    /// Get the path of the backing object.
    pub fn path(&self) -> &Path {
        self.region.path()
    }

    /// Whether the lock byte currently reads as held.
    ///
    /// Only a snapshot - another peer may take or release the lock
    /// immediately after this returns.
    pub fn is_locked(&self) -> bool {
        self.lock().load(Ordering::Acquire) != LOCK_FREE
    }

    /// Copy the current record into `out`, waiting at most `timeout` for
    /// the lock.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` when the lock byte did
    /// not become free within `timeout`. On timeout nothing is copied and
    /// the region is left untouched.
    ///
    /// # Errors
    /// `RecordSizeMismatch` when `out` is not exactly the record length,
    /// `LockCorrupted` when the lock byte holds a value other than 0 or 1.
    pub fn try_read(&self, out: &mut [u8], timeout: Duration) -> SlotResult<bool> {
        if out.len() != self.record_len {
            return Err(SlotError::RecordSizeMismatch {
                expected: self.record_len,
                actual: out.len(),
            });
        }

        if !self.acquire(timeout)? {
            return Ok(false);
        }

        // SAFETY: the region is at least record_len + 1 bytes, out is
        // exactly record_len, and holding the lock excludes peer writers
        unsafe {
            std::ptr::copy_nonoverlapping(self.region.as_ptr(), out.as_mut_ptr(), self.record_len);
        }

        self.lock().store(LOCK_FREE, Ordering::Release);
        Ok(true)
    }

    /// Copy `data` into the record, waiting at most `timeout` for the lock.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` when the lock byte did
    /// not become free within `timeout`. On timeout the region is left
    /// untouched - no partial write is ever visible.
    ///
    /// # Errors
    /// `RecordSizeMismatch` when `data` is not exactly the record length,
    /// `LockCorrupted` when the lock byte holds a value other than 0 or 1.
    pub fn try_write(&self, data: &[u8], timeout: Duration) -> SlotResult<bool> {
        if data.len() != self.record_len {
            return Err(SlotError::RecordSizeMismatch {
                expected: self.record_len,
                actual: data.len(),
            });
        }

        if !self.acquire(timeout)? {
            return Ok(false);
        }

        // SAFETY: the region is at least record_len + 1 bytes, data is
        // exactly record_len, and holding the lock excludes peer readers
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.region.as_ptr(), self.record_len);
        }

        self.lock().store(LOCK_FREE, Ordering::Release);
        Ok(true)
    }

    /// Force the lock byte back to unlocked, regardless of holder.
    ///
    /// Manual recovery for a peer that died while holding the lock. There
    /// is no holder identity, so this cannot tell a crashed holder from a
    /// live one - calling it while a peer is genuinely mid-copy lets a
    /// second peer in.
    pub fn flush(&self) {
        self.lock().store(LOCK_FREE, Ordering::Release);
        tracing::debug!(path = %self.region.path().display(), "flushed slot lock");
    }

    /// View the lock byte at the end of the record as an atomic.
    fn lock(&self) -> &AtomicU8 {
        // SAFETY: the mapped length is at least record_len + 1, u8 atomics
        // need no alignment, and the byte lives in MAP_SHARED memory for
        // the lifetime of self
        unsafe { &*(self.region.as_ptr().add(self.record_len) as *const AtomicU8) }
    }

    /// Spin until the lock byte is won or `timeout` elapses.
    ///
    /// Busy-waits on purpose: the critical section is one bounded memcpy,
    /// so a blocking OS wait would cost more than it saves. The first
    /// attempt happens before any clock check, so a zero timeout still
    /// succeeds against a free lock.
    fn acquire(&self, timeout: Duration) -> SlotResult<bool> {
        let start = Instant::now();
        loop {
            match self.lock().compare_exchange(
                LOCK_FREE,
                LOCK_HELD,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(true),
                Err(observed) => {
                    if observed != LOCK_HELD {
                        return Err(SlotError::LockCorrupted { value: observed });
                    }
                    if start.elapsed() >= timeout {
                        return Ok(false);
                    }
                    std::hint::spin_loop();
                }
            }
        }
    }
}
