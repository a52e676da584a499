//! Custom error types for shmbox.
//!
//! This module defines explicit enum error types as per coding guidelines.
//! No `Box<dyn Error>`, no `anyhow::Result` - all errors are strongly typed.
//!
//! Timeouts are deliberately NOT an error: `try_read`/`try_write` report an
//! expired wait as `Ok(false)` so callers can retry with a fresh bound.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by shared slot construction and guarded exchange.
/// All errors are explicit variants - no catch-all or generic handling.
#[derive(Debug, Error)]
pub enum SlotError {
    // =========================================================================
    // Construction Errors - Fatal for the Attempt, No Internal Retry
    // =========================================================================
    #[error("failed to open backing object {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("failed to map backing object into memory: {reason}")]
    MapFailed { reason: String },

    // =========================================================================
    // Contract Errors - Caller-Supplied Values Out of Bounds
    // =========================================================================
    #[error("record size out of bounds: {size} bytes (min: {min}, max: {max})")]
    RecordSizeOutOfBounds {
        size: usize,
        min: usize,
        max: usize,
    },

    #[error("buffer length {actual} does not match record size {expected}")]
    RecordSizeMismatch { expected: usize, actual: usize },

    // =========================================================================
    // Shared State Errors - No Fallback, Surface Immediately
    // =========================================================================
    #[error("lock byte holds impossible value {value:#04x} (expected 0 or 1)")]
    LockCorrupted { value: u8 },
}

/// Result type alias using SlotError.
pub type SlotResult<T> = Result<T, SlotError>;
