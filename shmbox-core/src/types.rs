// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use crate::error::SlotError;

/// Minimum allowed record size: 1 byte
const MIN_RECORD_SIZE: usize = 1;
/// Maximum allowed record size: 16 MB
const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// Validated record size in bytes.
///
/// Fixed at slot construction time and must agree across every process
/// attached to the same backing object. Disagreement is a caller contract
/// violation the slot cannot detect - the region layout carries no size
/// field to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordSize(usize);

impl RecordSize {
    /// Create a new RecordSize with bounds validation.
    pub fn new(bytes: usize) -> Result<Self, SlotError> {
        if !(MIN_RECORD_SIZE..=MAX_RECORD_SIZE).contains(&bytes) {
            return Err(SlotError::RecordSizeOutOfBounds {
                size: bytes,
                min: MIN_RECORD_SIZE,
                max: MAX_RECORD_SIZE,
            });
        }
        Ok(Self(bytes))
    }

    /// Create from the size of a fixed-layout type for convenience.
    pub fn of<T>() -> Result<Self, SlotError> {
        Self::new(std::mem::size_of::<T>())
    }

    /// Get the record size in bytes.
    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

impl TryFrom<usize> for RecordSize {
    type Error = SlotError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordSize> for usize {
    fn from(size: RecordSize) -> Self {
        size.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size_valid() {
        assert!(RecordSize::new(1).is_ok());
        assert!(RecordSize::new(4096).is_ok());
        assert!(RecordSize::new(MAX_RECORD_SIZE).is_ok());
    }

    #[test]
    fn test_record_size_invalid() {
        assert!(RecordSize::new(0).is_err());
        assert!(RecordSize::new(MAX_RECORD_SIZE + 1).is_err());
    }

    #[test]
    fn test_record_size_of_type() {
        let size = RecordSize::of::<[u8; 128]>().unwrap();
        assert_eq!(size.get(), 128);

        let size = RecordSize::of::<u64>().unwrap();
        assert_eq!(size.get(), 8);
    }

    #[test]
    fn test_record_size_of_zero_sized_type() {
        assert!(RecordSize::of::<()>().is_err());
    }
}
