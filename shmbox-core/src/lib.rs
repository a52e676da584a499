//! Shmbox Core Library
//!
//! Cross-process single-record exchange over memory-mapped files. A slot is
//! a named rendezvous point: every process that opens the same path maps
//! the same bytes, and a one-byte atomic lock guards the record copy.

pub mod error;
pub mod shm;
pub mod types;

// Re-export commonly used types
pub use error::{SlotError, SlotResult};
pub use shm::{MappedRegion, SharedSlot};
pub use types::RecordSize;
