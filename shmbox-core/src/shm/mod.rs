// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared memory channel module.
//!
//! Cross-process record exchange over a memory-mapped backing file. The
//! platform modules provide the mapping capability; the slot layered on
//! top is platform-independent.

#[cfg(unix)]
mod platform_unix;
#[cfg(windows)]
mod platform_windows;

mod slot;

#[cfg(unix)]
pub use platform_unix::MappedRegion;
#[cfg(windows)]
pub use platform_windows::MappedRegion;

pub use slot::SharedSlot;
