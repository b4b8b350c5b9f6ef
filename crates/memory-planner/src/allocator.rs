// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A heap-backed [`Allocator`] implementation.
//!
//! Backends with real device memory install their own allocator on the
//! registry; everything else, including every test in this workspace,
//! uses [`SystemAllocator`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use backend_registry::{AllocationHandle, Allocator, AllocatorError, MemoryRegion};
use parking_lot::Mutex;

const DEFAULT_ALIGNMENT: usize = 64;

/// Allocates plain heap buffers and tracks them by handle.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    buffers: Mutex<HashMap<u64, Vec<u8>>>,
    next_handle: AtomicU64,
}

impl SystemAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live allocations, for tests and diagnostics.
    pub fn live_allocations(&self) -> usize {
        self.buffers.lock().len()
    }
}

impl Allocator for SystemAllocator {
    fn alignment(&self) -> usize {
        DEFAULT_ALIGNMENT
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<AllocationHandle, AllocatorError> {
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(AllocatorError(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.buffers.lock().insert(id, vec![0u8; size]);
        Ok(AllocationHandle(id))
    }

    fn free(&self, handle: AllocationHandle) -> Result<(), AllocatorError> {
        match self.buffers.lock().remove(&handle.0) {
            Some(_) => Ok(()),
            None => Err(AllocatorError(format!(
                "handle {} is not a live allocation",
                handle.0
            ))),
        }
    }

    fn region_at_offset(
        &self,
        handle: AllocationHandle,
        offset: usize,
    ) -> Result<MemoryRegion, AllocatorError> {
        let buffers = self.buffers.lock();
        let buffer = buffers.get(&handle.0).ok_or_else(|| {
            AllocatorError(format!("handle {} is not a live allocation", handle.0))
        })?;
        if offset > buffer.len() {
            return Err(AllocatorError(format!(
                "offset {offset} is outside the {} byte allocation",
                buffer.len()
            )));
        }
        Ok(MemoryRegion { handle, offset })
    }
}

// ── Tests ───────────────────────────────────────────────────────────
