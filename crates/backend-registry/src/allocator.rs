// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The allocator collaborator interface.
//!
//! Backends without native tensor storage hand the memory planner an
//! implementation of [`Allocator`]. The planner requests one region per
//! packed buffer and resolves every tensor inside it as base plus
//! offset; it never inspects the memory itself, so handles and regions
//! are opaque tokens.

/// Opaque token naming one allocation made through an [`Allocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationHandle(pub u64);

/// A resolved location inside an allocation: base handle plus byte
/// offset. Stands in for the raw pointer the execution engine will
/// eventually materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub handle: AllocationHandle,
    pub offset: usize,
}

/// An allocator failed to satisfy a request. The message is surfaced to
/// the caller verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("allocator failure: {0}")]
pub struct AllocatorError(pub String);

/// Custom allocation strategy supplied per backend.
pub trait Allocator: Send + Sync {
    /// The alignment every returned region satisfies.
    fn alignment(&self) -> usize;

    /// Requests `size` bytes aligned to `alignment`.
    fn allocate(&self, size: usize, alignment: usize) -> Result<AllocationHandle, AllocatorError>;

    /// Releases a previously allocated region.
    fn free(&self, handle: AllocationHandle) -> Result<(), AllocatorError>;

    /// Resolves the location `offset` bytes into an allocation.
    fn region_at_offset(
        &self,
        handle: AllocationHandle,
        offset: usize,
    ) -> Result<MemoryRegion, AllocatorError>;
}
