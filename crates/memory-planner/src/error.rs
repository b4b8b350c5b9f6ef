// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory planning and allocation.

use graph_ir::GraphError;

/// Errors raised while packing tensor lifetimes or driving an
/// allocator.
#[derive(Debug, thiserror::Error)]
pub enum MemoryPlanError {
    /// `MemoryManager::allocate` was called while its buffers were
    /// already backed by live allocations.
    #[error("memory is already allocated; deallocate before allocating again")]
    AlreadyAllocated,

    /// `MemoryManager::deallocate` was called with nothing allocated.
    #[error("memory is not allocated; nothing to deallocate")]
    NotAllocated,

    /// A packing strategy produced a bin where two concurrently live
    /// blocks occupy overlapping byte ranges.
    #[error(
        "invalid bin {bin}: blocks {first} and {second} overlap in bytes \
         while both are live"
    )]
    InvalidBlock {
        bin: usize,
        first: usize,
        second: usize,
    },

    /// A buffer referenced an allocator index that was never installed.
    #[error("no allocator registered at index {index}")]
    UnknownAllocator { index: usize },

    /// The requested packing strategy is not in the library.
    #[error("unknown memory strategy {name:?}")]
    UnknownStrategy { name: String },

    /// The backing allocator rejected a request.
    #[error(transparent)]
    AllocatorFailure(#[from] backend_registry::AllocatorError),

    /// Walking the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
