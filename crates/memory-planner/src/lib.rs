// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Static memory planning for compiled networks.
//!
//! Execution order is known at compile time, so every intermediate
//! tensor's lifetime is an interval over the topological order. This
//! crate packs those intervals into shared buffers and manages the
//! resulting allocations:
//!
//! ```text
//!   PartitionedGraph ──► MemoryPlan::build ──► BufferStorage list
//!                              │                      │
//!                      MemBlockStrategy        MemoryManager
//!                  (constant-memory /         (allocate once per
//!                   interval-packing)          buffer, resolve
//!                                              base + offset)
//! ```
//!
//! Strategies are looked up by name through [`strategy_library`], so a
//! backend selects one by associating the name with its registry
//! entry.

mod allocator;
mod block;
mod error;
mod manager;
mod packing;
mod plan;
mod strategy;

pub use allocator::SystemAllocator;
pub use block::{validate_bins, MemBin, MemBlock};
pub use error::MemoryPlanError;
pub use manager::{BufferStorage, MemoryManager, TensorMemory};
pub use packing::{ConstantMemoryStrategy, IntervalPackingStrategy};
pub use plan::{MemoryPlan, MemoryReport};
pub use strategy::{
    strategy_by_name, strategy_library, MemBlockStrategy, MemBlockStrategyType,
    StrategyConstructor,
};
