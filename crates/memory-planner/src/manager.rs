// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Buffer storage and the per-network memory manager.
//!
//! A [`BufferStorage`] is one packed bin reduced to what the runtime
//! needs: the buffer size and the offset of every tensor inside it.
//! [`MemoryManager`] turns those into live allocations, making exactly
//! one allocator call per buffer and resolving each tensor to a base
//! plus offset region. One instance serves one network and is driven
//! from a single thread.

use std::sync::Arc;

use backend_registry::{AllocationHandle, Allocator, MemoryRegion};
use tracing::debug;

use crate::error::MemoryPlanError;

/// One tensor's place inside a packed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMemory {
    /// Byte offset inside the owning buffer.
    pub offset: usize,
    /// Identifier assigned when the plan was built; stable across
    /// allocate/deallocate cycles.
    pub tensor_id: usize,
    /// Resolved location, populated by [`MemoryManager::allocate`].
    pub region: Option<MemoryRegion>,
}

impl TensorMemory {
    pub fn new(offset: usize, tensor_id: usize) -> Self {
        Self {
            offset,
            tensor_id,
            region: None,
        }
    }
}

/// One backing buffer and the tensors packed into it.
#[derive(Debug, Clone, Default)]
pub struct BufferStorage {
    pub tensor_memories: Vec<TensorMemory>,
    pub buffer_size: usize,
    pub handle: Option<AllocationHandle>,
}

struct BufferGroup {
    allocator: usize,
    buffers: Vec<BufferStorage>,
}

/// Owns the buffers of one compiled network and the allocators that
/// back them.
#[derive(Default)]
pub struct MemoryManager {
    allocators: Vec<Arc<dyn Allocator>>,
    groups: Vec<BufferGroup>,
    allocated: bool,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an allocator and returns the index used to refer to it
    /// from [`store_mem_to_allocate`](Self::store_mem_to_allocate).
    pub fn add_allocator(&mut self, allocator: Arc<dyn Allocator>) -> usize {
        self.allocators.push(allocator);
        self.allocators.len() - 1
    }

    /// Queues buffers to be backed by the allocator at
    /// `allocator_index` on the next [`allocate`](Self::allocate) call.
    pub fn store_mem_to_allocate(
        &mut self,
        buffers: Vec<BufferStorage>,
        allocator_index: usize,
    ) -> Result<(), MemoryPlanError> {
        if allocator_index >= self.allocators.len() {
            return Err(MemoryPlanError::UnknownAllocator {
                index: allocator_index,
            });
        }
        self.groups.push(BufferGroup {
            allocator: allocator_index,
            buffers,
        });
        Ok(())
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Total bytes the manager will request across all buffers.
    pub fn total_bytes(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| &group.buffers)
            .map(|buffer| buffer.buffer_size)
            .sum()
    }

    /// Backs every stored buffer with one allocation and resolves each
    /// tensor's region inside it.
    pub fn allocate(&mut self) -> Result<(), MemoryPlanError> {
        if self.allocated {
            return Err(MemoryPlanError::AlreadyAllocated);
        }
        for group in &mut self.groups {
            let allocator = &self.allocators[group.allocator];
            let alignment = allocator.alignment();
            for buffer in &mut group.buffers {
                let handle = allocator.allocate(buffer.buffer_size, alignment)?;
                buffer.handle = Some(handle);
                for tensor in &mut buffer.tensor_memories {
                    tensor.region = Some(allocator.region_at_offset(handle, tensor.offset)?);
                }
            }
        }
        self.allocated = true;
        debug!(
            buffers = self.groups.iter().map(|g| g.buffers.len()).sum::<usize>(),
            bytes = self.total_bytes(),
            "allocated network memory"
        );
        Ok(())
    }

    /// Releases every buffer through the allocator that produced it.
    pub fn deallocate(&mut self) -> Result<(), MemoryPlanError> {
        if !self.allocated {
            return Err(MemoryPlanError::NotAllocated);
        }
        for group in &mut self.groups {
            let allocator = &self.allocators[group.allocator];
            for buffer in &mut group.buffers {
                if let Some(handle) = buffer.handle.take() {
                    allocator.free(handle)?;
                }
                for tensor in &mut buffer.tensor_memories {
                    tensor.region = None;
                }
            }
        }
        self.allocated = false;
        Ok(())
    }

    /// Looks a tensor up by id across all buffers.
    pub fn tensor_memory(&self, tensor_id: usize) -> Option<&TensorMemory> {
        self.groups
            .iter()
            .flat_map(|group| &group.buffers)
            .flat_map(|buffer| &buffer.tensor_memories)
            .find(|tensor| tensor.tensor_id == tensor_id)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
