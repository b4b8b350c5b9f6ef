// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lifetime blocks and packed bins.
//!
//! A [`MemBlock`] describes one tensor's demand on the packing problem:
//! how many bytes it needs and over which span of the topological order
//! it must stay resident. Packing strategies arrange blocks into
//! [`MemBin`]s by assigning byte offsets; [`validate_bins`] checks the
//! result afterwards.

use crate::error::MemoryPlanError;

/// One tensor's memory demand over a span of execution steps.
///
/// Lifetimes are inclusive on both ends: a block born at step 3 and
/// dying at step 3 is live for exactly that one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemBlock {
    /// First execution step (topological index) at which the tensor
    /// must be resident.
    pub start_of_life: usize,
    /// Last execution step at which the tensor is read.
    pub end_of_life: usize,
    /// Bytes the tensor occupies.
    pub size_bytes: usize,
    /// Byte offset inside the owning bin. Zero until a strategy places
    /// the block.
    pub offset: usize,
    /// Caller-chosen identifier, carried through packing untouched.
    pub index: usize,
}

impl MemBlock {
    pub fn new(start_of_life: usize, end_of_life: usize, size_bytes: usize, index: usize) -> Self {
        Self {
            start_of_life,
            end_of_life,
            size_bytes,
            offset: 0,
            index,
        }
    }

    /// True when both blocks are live at some common step.
    pub fn lifetime_overlaps(&self, other: &MemBlock) -> bool {
        self.start_of_life <= other.end_of_life && other.start_of_life <= self.end_of_life
    }

    /// True when the byte ranges `[offset, offset + size)` intersect.
    pub fn byte_range_overlaps(&self, other: &MemBlock) -> bool {
        self.offset < other.offset + other.size_bytes
            && other.offset < self.offset + self.size_bytes
    }
}

/// A group of blocks sharing one backing buffer.
#[derive(Debug, Clone, Default)]
pub struct MemBin {
    pub blocks: Vec<MemBlock>,
}

impl MemBin {
    /// Bytes the bin's backing buffer must span.
    pub fn buffer_size(&self) -> usize {
        self.blocks
            .iter()
            .map(|b| b.offset + b.size_bytes)
            .max()
            .unwrap_or(0)
    }
}

/// Checks that no bin places two concurrently live blocks on
/// overlapping byte ranges. Byte sharing is legal only between blocks
/// whose lifetimes are disjoint.
pub fn validate_bins(bins: &[MemBin]) -> Result<(), MemoryPlanError> {
    for (bin_index, bin) in bins.iter().enumerate() {
        for (i, a) in bin.blocks.iter().enumerate() {
            for b in &bin.blocks[i + 1..] {
                if a.lifetime_overlaps(b) && a.byte_range_overlaps(b) {
                    return Err(MemoryPlanError::InvalidBlock {
                        bin: bin_index,
                        first: a.index,
                        second: b.index,
                    });
                }
            }
        }
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
