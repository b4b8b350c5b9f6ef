// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The built-in packing strategies.
//!
//! `ConstantMemoryStrategy` is the conservative default: every tensor
//! gets its own byte range for the whole run, so the buffer is as large
//! as the sum of all tensors. `IntervalPackingStrategy` exploits
//! lifetimes: tensors that are never live at the same time may share
//! bytes, which brings the buffer down to something close to the peak
//! working set.

use crate::block::{MemBin, MemBlock};
use crate::error::MemoryPlanError;
use crate::strategy::{MemBlockStrategy, MemBlockStrategyType};

/// Packs every block end-to-end with no reuse. Lifetimes are ignored;
/// each block behaves as if it were live for the entire run.
#[derive(Debug, Default)]
pub struct ConstantMemoryStrategy;

impl ConstantMemoryStrategy {
    pub const NAME: &'static str = "constant-memory";
}

impl MemBlockStrategy for ConstantMemoryStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn strategy_type(&self) -> MemBlockStrategyType {
        MemBlockStrategyType::SingleAxisPacking
    }

    fn optimize(&self, mut blocks: Vec<MemBlock>) -> Result<Vec<MemBin>, MemoryPlanError> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = 0;
        for block in &mut blocks {
            block.offset = cursor;
            cursor += block.size_bytes;
        }
        Ok(vec![MemBin { blocks }])
    }
}

/// First-fit interval packing. Blocks are placed largest-first, each
/// at the lowest byte offset that avoids every already-placed block
/// with an overlapping lifetime.
#[derive(Debug, Default)]
pub struct IntervalPackingStrategy;

impl IntervalPackingStrategy {
    pub const NAME: &'static str = "interval-packing";

    /// Lowest offset where `size_bytes` fit between the byte ranges of
    /// `conflicts`. Expects `conflicts` sorted by offset.
    fn first_fit(conflicts: &[&MemBlock], size_bytes: usize) -> usize {
        let mut candidate = 0;
        for other in conflicts {
            if candidate + size_bytes <= other.offset {
                break;
            }
            candidate = candidate.max(other.offset + other.size_bytes);
        }
        candidate
    }
}

impl MemBlockStrategy for IntervalPackingStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn strategy_type(&self) -> MemBlockStrategyType {
        MemBlockStrategyType::MultiAxisPacking
    }

    fn optimize(&self, mut blocks: Vec<MemBlock>) -> Result<Vec<MemBin>, MemoryPlanError> {
        if blocks.is_empty() {
            return Ok(Vec::new());
        }
        // Largest blocks claim low offsets first; size ties fall back
        // to the caller's index so placement is deterministic.
        blocks.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then(a.index.cmp(&b.index)));

        let mut placed: Vec<MemBlock> = Vec::with_capacity(blocks.len());
        for mut block in blocks {
            let mut conflicts: Vec<&MemBlock> = placed
                .iter()
                .filter(|other| other.lifetime_overlaps(&block))
                .collect();
            conflicts.sort_by_key(|other| other.offset);
            block.offset = Self::first_fit(&conflicts, block.size_bytes);
            placed.push(block);
        }
        placed.sort_by_key(|block| block.index);
        Ok(vec![MemBin { blocks: placed }])
    }
}

// ── Tests ───────────────────────────────────────────────────────────
