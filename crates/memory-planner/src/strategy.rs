// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The packing strategy interface and the built-in strategy library.

use std::collections::HashMap;

use crate::block::{MemBin, MemBlock};
use crate::error::MemoryPlanError;
use crate::packing::{ConstantMemoryStrategy, IntervalPackingStrategy};

/// How a strategy arranges blocks inside its bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemBlockStrategyType {
    /// Blocks are laid out along the offset axis only; lifetimes are
    /// ignored and nothing is reused.
    SingleAxisPacking,
    /// Blocks are packed along both the offset and the lifetime axis,
    /// so blocks with disjoint lifetimes may share bytes.
    MultiAxisPacking,
}

/// Arranges lifetime blocks into bins by assigning byte offsets.
///
/// Implementations must keep every block they are given (same `index`
/// values in, same out) and must only let blocks share bytes when
/// their lifetimes are disjoint. [`crate::validate_bins`] enforces the
/// latter after every strategy run.
pub trait MemBlockStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn strategy_type(&self) -> MemBlockStrategyType;

    fn optimize(&self, blocks: Vec<MemBlock>) -> Result<Vec<MemBin>, MemoryPlanError>;
}

/// Constructor signature stored in the [`strategy_library`] map.
pub type StrategyConstructor = fn() -> Box<dyn MemBlockStrategy>;

/// All built-in strategies, keyed by the name a backend reports
/// through its registry association.
pub fn strategy_library() -> HashMap<&'static str, StrategyConstructor> {
    let mut library: HashMap<&'static str, StrategyConstructor> = HashMap::new();
    library.insert(ConstantMemoryStrategy::NAME, || {
        Box::new(ConstantMemoryStrategy)
    });
    library.insert(IntervalPackingStrategy::NAME, || {
        Box::new(IntervalPackingStrategy)
    });
    library
}

/// Instantiates a library strategy by name.
pub fn strategy_by_name(name: &str) -> Result<Box<dyn MemBlockStrategy>, MemoryPlanError> {
    strategy_library()
        .get(name)
        .map(|ctor| ctor())
        .ok_or_else(|| MemoryPlanError::UnknownStrategy {
            name: name.to_string(),
        })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_holds_both_builtins() {
        let library = strategy_library();
        assert_eq!(library.len(), 2);
        assert!(library.contains_key("constant-memory"));
        assert!(library.contains_key("interval-packing"));
    }

    #[test]
    fn test_lookup_by_name() {
        let strategy = strategy_by_name("interval-packing").unwrap();
        assert_eq!(strategy.name(), "interval-packing");
        assert_eq!(
            strategy.strategy_type(),
            MemBlockStrategyType::MultiAxisPacking
        );

        match strategy_by_name("arena-bump") {
            Err(MemoryPlanError::UnknownStrategy { name }) => assert_eq!(name, "arena-bump"),
            other => panic!("expected unknown strategy error, got {:?}", other.map(|_| ())),
        }
    }
}
