// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The top-level compile error.
//!
//! Every phase error funnels into [`CompileError`] so callers handle a
//! single type. A failed compile never leaves partial state behind;
//! the registry and the caller's options are untouched.

use backend_registry::RegistryError;
use graph_ir::GraphError;
use graph_optimizer::OptimizerError;
use memory_planner::MemoryPlanError;
use partition_planner::PartitionError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The option set is contradictory.
    #[error("invalid compile options: {reason}")]
    InvalidOptions { reason: String },

    /// Options could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input graph failed validation or a rewrite primitive.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A rewrite rule failed mid-catalogue.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    /// Backend resolution, support validation, or edge negotiation
    /// failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// Memory planning or allocation bookkeeping failed.
    #[error(transparent)]
    Memory(#[from] MemoryPlanError),

    /// A registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
