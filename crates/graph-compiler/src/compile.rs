// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compile pipeline.
//!
//! ```text
//!   Graph ──► validate ──► optimize ──► partition ──► plan memory
//!                             │             │              │
//!                      rule catalogue   backend +      one plan per
//!                      to fixpoint      edge assign    planned backend
//!                                           │              │
//!                                           └──► CompiledNetwork ◄──┘
//! ```
//!
//! Memory is planned only for backends that name a packing strategy.
//! Precedence: the [`CompileOptions::memory_strategy`] override, then
//! the registry association, then the capability's own
//! `memory_strategy_name`. Backends naming none bring their own tensor
//! storage and skip planning entirely.

use std::collections::BTreeMap;
use std::sync::Arc;

use backend_registry::{Allocator, BackendRegistry};
use graph_ir::Graph;
use graph_optimizer::{default_catalogue, Optimizer};
use memory_planner::{
    strategy_by_name, MemoryManager, MemoryPlan, MemoryReport, SystemAllocator,
};
use partition_planner::{partition, resolve_backends, PartitionedGraph};
use tracing::{debug, info};

use crate::error::CompileError;
use crate::options::CompileOptions;

/// What one [`compile`] call did, keyed for logs and tooling.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CompileReport {
    /// Optimizer sweeps, including the final quiet one.
    pub optimizer_sweeps: usize,
    /// Rewrites the catalogue applied in total.
    pub optimizer_rewrites: usize,
    /// Backend partitions in the compiled graph.
    pub partitions: usize,
    /// Memory report per planned backend id.
    pub memory: BTreeMap<String, MemoryReport>,
}

/// A network ready for execution: the partitioned graph, its packed
/// memory, and a report of what compilation did.
pub struct CompiledNetwork {
    pub graph: PartitionedGraph,
    pub memory_manager: MemoryManager,
    pub report: CompileReport,
}

/// Compiles `graph` against the backends in `registry`.
///
/// Runs the full pipeline: option and graph validation, the rewrite
/// catalogue to fixpoint, backend partitioning with edge negotiation,
/// and static memory planning for every backend that names a packing
/// strategy.
pub fn compile(
    mut graph: Graph,
    registry: &BackendRegistry,
    options: &CompileOptions,
) -> Result<CompiledNetwork, CompileError> {
    options.validate()?;
    graph.validate()?;

    let backends = resolve_backends(&graph, registry)?;
    info!(
        layers = graph.num_layers(),
        backends = backends.len(),
        "compiling network"
    );
    if options.debug_graph_dump {
        debug!(graph = %graph, "graph before optimization");
    }

    let rules = default_catalogue(&backends, options.precision_reduction());
    let stats = Optimizer::run(&mut graph, &rules)?;
    info!(
        sweeps = stats.sweeps,
        rewrites = stats.rewrites,
        "optimizer finished"
    );
    if options.debug_graph_dump {
        debug!(graph = %graph, "graph after optimization");
    }

    let partitioned = partition(graph, registry, options.import_enabled)?;
    info!(partitions = partitioned.num_partitions(), "graph partitioned");

    let mut memory_manager = MemoryManager::new();
    let mut memory = BTreeMap::new();
    for part in partitioned.partitions() {
        if memory.contains_key(part.backend.as_str()) {
            continue;
        }
        let strategy_name = options
            .memory_strategy
            .clone()
            .or_else(|| registry.memory_strategy(&part.backend))
            .or_else(|| {
                backends
                    .get(&part.backend)
                    .and_then(|cap| cap.memory_strategy_name().map(String::from))
            });
        let Some(strategy_name) = strategy_name else {
            continue;
        };
        let strategy = strategy_by_name(&strategy_name)?;
        let plan = MemoryPlan::build(&partitioned, &part.backend, strategy.as_ref())?;
        memory.insert(part.backend.as_str().to_string(), plan.report().clone());

        let allocator = registry
            .custom_allocator(&part.backend)
            .unwrap_or_else(|| Arc::new(SystemAllocator::new()) as Arc<dyn Allocator>);
        let index = memory_manager.add_allocator(allocator);
        memory_manager.store_mem_to_allocate(plan.into_buffers(), index)?;
    }
    info!(planned_backends = memory.len(), "memory planning finished");

    let report = CompileReport {
        optimizer_sweeps: stats.sweeps,
        optimizer_rewrites: stats.rewrites,
        partitions: partitioned.num_partitions(),
        memory,
    };
    Ok(CompiledNetwork {
        graph: partitioned,
        memory_manager,
        report,
    })
}
