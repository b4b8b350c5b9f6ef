// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The partitioning pipeline and its result.
//!
//! [`partition`] drives the phases in order:
//!
//! ```text
//!   validate graph
//!        │
//!   resolve backends  ──────── registry factories run here
//!        │
//!   validate layer support
//!        │
//!   select handle factories ── per-slot factory, per-edge strategy
//!        │
//!   add compatibility layers ─ MemCopy / MemImport splices
//!        │
//!   group into per-backend partitions
//! ```
//!
//! The result owns the final graph: every edge carries a concrete
//! strategy and every output slot a handle factory.

use crate::backends::{resolve_backends, validate_backend_support};
use crate::compatibility::add_compatibility_layers;
use crate::selection::select_handle_factories;
use crate::PartitionError;
use backend_registry::{BackendRegistry, HandleFactoryRegistry, WorkloadFactoryHandle};
use graph_ir::{BackendId, EdgeStrategy, Graph, InputSlotRef, LayerId, OutputSlotRef};
use std::collections::HashMap;

/// The layers assigned to one backend, in topological order.
#[derive(Debug, Clone)]
pub struct BackendPartition {
    pub backend: BackendId,
    pub layers: Vec<LayerId>,
}

/// A fully partitioned graph, ready for workload creation and memory
/// planning.
#[derive(Debug)]
pub struct PartitionedGraph {
    graph: Graph,
    partitions: Vec<BackendPartition>,
    workload_factories: HashMap<BackendId, WorkloadFactoryHandle>,
}

impl PartitionedGraph {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Per-backend partitions, ordered by first appearance in the
    /// topological order.
    pub fn partitions(&self) -> &[BackendPartition] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// The workload factory token for `backend`, if the graph uses it.
    pub fn workload_factory(&self, backend: &BackendId) -> Option<&WorkloadFactoryHandle> {
        self.workload_factories.get(backend)
    }
}

/// Partitions `graph` across the backends its layers are assigned to.
///
/// Boundary layers without an assignment inherit their neighbor's
/// backend first, so front-ends only have to assign the compute layers.
pub fn partition(
    mut graph: Graph,
    registry: &BackendRegistry,
    import_enabled: bool,
) -> Result<PartitionedGraph, PartitionError> {
    graph.validate()?;
    assign_boundary_backends(&mut graph)?;

    let backends = resolve_backends(&graph, registry)?;
    let mut handle_registry = HandleFactoryRegistry::new();
    for capability in backends.values() {
        capability.register_tensor_handle_factories(&mut handle_registry);
    }
    tracing::info!(
        backends = backends.len(),
        handle_factories = handle_registry.len(),
        "resolved backends"
    );

    validate_backend_support(&graph, &backends)?;
    select_handle_factories(&mut graph, &backends, &handle_registry, import_enabled)?;
    add_compatibility_layers(&mut graph, &backends, &handle_registry)?;
    ensure_edges_defined(&graph)?;

    let partitions = group_by_backend(&graph)?;
    let workload_factories = backends
        .iter()
        .map(|(id, cap)| (id.clone(), cap.create_workload_factory()))
        .collect();
    tracing::info!(
        partitions = partitions.len(),
        layers = graph.num_layers(),
        "partitioning complete"
    );
    Ok(PartitionedGraph {
        graph,
        partitions,
        workload_factories,
    })
}

/// Gives unassigned Input/Output/Constant layers the backend of their
/// first consumer (or producer, for outputs).
fn assign_boundary_backends(graph: &mut Graph) -> Result<(), PartitionError> {
    for id in graph.layer_ids() {
        let layer = graph.layer(id)?;
        if layer.backend.is_assigned() {
            continue;
        }
        let neighbor = if layer.inputs.is_empty() {
            graph
                .consumers(OutputSlotRef { layer: id, slot: 0 })?
                .first()
                .map(|c| graph.layer(c.layer).map(|l| l.backend.clone()))
                .transpose()?
        } else {
            graph
                .producer(InputSlotRef { layer: id, slot: 0 })?
                .map(|p| graph.layer(p.layer).map(|l| l.backend.clone()))
                .transpose()?
        };
        if let Some(backend) = neighbor.filter(|b| b.is_assigned()) {
            graph.layer_mut(id)?.backend = backend;
        }
    }
    Ok(())
}

/// Postcondition check: partitioning leaves no edge undecided.
fn ensure_edges_defined(graph: &Graph) -> Result<(), PartitionError> {
    for (id, layer) in graph.layers() {
        for (slot, output) in layer.outputs.iter().enumerate() {
            let from = OutputSlotRef { layer: id, slot };
            for &to in &output.connections {
                if graph.edge_strategy(from, to)? == EdgeStrategy::Undefined {
                    let consumer = graph.layer(to.layer)?.name.clone();
                    return Err(PartitionError::UndefinedEdge {
                        producer: layer.name.clone(),
                        consumer,
                    });
                }
            }
        }
    }
    Ok(())
}

fn group_by_backend(graph: &Graph) -> Result<Vec<BackendPartition>, PartitionError> {
    let mut partitions: Vec<BackendPartition> = Vec::new();
    for id in graph.topological_sort()? {
        let backend = graph.layer(id)?.backend.clone();
        match partitions.iter_mut().find(|p| p.backend == backend) {
            Some(partition) => partition.layers.push(id),
            None => partitions.push(BackendPartition {
                backend,
                layers: vec![id],
            }),
        }
    }
    Ok(partitions)
}
