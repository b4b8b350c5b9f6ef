// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor-handle factory negotiation.
//!
//! Every output slot gets the factory that will own its tensor, and
//! every edge a data-movement strategy against that factory:
//!
//! - all consumers take the producer's top preference → that factory,
//!   every edge `DirectCompatibility`;
//! - otherwise the preference requiring the fewest copies wins
//!   (preference order breaks ties) and each edge is judged alone:
//!   direct where the consumer accepts the factory, zero-copy export
//!   where a consumer factory can import it (and importing is enabled),
//!   an explicit copy everywhere else.
//!
//! Backends without registered factories ride the legacy path: their
//! tensors always move by copy across backend boundaries.

use crate::PartitionError;
use backend_registry::{BackendsMap, HandleFactoryRegistry};
use graph_ir::{
    BackendId, EdgeStrategy, Graph, HandleFactoryId, InputSlotRef, LayerId, OutputSlotRef,
};

/// Decides a handle factory per output slot and a strategy per edge.
pub fn select_handle_factories(
    graph: &mut Graph,
    backends: &BackendsMap,
    registry: &HandleFactoryRegistry,
    import_enabled: bool,
) -> Result<(), PartitionError> {
    for id in graph.topological_sort()? {
        let num_outputs = graph.layer(id)?.outputs.len();
        for slot in 0..num_outputs {
            let from = OutputSlotRef { layer: id, slot };
            decide_slot(graph, backends, registry, import_enabled, from)?;
        }
    }
    Ok(())
}

fn decide_slot(
    graph: &mut Graph,
    backends: &BackendsMap,
    registry: &HandleFactoryRegistry,
    import_enabled: bool,
    from: OutputSlotRef,
) -> Result<(), PartitionError> {
    let producer_backend = graph.layer(from.layer)?.backend.clone();
    let prefs = registered_preferences(backends, registry, &producer_backend);
    let consumers = graph.consumers(from)?;

    if prefs.is_empty() {
        // Legacy producer: same-backend consumers share host memory,
        // everything else copies.
        graph.set_handle_factory(from, HandleFactoryId::legacy())?;
        for to in consumers {
            let strategy = if consumer_backend(graph, to)? == producer_backend {
                EdgeStrategy::DirectCompatibility
            } else {
                EdgeStrategy::CopyToTarget
            };
            graph.set_edge_strategy(from, to, strategy)?;
        }
        return Ok(());
    }

    let accepted: Vec<Vec<HandleFactoryId>> = consumers
        .iter()
        .map(|&to| {
            consumer_backend(graph, to)
                .map(|backend| registered_preferences(backends, registry, &backend))
        })
        .collect::<Result<_, _>>()?;

    // Fast path: the top preference satisfies every consumer.
    let top = &prefs[0];
    if accepted.iter().all(|set| set.contains(top)) {
        let chosen = top.clone();
        graph.set_handle_factory(from, chosen.clone())?;
        for &to in &consumers {
            graph.set_edge_strategy(from, to, EdgeStrategy::DirectCompatibility)?;
        }
        tracing::trace!(factory = %chosen, "slot settled on top preference");
        return Ok(());
    }

    // Score each preference by how many consumers avoid a copy with it;
    // earlier preferences win ties.
    let score = |f: &HandleFactoryId| accepted.iter().filter(|set| set.contains(f)).count();
    let mut best = 0usize;
    for i in 1..prefs.len() {
        if score(&prefs[i]) > score(&prefs[best]) {
            best = i;
        }
    }
    let chosen = prefs[best].clone();
    graph.set_handle_factory(from, chosen.clone())?;

    for (&to, accepted_set) in consumers.iter().zip(&accepted) {
        let strategy = if accepted_set.contains(&chosen) {
            EdgeStrategy::DirectCompatibility
        } else if import_enabled && can_import(registry, &chosen, accepted_set, graph, from, to)? {
            EdgeStrategy::ExportToTarget
        } else {
            EdgeStrategy::CopyToTarget
        };
        graph.set_edge_strategy(from, to, strategy)?;
    }
    Ok(())
}

/// Whether any of the consumer's factories can adopt an export from
/// `chosen` without a copy.
fn can_import(
    registry: &HandleFactoryRegistry,
    chosen: &HandleFactoryId,
    accepted: &[HandleFactoryId],
    graph: &Graph,
    from: OutputSlotRef,
    to: InputSlotRef,
) -> Result<bool, PartitionError> {
    let source = registry
        .get(chosen)
        .ok_or_else(|| undefined_edge(graph, from, to))?;
    if !source.supports_export() {
        return Ok(false);
    }
    Ok(accepted
        .iter()
        .filter_map(|id| registry.get(id))
        .any(|candidate| candidate.can_import_from(source)))
}

fn undefined_edge(graph: &Graph, from: OutputSlotRef, to: InputSlotRef) -> PartitionError {
    let name = |id: LayerId| {
        graph
            .layer(id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|_| id.to_string())
    };
    PartitionError::UndefinedEdge {
        producer: name(from.layer),
        consumer: name(to.layer),
    }
}

fn consumer_backend(graph: &Graph, to: InputSlotRef) -> Result<BackendId, PartitionError> {
    Ok(graph.layer(to.layer)?.backend.clone())
}

/// The backend's factory preferences, restricted to factories the
/// shared registry actually knows.
fn registered_preferences(
    backends: &BackendsMap,
    registry: &HandleFactoryRegistry,
    backend: &BackendId,
) -> Vec<HandleFactoryId> {
    backends
        .get(backend)
        .map(|cap| {
            cap.handle_factory_preferences()
                .into_iter()
                .filter(|id| registry.contains(id))
                .collect()
        })
        .unwrap_or_default()
}
