// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compatibility-layer insertion.
//!
//! Every edge left with `CopyToTarget` or `ExportToTarget` gets an
//! explicit MemCopy or MemImport layer spliced into it. Insertion is
//! two-phase: collect the edges against the immutable graph first, then
//! splice, so mutation never races the traversal. The pass is
//! idempotent; edges that already touch a compatibility layer are
//! skipped.

use crate::PartitionError;
use backend_registry::{BackendsMap, HandleFactoryRegistry};
use graph_ir::{
    Descriptor, EdgeStrategy, Graph, HandleFactoryId, InputSlotRef, LayerType, OutputSlotRef,
};

/// Materializes the copy/export decisions as graph layers.
pub fn add_compatibility_layers(
    graph: &mut Graph,
    backends: &BackendsMap,
    registry: &HandleFactoryRegistry,
) -> Result<(), PartitionError> {
    // Phase 1: collect the edges to splice.
    let mut pending: Vec<(OutputSlotRef, InputSlotRef, EdgeStrategy)> = Vec::new();
    for (id, layer) in graph.layers() {
        if layer.kind.is_compatibility() {
            continue;
        }
        for (slot, output) in layer.outputs.iter().enumerate() {
            let from = OutputSlotRef { layer: id, slot };
            for (&to, &strategy) in output.connections.iter().zip(&output.strategies) {
                if !matches!(
                    strategy,
                    EdgeStrategy::CopyToTarget | EdgeStrategy::ExportToTarget
                ) {
                    continue;
                }
                if graph.layer(to.layer)?.kind.is_compatibility() {
                    continue;
                }
                pending.push((from, to, strategy));
            }
        }
    }

    // Phase 2: splice a boundary layer into each collected edge.
    for (from, to, strategy) in pending {
        let kind = match strategy {
            EdgeStrategy::CopyToTarget => LayerType::MemCopy,
            EdgeStrategy::ExportToTarget => LayerType::MemImport,
            _ => continue,
        };
        let producer = graph.layer(from.layer)?.name.clone();
        let (consumer, consumer_backend) = {
            let layer = graph.layer(to.layer)?;
            (layer.name.clone(), layer.backend.clone())
        };
        let name = format!("[ {} ({}) -> {} ({}) ]", producer, from.slot, consumer, to.slot);
        tracing::debug!(layer = %name, kind = %kind, "inserting compatibility layer");

        let new_id = graph.insert_before(to, kind, name, Descriptor::None)?;
        graph.layer_mut(new_id)?.backend = consumer_backend.clone();

        // The boundary tensor lives in a representation the consumer
        // can read directly.
        let factory = backends
            .get(&consumer_backend)
            .and_then(|cap| {
                cap.handle_factory_preferences()
                    .into_iter()
                    .find(|id| registry.contains(id))
            })
            .unwrap_or_else(HandleFactoryId::legacy);
        let new_out = OutputSlotRef { layer: new_id, slot: 0 };
        graph.set_handle_factory(new_out, factory)?;
        graph.set_edge_strategy(from, InputSlotRef { layer: new_id, slot: 0 }, EdgeStrategy::DirectCompatibility)?;
        graph.set_edge_strategy(new_out, to, EdgeStrategy::DirectCompatibility)?;
    }
    Ok(())
}
