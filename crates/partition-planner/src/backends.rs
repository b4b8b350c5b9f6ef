// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend resolution and layer-support validation.

use crate::PartitionError;
use backend_registry::{BackendRegistry, BackendsMap, RegistryError};
use graph_ir::{Graph, InputSlotRef, LayerId};
use tensor_core::TensorInfo;

/// Constructs a capability object for every backend the graph's layer
/// assignments name.
///
/// Factories run once per backend per call; a factory that fails takes
/// the whole partition down with `BackendUnavailable`.
pub fn resolve_backends(
    graph: &Graph,
    registry: &BackendRegistry,
) -> Result<BackendsMap, PartitionError> {
    let mut backends = BackendsMap::new();
    for (_, layer) in graph.layers() {
        let backend = &layer.backend;
        if !backend.is_assigned() || backends.contains_key(backend) {
            continue;
        }
        let capability = registry.acquire(backend).map_err(|err| match err {
            RegistryError::Unavailable(unavailable) => {
                PartitionError::BackendUnavailable(unavailable)
            }
            _ => PartitionError::UnknownBackend {
                backend: backend.clone(),
            },
        })?;
        tracing::debug!(backend = %backend, "resolved backend capability");
        backends.insert(backend.clone(), capability);
    }
    Ok(backends)
}

/// Asks every assigned backend whether it can execute its layers.
///
/// Boundary layers bind graph I/O and need no kernels; everything else
/// must be accepted by its backend or the partition fails. Rejections
/// carry the backend's reason verbatim.
pub fn validate_backend_support(
    graph: &Graph,
    backends: &BackendsMap,
) -> Result<(), PartitionError> {
    for (layer_index, &id) in graph.topological_sort()?.iter().enumerate() {
        let layer = graph.layer(id)?;
        if layer.kind.is_boundary() {
            continue;
        }
        let unsupported = |backend, reason: String| PartitionError::UnsupportedLayer {
            layer_name: layer.name.clone(),
            layer_index,
            backend,
            reason,
        };
        if !layer.backend.is_assigned() {
            return Err(unsupported(
                layer.backend.clone(),
                "no backend assigned".to_string(),
            ));
        }
        let capability = backends.get(&layer.backend).ok_or_else(|| {
            PartitionError::UnknownBackend {
                backend: layer.backend.clone(),
            }
        })?;
        let inputs = operand_infos(graph, id)?;
        let outputs: Vec<TensorInfo> = layer
            .outputs
            .iter()
            .filter_map(|o| o.info.clone())
            .collect();
        let support =
            capability.is_layer_supported(layer.kind, &inputs, &outputs, &layer.descriptor);
        if let Some(reason) = support.reason() {
            return Err(unsupported(layer.backend.clone(), reason.to_string()));
        }
    }
    Ok(())
}

/// The tensor descriptions arriving at each input slot of `id`.
fn operand_infos(graph: &Graph, id: LayerId) -> Result<Vec<TensorInfo>, PartitionError> {
    let num_inputs = graph.layer(id)?.inputs.len();
    let mut infos = Vec::with_capacity(num_inputs);
    for slot in 0..num_inputs {
        if let Some(from) = graph.producer(InputSlotRef { layer: id, slot })? {
            infos.push(graph.output_info(from)?);
        }
    }
    Ok(infos)
}
