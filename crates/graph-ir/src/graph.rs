// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The graph arena: layer storage, edges, and rewrite primitives.
//!
//! # Arena + index scheme
//!
//! The `Graph` owns every [`Layer`] in a stable arena; a [`LayerId`] is
//! an index into it and stays valid until the layer is pruned. Pruning
//! leaves a hole rather than shifting ids, so a rewrite pass can collect
//! ids against a snapshot and apply mutations afterwards without any
//! iterator-invalidation hazards.
//!
//! Edges are kept doubly: an input slot stores at most one
//! [`OutputSlotRef`] back-reference, and the producing output slot keeps
//! the forward fan-out list plus one [`EdgeStrategy`] per connection.
//! All mutation goes through [`Graph::connect`]/[`Graph::disconnect`] so
//! the two sides can never disagree.

use crate::constant::ConstantTensor;
use crate::descriptor::Descriptor;
use crate::layer::{Layer, LayerType};
use crate::slot::{EdgeStrategy, HandleFactoryId, InputSlotRef, OutputSlotRef};
use crate::GraphError;
use std::collections::VecDeque;
use std::fmt;
use tensor_core::TensorInfo;

/// Stable handle to a layer in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(usize);

impl LayerId {
    /// The raw arena index. Stable for the lifetime of the layer.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered, topologically sortable collection of layers.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    layers: Vec<Option<Layer>>,
    next_guid: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ───────────────────────────────────────────────

    /// Adds a layer of the given kind and returns its id.
    ///
    /// Slot counts are derived from the kind and descriptor; the new
    /// layer starts fully disconnected with no backend assigned.
    pub fn add_layer(
        &mut self,
        kind: LayerType,
        name: impl Into<String>,
        descriptor: Descriptor,
    ) -> LayerId {
        let guid = self.next_guid;
        self.next_guid += 1;
        let id = LayerId(self.layers.len());
        self.layers.push(Some(Layer::new(name, kind, descriptor, guid)));
        id
    }

    /// Adds a graph input bound to an externally visible numeric id.
    pub fn add_input(&mut self, binding_id: i32, info: TensorInfo) -> LayerId {
        let id = self.add_layer(
            LayerType::Input,
            format!("input:{binding_id}"),
            Descriptor::None,
        );
        if let Some(Some(layer)) = self.layers.get_mut(id.0) {
            layer.binding_id = Some(binding_id);
            layer.outputs[0].info = Some(info);
        }
        id
    }

    /// Adds a graph output bound to an externally visible numeric id.
    pub fn add_output(&mut self, binding_id: i32) -> LayerId {
        let id = self.add_layer(
            LayerType::Output,
            format!("output:{binding_id}"),
            Descriptor::None,
        );
        if let Some(Some(layer)) = self.layers.get_mut(id.0) {
            layer.binding_id = Some(binding_id);
        }
        id
    }

    /// Adds a constant-producing layer owning the given payload.
    pub fn add_constant(&mut self, name: impl Into<String>, tensor: ConstantTensor) -> LayerId {
        let id = self.add_layer(LayerType::Constant, name, Descriptor::None);
        if let Some(Some(layer)) = self.layers.get_mut(id.0) {
            layer.outputs[0].info = Some(tensor.info.clone().as_constant());
            layer.constant = Some(tensor);
        }
        id
    }

    // ── Access ─────────────────────────────────────────────────────

    /// Returns the layer behind `id`, or `LayerNotFound` for a pruned or
    /// never-created id.
    pub fn layer(&self, id: LayerId) -> Result<&Layer, GraphError> {
        self.layers
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .ok_or(GraphError::LayerNotFound(id))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, GraphError> {
        self.layers
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .ok_or(GraphError::LayerNotFound(id))
    }

    /// Returns `true` if `id` names a live layer.
    pub fn contains(&self, id: LayerId) -> bool {
        matches!(self.layers.get(id.0), Some(Some(_)))
    }

    /// Number of live layers.
    pub fn num_layers(&self) -> usize {
        self.layers.iter().filter(|l| l.is_some()).count()
    }

    /// Snapshot of every live layer id, in arena order.
    ///
    /// Rewrite passes iterate this snapshot so they can mutate the graph
    /// while walking it.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|_| LayerId(i)))
            .collect()
    }

    /// Iterates `(id, layer)` pairs in arena order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_ref().map(|layer| (LayerId(i), layer)))
    }

    /// The bound graph inputs as `(binding id, layer id)` pairs.
    pub fn bound_inputs(&self) -> Vec<(i32, LayerId)> {
        self.bound_boundary(LayerType::Input)
    }

    /// The bound graph outputs as `(binding id, layer id)` pairs.
    pub fn bound_outputs(&self) -> Vec<(i32, LayerId)> {
        self.bound_boundary(LayerType::Output)
    }

    fn bound_boundary(&self, kind: LayerType) -> Vec<(i32, LayerId)> {
        self.layers()
            .filter(|(_, l)| l.kind == kind)
            .filter_map(|(id, l)| l.binding_id.map(|b| (b, id)))
            .collect()
    }

    // ── Edges ──────────────────────────────────────────────────────

    /// Connects an output slot to an input slot.
    ///
    /// Fails if the input slot is already connected; fan-out on the
    /// output side is unlimited. The new edge starts with
    /// [`EdgeStrategy::Undefined`].
    pub fn connect(&mut self, from: OutputSlotRef, to: InputSlotRef) -> Result<(), GraphError> {
        self.check_output_slot(from)?;
        {
            let layer = self.layer(to.layer)?;
            let slot = layer
                .inputs
                .get(to.slot)
                .ok_or_else(|| GraphError::SlotOutOfRange {
                    layer: layer.name.clone(),
                    kind: "input",
                    slot: to.slot,
                })?;
            if slot.connection.is_some() {
                return Err(GraphError::AlreadyConnected {
                    layer: layer.name.clone(),
                    slot: to.slot,
                });
            }
        }
        {
            let producer = self.layer_mut(from.layer)?;
            let out = &mut producer.outputs[from.slot];
            out.connections.push(to);
            out.strategies.push(EdgeStrategy::Undefined);
        }
        self.layer_mut(to.layer)?.inputs[to.slot].connection = Some(from);
        Ok(())
    }

    /// Disconnects an input slot, returning the output slot it was
    /// connected to.
    pub fn disconnect(&mut self, to: InputSlotRef) -> Result<OutputSlotRef, GraphError> {
        let from = self.producer(to)?.ok_or_else(|| {
            let name = self
                .layer(to.layer)
                .map(|l| l.name.clone())
                .unwrap_or_default();
            GraphError::NotConnected {
                layer: name,
                slot: to.slot,
            }
        })?;
        {
            let producer = self.layer_mut(from.layer)?;
            let out = &mut producer.outputs[from.slot];
            if let Some(idx) = out.connections.iter().position(|c| *c == to) {
                out.connections.remove(idx);
                out.strategies.remove(idx);
            }
        }
        self.layer_mut(to.layer)?.inputs[to.slot].connection = None;
        Ok(from)
    }

    /// The output slot feeding `to`, if any.
    pub fn producer(&self, to: InputSlotRef) -> Result<Option<OutputSlotRef>, GraphError> {
        let layer = self.layer(to.layer)?;
        layer
            .inputs
            .get(to.slot)
            .map(|s| s.connection)
            .ok_or_else(|| GraphError::SlotOutOfRange {
                layer: layer.name.clone(),
                kind: "input",
                slot: to.slot,
            })
    }

    /// Snapshot of the input slots fed by `from`.
    pub fn consumers(&self, from: OutputSlotRef) -> Result<Vec<InputSlotRef>, GraphError> {
        self.check_output_slot(from)?;
        Ok(self.layer(from.layer)?.outputs[from.slot].connections.clone())
    }

    // ── Tensor info and partitioning metadata ──────────────────────

    /// The tensor description produced by `from`.
    pub fn output_info(&self, from: OutputSlotRef) -> Result<TensorInfo, GraphError> {
        self.check_output_slot(from)?;
        let layer = self.layer(from.layer)?;
        layer.outputs[from.slot]
            .info
            .clone()
            .ok_or_else(|| GraphError::MissingTensorInfo {
                layer: layer.name.clone(),
                slot: from.slot,
            })
    }

    pub fn set_output_info(
        &mut self,
        from: OutputSlotRef,
        info: TensorInfo,
    ) -> Result<(), GraphError> {
        self.check_output_slot(from)?;
        self.layer_mut(from.layer)?.outputs[from.slot].info = Some(info);
        Ok(())
    }

    pub fn set_handle_factory(
        &mut self,
        from: OutputSlotRef,
        factory: HandleFactoryId,
    ) -> Result<(), GraphError> {
        self.check_output_slot(from)?;
        self.layer_mut(from.layer)?.outputs[from.slot].handle_factory = Some(factory);
        Ok(())
    }

    pub fn handle_factory(&self, from: OutputSlotRef) -> Result<Option<HandleFactoryId>, GraphError> {
        self.check_output_slot(from)?;
        Ok(self.layer(from.layer)?.outputs[from.slot].handle_factory.clone())
    }

    /// Sets the strategy of the edge `from → to`.
    pub fn set_edge_strategy(
        &mut self,
        from: OutputSlotRef,
        to: InputSlotRef,
        strategy: EdgeStrategy,
    ) -> Result<(), GraphError> {
        let idx = self.connection_index(from, to)?;
        self.layer_mut(from.layer)?.outputs[from.slot].strategies[idx] = strategy;
        Ok(())
    }

    /// The strategy of the edge `from → to`.
    pub fn edge_strategy(
        &self,
        from: OutputSlotRef,
        to: InputSlotRef,
    ) -> Result<EdgeStrategy, GraphError> {
        let idx = self.connection_index(from, to)?;
        Ok(self.layer(from.layer)?.outputs[from.slot].strategies[idx])
    }

    fn connection_index(
        &self,
        from: OutputSlotRef,
        to: InputSlotRef,
    ) -> Result<usize, GraphError> {
        self.check_output_slot(from)?;
        let layer = self.layer(from.layer)?;
        layer.outputs[from.slot]
            .connections
            .iter()
            .position(|c| *c == to)
            .ok_or_else(|| GraphError::NotConnected {
                layer: layer.name.clone(),
                slot: from.slot,
            })
    }

    // ── Rewrite primitives ─────────────────────────────────────────

    /// Splices a new layer into the single edge feeding `to`.
    ///
    /// The edge `producer → to` becomes `producer → new → to`; every
    /// other connection of the producer slot is untouched. The new
    /// layer's output inherits the producer slot's [`TensorInfo`] so
    /// compatibility layers carry the edge's description unchanged;
    /// callers inserting a shape-changing layer overwrite it afterwards.
    pub fn insert_before(
        &mut self,
        to: InputSlotRef,
        kind: LayerType,
        name: impl Into<String>,
        descriptor: Descriptor,
    ) -> Result<LayerId, GraphError> {
        let name = name.into();
        let from = self.disconnect(to)?;
        let info = self.layer(from.layer)?.outputs[from.slot].info.clone();
        tracing::debug!(layer = %name, kind = %kind, "splicing layer into edge");
        let new_id = self.add_layer(kind, name, descriptor);
        if let Some(Some(layer)) = self.layers.get_mut(new_id.0) {
            layer.outputs[0].info = info;
        }
        self.connect(from, InputSlotRef { layer: new_id, slot: 0 })?;
        self.connect(OutputSlotRef { layer: new_id, slot: 0 }, to)?;
        Ok(new_id)
    }

    /// Re-routes every consumer of `from` onto `to`.
    ///
    /// Used by identity elimination and sibling squashing; `from` is
    /// left without consumers and can then be pruned.
    pub fn substitute_producer(
        &mut self,
        from: OutputSlotRef,
        to: OutputSlotRef,
    ) -> Result<(), GraphError> {
        self.check_output_slot(to)?;
        for consumer in self.consumers(from)? {
            self.disconnect(consumer)?;
            self.connect(to, consumer)?;
        }
        Ok(())
    }

    /// Removes a layer from the arena.
    ///
    /// Connected input slots are disconnected first; the layer's output
    /// slots must already have no consumers, otherwise
    /// `LayerStillConnected` is returned and the graph is unchanged.
    pub fn prune_layer(&mut self, id: LayerId) -> Result<(), GraphError> {
        let (name, pending_inputs) = {
            let layer = self.layer(id)?;
            if layer.outputs.iter().any(|o| !o.connections.is_empty()) {
                return Err(GraphError::LayerStillConnected {
                    layer: layer.name.clone(),
                });
            }
            let pending: Vec<InputSlotRef> = layer
                .inputs
                .iter()
                .enumerate()
                .filter(|(_, s)| s.connection.is_some())
                .map(|(slot, _)| InputSlotRef { layer: id, slot })
                .collect();
            (layer.name.clone(), pending)
        };
        for input in pending_inputs {
            self.disconnect(input)?;
        }
        tracing::debug!(layer = %name, "pruning layer");
        self.layers[id.0] = None;
        Ok(())
    }

    // ── Ordering and validation ────────────────────────────────────

    /// Topologically sorts the live layers.
    ///
    /// Returns `CycleDetected` if the graph is not a DAG. The order is
    /// deterministic: ties break by arena order.
    pub fn topological_sort(&self) -> Result<Vec<LayerId>, GraphError> {
        let ids = self.layer_ids();
        let mut indegree: Vec<usize> = vec![0; self.layers.len()];
        for &id in &ids {
            let layer = self.layer(id)?;
            indegree[id.0] = layer.inputs.iter().filter(|s| s.connection.is_some()).count();
        }

        let mut queue: VecDeque<LayerId> =
            ids.iter().copied().filter(|id| indegree[id.0] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let layer = self.layer(id)?;
            for out in &layer.outputs {
                for consumer in &out.connections {
                    indegree[consumer.layer.0] -= 1;
                    if indegree[consumer.layer.0] == 0 {
                        queue.push_back(consumer.layer);
                    }
                }
            }
        }

        if order.len() != ids.len() {
            return Err(GraphError::CycleDetected);
        }
        Ok(order)
    }

    /// Checks the "ready graph" invariant.
    ///
    /// Every input slot must be connected, every output slot must carry
    /// a [`TensorInfo`], the graph must be acyclic, and elementwise
    /// layers must see broadcast-compatible operands.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (id, layer) in self.layers() {
            for (slot, input) in layer.inputs.iter().enumerate() {
                if input.connection.is_none() {
                    return Err(GraphError::NotConnected {
                        layer: layer.name.clone(),
                        slot,
                    });
                }
            }
            for (slot, output) in layer.outputs.iter().enumerate() {
                if output.info.is_none() {
                    return Err(GraphError::MissingTensorInfo {
                        layer: layer.name.clone(),
                        slot,
                    });
                }
            }
            if matches!(layer.kind, LayerType::Addition | LayerType::Multiplication) {
                let lhs = self.input_shape(id, 0)?;
                let rhs = self.input_shape(id, 1)?;
                if !lhs.is_broadcast_compatible(&rhs) {
                    return Err(GraphError::IncompatibleInputs {
                        layer: layer.name.clone(),
                        lhs,
                        rhs,
                    });
                }
            }
        }
        self.topological_sort()?;
        Ok(())
    }

    /// Shape arriving at input slot `slot` of layer `id`.
    fn input_shape(&self, id: LayerId, slot: usize) -> Result<tensor_core::Shape, GraphError> {
        let input = InputSlotRef { layer: id, slot };
        let from = self.producer(input)?.ok_or_else(|| GraphError::NotConnected {
            layer: self.layer(id).map(|l| l.name.clone()).unwrap_or_default(),
            slot,
        })?;
        Ok(self.output_info(from)?.shape)
    }

    fn check_output_slot(&self, from: OutputSlotRef) -> Result<(), GraphError> {
        let layer = self.layer(from.layer)?;
        if from.slot >= layer.outputs.len() {
            return Err(GraphError::SlotOutOfRange {
                layer: layer.name.clone(),
                kind: "output",
                slot: from.slot,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph ({} layers):", self.num_layers())?;
        for (id, layer) in self.layers() {
            writeln!(f, "  {id} {}", layer.summary())?;
            for (slot, out) in layer.outputs.iter().enumerate() {
                for (conn, strategy) in out.connections.iter().zip(&out.strategies) {
                    let target = self
                        .layer(conn.layer)
                        .map(|l| l.name.clone())
                        .unwrap_or_else(|_| conn.layer.to_string());
                    writeln!(
                        f,
                        "    out[{slot}] -> {target}[{}] ({strategy})",
                        conn.slot
                    )?;
                }
            }
        }
        Ok(())
    }
}
