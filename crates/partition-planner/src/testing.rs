// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mock backends and graph builders shared by the planner tests.

use backend_registry::{
    BackendCapability, BackendRegistry, HandleFactoryRegistry, LayerSupport, TensorHandleFactory,
};
use graph_ir::descriptor::PermutationVector;
use graph_ir::{
    BackendId, Descriptor, Graph, HandleFactoryId, InputSlotRef, LayerId, LayerType, OutputSlotRef,
};
use std::sync::Arc;
use tensor_core::{DType, Shape, TensorInfo};

/// A configurable in-memory backend capability.
#[derive(Clone)]
pub(crate) struct TestBackend {
    id: BackendId,
    reject_reason: Option<String>,
    factories: Vec<TensorHandleFactory>,
}

impl TestBackend {
    /// A backend that accepts every layer and exposes no handle
    /// factories (legacy copy path only).
    pub(crate) fn accepting(id: &str) -> Self {
        Self {
            id: BackendId::from(id),
            reject_reason: None,
            factories: Vec::new(),
        }
    }

    /// Attaches handle factories, most preferred first.
    pub(crate) fn with_factories(mut self, factories: Vec<TensorHandleFactory>) -> Self {
        self.factories = factories;
        self
    }

    /// Makes `is_layer_supported` reject everything with `reason`.
    pub(crate) fn rejecting(mut self, reason: &str) -> Self {
        self.reject_reason = Some(reason.to_string());
        self
    }
}

impl BackendCapability for TestBackend {
    fn backend_id(&self) -> BackendId {
        self.id.clone()
    }

    fn is_layer_supported(
        &self,
        _kind: LayerType,
        _inputs: &[TensorInfo],
        _outputs: &[TensorInfo],
        _descriptor: &Descriptor,
    ) -> LayerSupport {
        match &self.reject_reason {
            Some(reason) => LayerSupport::rejected(reason.clone()),
            None => LayerSupport::Supported,
        }
    }

    fn handle_factory_preferences(&self) -> Vec<HandleFactoryId> {
        self.factories.iter().map(|f| f.id.clone()).collect()
    }

    fn register_tensor_handle_factories(&self, registry: &mut HandleFactoryRegistry) {
        for factory in &self.factories {
            registry.register(factory.clone());
        }
    }

    fn preferred_depthwise_weight_order(&self) -> Option<PermutationVector> {
        None
    }
}

/// Registers `backend` under its own id with an always-succeeding
/// factory.
pub(crate) fn register_backend(registry: &BackendRegistry, backend: TestBackend) {
    let id = backend.id.clone();
    registry
        .register(
            id,
            Arc::new(move || Ok(Arc::new(backend.clone()) as Arc<dyn BackendCapability>)),
        )
        .unwrap();
}

/// A linear Input -> Activation* -> Output graph with one activation per
/// entry in `backends`, each assigned to the named backend. The boundary
/// layers take the backend of their neighbor.
pub(crate) fn chain_graph(backends: &[&str]) -> Graph {
    let mut g = Graph::new();
    let info = TensorInfo::new(Shape::from(&[1, 16][..]), DType::F32);
    let input = g.add_input(0, info.clone());
    let mut prev = input;
    for (i, backend) in backends.iter().enumerate() {
        let act = g.add_layer(LayerType::Activation, format!("layer.{i}"), Descriptor::None);
        g.connect(
            OutputSlotRef { layer: prev, slot: 0 },
            InputSlotRef { layer: act, slot: 0 },
        )
        .unwrap();
        g.set_output_info(OutputSlotRef { layer: act, slot: 0 }, info.clone())
            .unwrap();
        g.layer_mut(act).unwrap().backend = BackendId::from(*backend);
        prev = act;
    }
    let output = g.add_output(0);
    g.connect(
        OutputSlotRef { layer: prev, slot: 0 },
        InputSlotRef { layer: output, slot: 0 },
    )
    .unwrap();
    if let (Some(first), Some(last)) = (backends.first(), backends.last()) {
        g.layer_mut(input).unwrap().backend = BackendId::from(*first);
        g.layer_mut(output).unwrap().backend = BackendId::from(*last);
    }
    g
}

/// Ids of the activation layers of a [`chain_graph`], in chain order.
pub(crate) fn chain_layers(graph: &Graph) -> Vec<LayerId> {
    let mut ids: Vec<LayerId> = graph
        .layers()
        .filter(|(_, l)| l.kind == LayerType::Activation)
        .map(|(id, _)| id)
        .collect();
    ids.sort();
    ids
}
