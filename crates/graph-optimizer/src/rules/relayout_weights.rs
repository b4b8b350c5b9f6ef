// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inserts weight-layout permutes for depthwise convolutions.
//!
//! Some backends want depthwise convolution weights in a different
//! dimension order than the graph declares. When the assigned backend
//! reports a preferred order, an explicit Permute goes onto the weight
//! operand; a constant weight producer marks the permute for constant
//! folding so no runtime work remains.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use backend_registry::BackendsMap;
use graph_ir::descriptor::{PermutationVector, PermuteDescriptor};
use graph_ir::{Descriptor, Graph, InputSlotRef, LayerId, LayerType, OutputSlotRef};

const WEIGHT_SLOT: usize = 1;

/// Re-order depthwise convolution weights for the assigned backend.
pub struct PermuteDepthwiseConv2dWeights {
    backends: BackendsMap,
}

impl PermuteDepthwiseConv2dWeights {
    pub fn new(backends: BackendsMap) -> Self {
        Self { backends }
    }

    fn wanted_order(&self, graph: &Graph, id: LayerId) -> Option<PermutationVector> {
        let layer = graph.layer(id).ok()?;
        if layer.kind != LayerType::DepthwiseConvolution2d {
            return None;
        }
        let order = self
            .backends
            .get(&layer.backend)?
            .preferred_depthwise_weight_order()?;
        if order.is_identity() {
            return None;
        }
        // Already relaid out: the weight producer is this exact permute.
        let from = graph
            .producer(InputSlotRef { layer: id, slot: WEIGHT_SLOT })
            .ok()??;
        let producer = graph.layer(from.layer).ok()?;
        if let Descriptor::Permute(d) = &producer.descriptor {
            if d.mapping == order {
                return None;
            }
        }
        Some(order)
    }
}

impl RewriteRule for PermuteDepthwiseConv2dWeights {
    fn name(&self) -> &str {
        "permute-depthwise-conv2d-weights"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        self.wanted_order(graph, id).is_some()
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let order = self
            .wanted_order(graph, id)
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let weight_input = InputSlotRef { layer: id, slot: WEIGHT_SLOT };
        let from = graph
            .producer(weight_input)?
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let producer_is_constant = graph.layer(from.layer)?.kind == LayerType::Constant;
        let name = format!("{}:weight-layout", graph.layer(id)?.name);

        let mut descriptor = PermuteDescriptor::new(order.as_slice().to_vec());
        descriptor.fold_into_constant = producer_is_constant;
        let permute =
            graph.insert_before(weight_input, LayerType::Permute, name, Descriptor::Permute(descriptor))?;

        let permute_out = OutputSlotRef { layer: permute, slot: 0 };
        let info = graph.output_info(permute_out)?;
        let permuted = info.shape.permuted(order.as_slice())?;
        let mut new_info = info;
        new_info.shape = permuted;
        graph.set_output_info(permute_out, new_info)?;
        Ok(RewriteResult::Rewritten)
    }
}
