// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Folds zero-padding into a following Pooling2d layer.
//!
//! A Pad that injects zeros around the spatial dimensions and feeds a
//! single Pooling2d can be expressed through the pooling descriptor's
//! own padding fields, saving one intermediate tensor. Folding changes
//! which elements a border kernel averages over, so `Exclude` padding
//! flips to `IgnoreValue` and the assigned backend must confirm it
//! supports the fused form before the Pad disappears.
//!
//! Tensors are taken to be NCHW: only pads on the two trailing
//! dimensions fold.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use backend_registry::BackendsMap;
use graph_ir::descriptor::{PadDescriptor, PaddingMethod, Pooling2dDescriptor};
use graph_ir::{Descriptor, Graph, InputSlotRef, LayerId, LayerType};

/// Fuse a zero Pad into the Pooling2d consuming it.
pub struct FoldPadIntoPooling2d {
    backends: BackendsMap,
}

impl FoldPadIntoPooling2d {
    pub fn new(backends: BackendsMap) -> Self {
        Self { backends }
    }

    fn fused_descriptor(pool: &Pooling2dDescriptor, pad: &PadDescriptor) -> Option<Pooling2dDescriptor> {
        if !pad.is_zero_pad() || pad.pads.len() != 4 {
            return None;
        }
        if pad.pads[0] != (0, 0) || pad.pads[1] != (0, 0) {
            return None;
        }
        let (top, bottom) = pad.pads[2];
        let (left, right) = pad.pads[3];
        let mut fused = pool.clone();
        fused.padding.top += top;
        fused.padding.bottom += bottom;
        fused.padding.left += left;
        fused.padding.right += right;
        if fused.padding_method == PaddingMethod::Exclude {
            fused.padding_method = PaddingMethod::IgnoreValue;
        }
        Some(fused)
    }

    /// The fused descriptor, when every structural condition holds and
    /// the layer's backend accepts it.
    fn fold_candidate(&self, graph: &Graph, id: LayerId) -> Option<Pooling2dDescriptor> {
        let layer = graph.layer(id).ok()?;
        let Descriptor::Pooling2d(pool) = &layer.descriptor else {
            return None;
        };
        let from = graph.producer(InputSlotRef { layer: id, slot: 0 }).ok()??;
        let pad_layer = graph.layer(from.layer).ok()?;
        if pad_layer.kind != LayerType::Pad {
            return None;
        }
        // Another consumer still needs the padded tensor.
        if graph.consumers(from).ok()?.len() != 1 {
            return None;
        }
        let Descriptor::Pad(pad) = &pad_layer.descriptor else {
            return None;
        };
        let fused = Self::fused_descriptor(pool, pad)?;

        let upstream = graph
            .producer(InputSlotRef { layer: from.layer, slot: 0 })
            .ok()??;
        let input_info = graph.output_info(upstream).ok()?;
        let output_info = graph
            .output_info(graph_ir::OutputSlotRef { layer: id, slot: 0 })
            .ok()?;
        let capability = self.backends.get(&layer.backend)?;
        capability
            .is_layer_supported(
                LayerType::Pooling2d,
                &[input_info],
                &[output_info],
                &Descriptor::Pooling2d(fused.clone()),
            )
            .is_supported()
            .then_some(fused)
    }
}

impl RewriteRule for FoldPadIntoPooling2d {
    fn name(&self) -> &str {
        "fold-pad-into-pooling2d"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        self.fold_candidate(graph, id).is_some()
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let fused = self
            .fold_candidate(graph, id)
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let own_input = InputSlotRef { layer: id, slot: 0 };
        let pad_id = graph
            .producer(own_input)?
            .ok_or_else(|| inapplicable(self, graph, id))?
            .layer;
        let upstream = graph
            .producer(InputSlotRef { layer: pad_id, slot: 0 })?
            .ok_or_else(|| inapplicable(self, graph, id))?;

        graph.disconnect(own_input)?;
        graph.connect(upstream, own_input)?;
        graph.prune_layer(pad_id)?;
        graph.layer_mut(id)?.descriptor = Descriptor::Pooling2d(fused);
        Ok(RewriteResult::Rewritten)
    }
}
