// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Narrows f32 constant payloads to binary16 or bfloat16.
//!
//! A constant may only change element type when every consumer can take
//! the narrower type; the check goes through
//! [`LayerType::accepts_dtype`], so e.g. a constant feeding a
//! FakeQuantization layer is never narrowed.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use graph_ir::{ConstantTensor, Graph, LayerId, LayerType, OutputSlotRef};
use tensor_core::DType;

fn convertible(graph: &Graph, id: LayerId, target: DType) -> bool {
    let Ok(layer) = graph.layer(id) else {
        return false;
    };
    if layer.kind != LayerType::Constant {
        return false;
    }
    let Some(constant) = &layer.constant else {
        return false;
    };
    if constant.data.dtype() != DType::F32 {
        return false;
    }
    let from = OutputSlotRef { layer: id, slot: 0 };
    let Ok(consumers) = graph.consumers(from) else {
        return false;
    };
    consumers.iter().all(|c| {
        graph
            .layer(c.layer)
            .map(|l| l.kind.accepts_dtype(target))
            .unwrap_or(false)
    })
}

fn narrow(
    rule: &dyn RewriteRule,
    graph: &mut Graph,
    id: LayerId,
    convert: impl Fn(&ConstantTensor) -> Option<ConstantTensor>,
) -> Result<RewriteResult, OptimizerError> {
    let narrowed = graph
        .layer(id)?
        .constant
        .as_ref()
        .and_then(&convert)
        .ok_or_else(|| inapplicable(rule, graph, id))?;
    let info = narrowed.info.clone();
    graph.layer_mut(id)?.constant = Some(narrowed);
    graph.set_output_info(OutputSlotRef { layer: id, slot: 0 }, info)?;
    Ok(RewriteResult::Rewritten)
}

/// Narrow f32 constants to binary16.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertConstantsFloat32ToFloat16;

impl RewriteRule for ConvertConstantsFloat32ToFloat16 {
    fn name(&self) -> &str {
        "convert-constants-fp32-to-fp16"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        convertible(graph, id, DType::F16)
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        narrow(self, graph, id, ConstantTensor::to_f16)
    }
}

/// Narrow f32 constants to bfloat16.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertConstantsFloat32ToBFloat16;

impl RewriteRule for ConvertConstantsFloat32ToBFloat16 {
    fn name(&self) -> &str {
        "convert-constants-fp32-to-bf16"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        convertible(graph, id, DType::BF16)
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        narrow(self, graph, id, ConstantTensor::to_bf16)
    }
}
