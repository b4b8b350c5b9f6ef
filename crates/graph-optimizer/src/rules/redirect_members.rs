// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bakes constant weight/bias operands into member tensors.
//!
//! Workload factories for the member-capable layers (convolutions,
//! fully-connected) read weights from the layer itself rather than
//! through an input edge. This rule copies a directly-connected
//! Constant producer's payload into the member fields. The edges stay:
//! downstream tooling still sees where the data came from, and a
//! constant shared with other consumers must keep producing.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use graph_ir::{ConstantTensor, Graph, InputSlotRef, LayerId};

const WEIGHT_SLOT: usize = 1;
const BIAS_SLOT: usize = 2;

/// Copy constant weight/bias inputs into layer members.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectMembersToConstantInputs;

impl RedirectMembersToConstantInputs {
    /// The payload of the Constant layer feeding `slot`, if any.
    fn constant_operand(graph: &Graph, id: LayerId, slot: usize) -> Option<ConstantTensor> {
        let from = graph.producer(InputSlotRef { layer: id, slot }).ok()??;
        graph.layer(from.layer).ok()?.constant.clone()
    }
}

impl RewriteRule for RedirectMembersToConstantInputs {
    fn name(&self) -> &str {
        "redirect-members-to-constant-inputs"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        let Ok(layer) = graph.layer(id) else {
            return false;
        };
        layer.kind.has_member_tensors()
            && layer.weights.is_none()
            && Self::constant_operand(graph, id, WEIGHT_SLOT).is_some()
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let weights = Self::constant_operand(graph, id, WEIGHT_SLOT)
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let bias = if graph.layer(id)?.inputs.len() > BIAS_SLOT {
            Self::constant_operand(graph, id, BIAS_SLOT)
        } else {
            None
        };
        let layer = graph.layer_mut(id)?;
        layer.weights = Some(weights);
        layer.bias = bias;
        Ok(RewriteResult::Rewritten)
    }
}
