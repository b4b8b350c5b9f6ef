// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hoists layout changes (Permute, Transpose) toward the graph inputs.
//!
//! A layout change sitting after a layout-agnostic layer commutes with
//! it, so the change can move onto the layer's inputs instead. Repeated
//! sweeps float layout changes up until they hit a layout-sensitive
//! layer, a fan-out, or a graph input; changes that meet their own
//! inverse on the way cancel outright. Clustering layout changes near
//! the inputs gives the sibling-squash rule the chance to merge the
//! duplicates this creates.

use crate::rules::{applied_mapping, compose_to_identity, inapplicable, permuted_info};
use crate::{OptimizerError, RewriteResult, RewriteRule};
use graph_ir::{Graph, InputSlotRef, LayerId, OutputSlotRef};

/// Hoist Permute/Transpose past layout-agnostic producers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveLayoutChangesUp;

impl RewriteRule for MoveLayoutChangesUp {
    fn name(&self) -> &str {
        "move-layout-changes-up"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        let Ok(layer) = graph.layer(id) else {
            return false;
        };
        if !layer.kind.is_layout_changing() {
            return false;
        }
        let Some(mapping) = applied_mapping(&layer.descriptor) else {
            return false;
        };
        let Ok(Some(from)) = graph.producer(InputSlotRef { layer: id, slot: 0 }) else {
            return false;
        };
        let Ok(parent) = graph.layer(from.layer) else {
            return false;
        };
        // The hoist rewrites the parent's output; any sibling consumer
        // would observe the layout change too.
        match graph.consumers(from) {
            Ok(consumers) if consumers.len() == 1 => {}
            _ => return false,
        }

        if parent.kind.is_layout_changing() {
            // Inverse pairs cancel; anything else stays put.
            return applied_mapping(&parent.descriptor)
                .map(|parent_mapping| compose_to_identity(&parent_mapping, &mapping))
                .unwrap_or(false);
        }

        if !parent.kind.is_layout_agnostic() {
            return false;
        }
        // Every parent operand must carry the shape the layout change was
        // written against, otherwise the replicated change is ill-formed
        // (broadcast operands, rank mismatch).
        let Ok(parent_out) = graph.output_info(from) else {
            return false;
        };
        if mapping.as_slice().len() != parent_out.shape.rank() {
            return false;
        }
        (0..parent.inputs.len()).all(|slot| {
            graph
                .producer(InputSlotRef { layer: from.layer, slot })
                .ok()
                .flatten()
                .and_then(|p| graph.output_info(p).ok())
                .map(|info| info.shape == parent_out.shape)
                .unwrap_or(false)
        })
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let (kind, descriptor, name) = {
            let layer = graph.layer(id)?;
            (layer.kind, layer.descriptor.clone(), layer.name.clone())
        };
        let own_input = InputSlotRef { layer: id, slot: 0 };
        let own_output = OutputSlotRef { layer: id, slot: 0 };
        let from = graph
            .producer(own_input)?
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let parent_id = from.layer;
        let parent_kind = graph.layer(parent_id)?.kind;

        if parent_kind.is_layout_changing() {
            // Inverse pair: bypass both layers and drop them.
            let parent_input = InputSlotRef { layer: parent_id, slot: 0 };
            let upstream = graph
                .producer(parent_input)?
                .ok_or_else(|| inapplicable(self, graph, id))?;
            graph.disconnect(own_input)?;
            graph.substitute_producer(own_output, upstream)?;
            graph.prune_layer(id)?;
            graph.prune_layer(parent_id)?;
            return Ok(RewriteResult::Rewritten);
        }

        // Detach the layout change and hand its consumers to the parent,
        // which now produces data in the hoisted layout.
        graph.disconnect(own_input)?;
        graph.substitute_producer(own_output, from)?;
        graph.prune_layer(id)?;
        let hoisted = permuted_info(&graph.output_info(from)?, &descriptor)?;
        graph.set_output_info(from, hoisted)?;

        // Replicate the change onto every parent operand.
        let num_inputs = graph.layer(parent_id)?.inputs.len();
        for slot in 0..num_inputs {
            let to = InputSlotRef { layer: parent_id, slot };
            let clone = graph.insert_before(to, kind, format!("{name}:in{slot}"), descriptor.clone())?;
            let clone_out = OutputSlotRef { layer: clone, slot: 0 };
            let input_info = graph.output_info(clone_out)?;
            graph.set_output_info(clone_out, permuted_info(&input_info, &descriptor)?)?;
        }
        Ok(RewriteResult::Rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Optimizer;
    use graph_ir::descriptor::PermuteDescriptor;
    use graph_ir::{Descriptor, LayerType};
    use tensor_core::{DType, Shape, TensorInfo};

    fn info(dims: &[usize]) -> TensorInfo {
        TensorInfo::new(Shape::from(dims), DType::F32)
    }

    fn out(layer: LayerId) -> OutputSlotRef {
        OutputSlotRef { layer, slot: 0 }
    }

    fn inp(layer: LayerId) -> InputSlotRef {
        InputSlotRef { layer, slot: 0 }
    }

    fn permute(g: &mut Graph, name: &str, mapping: Vec<usize>) -> LayerId {
        g.add_layer(
            LayerType::Permute,
            name,
            Descriptor::Permute(PermuteDescriptor::new(mapping)),
        )
    }

    fn run(g: &mut Graph) -> usize {
        let rules: Vec<Box<dyn RewriteRule>> = vec![Box::new(MoveLayoutChangesUp)];
        Optimizer::run(g, &rules).unwrap().rewrites
    }

    #[test]
    fn test_hoists_past_activation() {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[2, 3, 4]));
        let act = g.add_layer(LayerType::Activation, "act", Descriptor::None);
        let perm = permute(&mut g, "perm", vec![2, 0, 1]);
        let output = g.add_output(0);
        g.connect(out(input), inp(act)).unwrap();
        g.connect(out(act), inp(perm)).unwrap();
        g.connect(out(perm), inp(output)).unwrap();
        g.set_output_info(out(act), info(&[2, 3, 4])).unwrap();
        g.set_output_info(out(perm), info(&[3, 4, 2])).unwrap();

        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();

        // Output now reads the activation directly, in permuted layout.
        assert_eq!(g.producer(inp(output)).unwrap(), Some(out(act)));
        assert_eq!(g.output_info(out(act)).unwrap().shape.dims(), &[3, 4, 2]);
        // The permute moved above the activation.
        let moved = g.producer(inp(act)).unwrap().unwrap();
        assert_eq!(g.layer(moved.layer).unwrap().kind, LayerType::Permute);
        assert_eq!(g.producer(inp(moved.layer)).unwrap(), Some(out(input)));
    }

    #[test]
    fn test_duplicates_onto_both_addition_operands() {
        let mut g = Graph::new();
        let a = g.add_input(0, info(&[2, 3]));
        let b = g.add_input(1, info(&[2, 3]));
        let add = g.add_layer(LayerType::Addition, "add", Descriptor::None);
        let perm = permute(&mut g, "perm", vec![1, 0]);
        let output = g.add_output(0);
        g.connect(out(a), InputSlotRef { layer: add, slot: 0 }).unwrap();
        g.connect(out(b), InputSlotRef { layer: add, slot: 1 }).unwrap();
        g.connect(out(add), inp(perm)).unwrap();
        g.connect(out(perm), inp(output)).unwrap();
        g.set_output_info(out(add), info(&[2, 3])).unwrap();
        g.set_output_info(out(perm), info(&[3, 2])).unwrap();

        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();

        for slot in 0..2 {
            let moved = g
                .producer(InputSlotRef { layer: add, slot })
                .unwrap()
                .unwrap();
            let layer = g.layer(moved.layer).unwrap();
            assert_eq!(layer.kind, LayerType::Permute);
            assert_eq!(g.output_info(moved).unwrap().shape.dims(), &[3, 2]);
        }
        assert_eq!(g.output_info(out(add)).unwrap().shape.dims(), &[3, 2]);
    }

    #[test]
    fn test_inverse_pair_cancels() {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[2, 3, 4]));
        let first = permute(&mut g, "first", vec![2, 0, 1]);
        let second = permute(&mut g, "second", vec![1, 2, 0]);
        let output = g.add_output(0);
        g.connect(out(input), inp(first)).unwrap();
        g.connect(out(first), inp(second)).unwrap();
        g.connect(out(second), inp(output)).unwrap();
        g.set_output_info(out(first), info(&[3, 4, 2])).unwrap();
        g.set_output_info(out(second), info(&[2, 3, 4])).unwrap();

        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();
        assert_eq!(g.num_layers(), 2);
        assert_eq!(g.producer(inp(output)).unwrap(), Some(out(input)));
    }

    #[test]
    fn test_stops_at_layout_sensitive_layers() {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[12]));
        let reshape = g.add_layer(
            LayerType::Reshape,
            "reshape",
            Descriptor::Reshape(graph_ir::descriptor::ReshapeDescriptor {
                target_shape: Shape::from(&[3, 4][..]),
            }),
        );
        let perm = permute(&mut g, "perm", vec![1, 0]);
        let output = g.add_output(0);
        g.connect(out(input), inp(reshape)).unwrap();
        g.connect(out(reshape), inp(perm)).unwrap();
        g.connect(out(perm), inp(output)).unwrap();
        g.set_output_info(out(reshape), info(&[3, 4])).unwrap();
        g.set_output_info(out(perm), info(&[4, 3])).unwrap();

        assert_eq!(run(&mut g), 0);
        assert_eq!(g.producer(inp(perm)).unwrap(), Some(out(reshape)));
    }

    #[test]
    fn test_stops_at_fan_out() {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[2, 3]));
        let act = g.add_layer(LayerType::Activation, "act", Descriptor::None);
        let perm = permute(&mut g, "perm", vec![1, 0]);
        let floor = g.add_layer(LayerType::Floor, "floor", Descriptor::None);
        let o1 = g.add_output(0);
        let o2 = g.add_output(1);
        g.connect(out(input), inp(act)).unwrap();
        g.connect(out(act), inp(perm)).unwrap();
        g.connect(out(act), inp(floor)).unwrap();
        g.connect(out(perm), inp(o1)).unwrap();
        g.connect(out(floor), inp(o2)).unwrap();
        g.set_output_info(out(act), info(&[2, 3])).unwrap();
        g.set_output_info(out(perm), info(&[3, 2])).unwrap();
        g.set_output_info(out(floor), info(&[2, 3])).unwrap();

        assert_eq!(run(&mut g), 0);
        assert_eq!(g.producer(inp(perm)).unwrap(), Some(out(act)));
    }
}
