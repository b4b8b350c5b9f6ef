// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merges equal sibling layers hanging off one output slot.
//!
//! Two single-input consumers of the same tensor that perform the same
//! operation with the same parameters produce the same result; one of
//! them suffices. The survivor is the sibling with the lowest guid,
//! which makes the rewrite deterministic regardless of sweep order.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use graph_ir::{Graph, InputSlotRef, LayerId, OutputSlotRef};

/// Deduplicate equal siblings off a shared producer slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquashEqualSiblings;

impl SquashEqualSiblings {
    /// Siblings of `id` (consumers of the same slot) that compute the
    /// same thing. `id` must already have passed the shape checks.
    fn equal_siblings(graph: &Graph, id: LayerId, from: OutputSlotRef) -> Vec<LayerId> {
        let Ok(layer) = graph.layer(id) else {
            return Vec::new();
        };
        let Ok(consumers) = graph.consumers(from) else {
            return Vec::new();
        };
        consumers
            .iter()
            .filter(|c| c.layer != id)
            .filter_map(|c| graph.layer(c.layer).ok().map(|l| (c.layer, l)))
            .filter(|(_, sibling)| {
                sibling.inputs.len() == 1
                    && sibling.kind == layer.kind
                    && sibling.descriptor == layer.descriptor
                    && sibling.backend == layer.backend
            })
            .map(|(sibling_id, _)| sibling_id)
            .collect()
    }

    fn eligible(graph: &Graph, id: LayerId) -> Option<OutputSlotRef> {
        let layer = graph.layer(id).ok()?;
        if layer.inputs.len() != 1 || layer.kind.is_boundary() || layer.kind.is_compatibility() {
            return None;
        }
        graph.producer(InputSlotRef { layer: id, slot: 0 }).ok()?
    }
}

impl RewriteRule for SquashEqualSiblings {
    fn name(&self) -> &str {
        "squash-equal-siblings"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        let Some(from) = Self::eligible(graph, id) else {
            return false;
        };
        let siblings = Self::equal_siblings(graph, id, from);
        if siblings.is_empty() {
            return false;
        }
        // One application per group: the lowest guid survives and does
        // the merging.
        let own_guid = match graph.layer(id) {
            Ok(l) => l.guid,
            Err(_) => return false,
        };
        siblings
            .iter()
            .filter_map(|&s| graph.layer(s).ok())
            .all(|l| l.guid > own_guid)
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let from = Self::eligible(graph, id).ok_or_else(|| inapplicable(self, graph, id))?;
        let survivor_out = OutputSlotRef { layer: id, slot: 0 };
        for loser in Self::equal_siblings(graph, id, from) {
            graph.substitute_producer(OutputSlotRef { layer: loser, slot: 0 }, survivor_out)?;
            graph.prune_layer(loser)?;
        }
        Ok(RewriteResult::Rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Optimizer;
    use graph_ir::descriptor::{
        ActivationDescriptor, ActivationFunction, PermuteDescriptor, ReshapeDescriptor,
    };
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

    fn relu(alpha: f32) -> Descriptor {
        Descriptor::Activation(ActivationDescriptor {
            function: ActivationFunction::BoundedReLu,
            alpha,
            beta: 0.0,
        })
    }

    fn run(g: &mut Graph) -> usize {
        let rules: Vec<Box<dyn RewriteRule>> = vec![Box::new(SquashEqualSiblings)];
        Optimizer::run(g, &rules).unwrap().rewrites
    }

    /// One input fanned out to `n` equal activations, each feeding its
    /// own output.
    fn fan(n: usize, descriptors: &[Descriptor]) -> (Graph, LayerId, Vec<LayerId>) {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[1, 8]));
        let mut acts = Vec::new();
        for i in 0..n {
            let act = g.add_layer(
                LayerType::Activation,
                format!("act.{i}"),
                descriptors[i % descriptors.len()].clone(),
            );
            let output = g.add_output(i as i32);
            g.connect(out(input), inp(act)).unwrap();
            g.connect(out(act), inp(output)).unwrap();
            g.set_output_info(out(act), info(&[1, 8])).unwrap();
            acts.push(act);
        }
        (g, input, acts)
    }

    #[test]
    fn test_five_equal_siblings_keep_one() {
        let (mut g, input, acts) = fan(5, &[relu(6.0)]);
        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();

        // Only the first activation (lowest guid) remains.
        assert!(g.contains(acts[0]));
        for &a in &acts[1..] {
            assert!(!g.contains(a));
        }
        assert_eq!(g.consumers(out(input)).unwrap().len(), 1);
        // All five outputs now read the survivor.
        assert_eq!(g.consumers(out(acts[0])).unwrap().len(), 5);
    }

    #[test]
    fn test_mixed_sibling_kinds_squash_within_kind() {
        // Input fans out to two equal Permutes, two equal Reshapes,
        // and one Floor; each feeds its own output.
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[2, 3, 4]));
        let mut siblings = Vec::new();
        for i in 0..2 {
            let permute = g.add_layer(
                LayerType::Permute,
                format!("permute.{i}"),
                Descriptor::Permute(PermuteDescriptor::new(vec![0, 2, 1])),
            );
            g.set_output_info(out(permute), info(&[2, 4, 3])).unwrap();
            siblings.push(permute);
        }
        for i in 0..2 {
            let reshape = g.add_layer(
                LayerType::Reshape,
                format!("reshape.{i}"),
                Descriptor::Reshape(ReshapeDescriptor {
                    target_shape: Shape::from(&[4, 6][..]),
                }),
            );
            g.set_output_info(out(reshape), info(&[4, 6])).unwrap();
            siblings.push(reshape);
        }
        let floor = g.add_layer(LayerType::Floor, "floor", Descriptor::None);
        g.set_output_info(out(floor), info(&[2, 3, 4])).unwrap();
        siblings.push(floor);
        for (i, &sibling) in siblings.iter().enumerate() {
            let output = g.add_output(i as i32);
            g.connect(out(input), inp(sibling)).unwrap();
            g.connect(out(sibling), inp(output)).unwrap();
        }

        // One merge per duplicated kind.
        assert_eq!(run(&mut g), 2);
        g.validate().unwrap();
        assert!(g.contains(siblings[0]) && !g.contains(siblings[1]));
        assert!(g.contains(siblings[2]) && !g.contains(siblings[3]));
        assert!(g.contains(floor));
        assert_eq!(g.consumers(out(input)).unwrap().len(), 3);
        // Each survivor picked up its twin's consumer, the floor kept
        // its own.
        assert_eq!(g.consumers(out(siblings[0])).unwrap().len(), 2);
        assert_eq!(g.consumers(out(siblings[2])).unwrap().len(), 2);
        assert_eq!(g.consumers(out(floor)).unwrap().len(), 1);
    }

    #[test]
    fn test_different_descriptors_not_squashed() {
        let (mut g, input, acts) = fan(2, &[relu(6.0), relu(1.0)]);
        assert_eq!(run(&mut g), 0);
        assert!(g.contains(acts[0]) && g.contains(acts[1]));
        assert_eq!(g.consumers(out(input)).unwrap().len(), 2);
    }

    #[test]
    fn test_siblings_of_different_producers_untouched() {
        let mut g = Graph::new();
        let a = g.add_input(0, info(&[4]));
        let b = g.add_input(1, info(&[4]));
        let act_a = g.add_layer(LayerType::Activation, "act.a", relu(6.0));
        let act_b = g.add_layer(LayerType::Activation, "act.b", relu(6.0));
        let o1 = g.add_output(0);
        let o2 = g.add_output(1);
        g.connect(out(a), inp(act_a)).unwrap();
        g.connect(out(b), inp(act_b)).unwrap();
        g.connect(out(act_a), inp(o1)).unwrap();
        g.connect(out(act_b), inp(o2)).unwrap();
        g.set_output_info(out(act_a), info(&[4])).unwrap();
        g.set_output_info(out(act_b), info(&[4])).unwrap();

        assert_eq!(run(&mut g), 0);
        assert_eq!(g.num_layers(), 6);
    }
}
