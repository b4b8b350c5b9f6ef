// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collapses chained Reshape layers.
//!
//! Two back-to-back reshapes compose into one targeting the final
//! shape; a chain of any length collapses pairwise across sweeps. When
//! the final target equals the shape arriving from upstream the whole
//! chain is an identity and both layers vanish.

use crate::rules::inapplicable;
use crate::{OptimizerError, RewriteResult, RewriteRule};
use graph_ir::descriptor::ReshapeDescriptor;
use graph_ir::{Descriptor, Graph, InputSlotRef, LayerId, LayerType, OutputSlotRef};

/// Merge consecutive single-consumer Reshape layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseConsecutiveReshapes;

impl RewriteRule for CollapseConsecutiveReshapes {
    fn name(&self) -> &str {
        "collapse-consecutive-reshapes"
    }

    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
        let Ok(layer) = graph.layer(id) else {
            return false;
        };
        if layer.kind != LayerType::Reshape {
            return false;
        }
        let Ok(Some(from)) = graph.producer(InputSlotRef { layer: id, slot: 0 }) else {
            return false;
        };
        let Ok(parent) = graph.layer(from.layer) else {
            return false;
        };
        // The parent reshape must feed this layer exclusively; another
        // consumer still needs the intermediate shape.
        parent.kind == LayerType::Reshape
            && matches!(graph.consumers(from), Ok(c) if c.len() == 1)
    }

    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
        let target = match &graph.layer(id)?.descriptor {
            Descriptor::Reshape(d) => d.target_shape.clone(),
            _ => return Err(inapplicable(self, graph, id)),
        };
        let own_input = InputSlotRef { layer: id, slot: 0 };
        let own_output = OutputSlotRef { layer: id, slot: 0 };
        let from = graph
            .producer(own_input)?
            .ok_or_else(|| inapplicable(self, graph, id))?;
        let parent_id = from.layer;
        let upstream = graph
            .producer(InputSlotRef { layer: parent_id, slot: 0 })?
            .ok_or_else(|| inapplicable(self, graph, id))?;

        if graph.output_info(upstream)?.shape == target {
            // Identity chain: drop both reshapes.
            graph.disconnect(own_input)?;
            graph.substitute_producer(own_output, upstream)?;
            graph.prune_layer(id)?;
            graph.prune_layer(parent_id)?;
            return Ok(RewriteResult::Rewritten);
        }

        // Retarget the parent to the final shape and splice this layer
        // out of the chain.
        let retargeted = graph.output_info(from)?.reshaped(target.clone())?;
        graph.set_output_info(from, retargeted)?;
        graph.layer_mut(parent_id)?.descriptor =
            Descriptor::Reshape(ReshapeDescriptor { target_shape: target });
        graph.disconnect(own_input)?;
        graph.substitute_producer(own_output, from)?;
        graph.prune_layer(id)?;
        Ok(RewriteResult::Rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Optimizer;
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

    fn reshape(g: &mut Graph, name: &str, dims: &[usize]) -> LayerId {
        g.add_layer(
            LayerType::Reshape,
            name,
            Descriptor::Reshape(ReshapeDescriptor {
                target_shape: Shape::from(dims),
            }),
        )
    }

    /// Input -> reshape(a) -> reshape(b) -> Output.
    fn chain(input_dims: &[usize], a: &[usize], b: &[usize]) -> (Graph, LayerId, LayerId, LayerId) {
        let mut g = Graph::new();
        let input = g.add_input(0, info(input_dims));
        let r1 = reshape(&mut g, "r1", a);
        let r2 = reshape(&mut g, "r2", b);
        let output = g.add_output(0);
        g.connect(out(input), inp(r1)).unwrap();
        g.connect(out(r1), inp(r2)).unwrap();
        g.connect(out(r2), inp(output)).unwrap();
        g.set_output_info(out(r1), info(a)).unwrap();
        g.set_output_info(out(r2), info(b)).unwrap();
        (g, input, r1, output)
    }

    fn run(g: &mut Graph) -> usize {
        let rules: Vec<Box<dyn RewriteRule>> = vec![Box::new(CollapseConsecutiveReshapes)];
        Optimizer::run(g, &rules).unwrap().rewrites
    }

    #[test]
    fn test_two_reshapes_become_one() {
        let (mut g, _, r1, output) = chain(&[2, 6], &[3, 4], &[12]);
        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();

        assert_eq!(g.num_layers(), 3);
        assert_eq!(g.producer(inp(output)).unwrap(), Some(out(r1)));
        assert_eq!(g.output_info(out(r1)).unwrap().shape.dims(), &[12]);
        match &g.layer(r1).unwrap().descriptor {
            Descriptor::Reshape(d) => assert_eq!(d.target_shape.dims(), &[12]),
            other => panic!("unexpected descriptor: {other:?}"),
        }
    }

    #[test]
    fn test_identity_chain_vanishes() {
        let (mut g, input, _, output) = chain(&[2, 6], &[3, 4], &[2, 6]);
        assert_eq!(run(&mut g), 1);
        g.validate().unwrap();

        assert_eq!(g.num_layers(), 2);
        assert_eq!(g.producer(inp(output)).unwrap(), Some(out(input)));
    }

    #[test]
    fn test_long_chain_collapses_fully() {
        let mut g = Graph::new();
        let input = g.add_input(0, info(&[24]));
        let shapes: [&[usize]; 4] = [&[2, 12], &[4, 6], &[8, 3], &[24, 1]];
        let mut prev = input;
        for (i, dims) in shapes.iter().enumerate() {
            let r = reshape(&mut g, &format!("r{i}"), dims);
            g.connect(out(prev), inp(r)).unwrap();
            g.set_output_info(out(r), info(dims)).unwrap();
            prev = r;
        }
        let output = g.add_output(0);
        g.connect(out(prev), inp(output)).unwrap();

        assert_eq!(run(&mut g), 3);
        g.validate().unwrap();
        assert_eq!(g.num_layers(), 3);
        let survivor = g.producer(inp(output)).unwrap().unwrap();
        assert_eq!(g.output_info(survivor).unwrap().shape.dims(), &[24, 1]);
    }

    #[test]
    fn test_fan_out_blocks_collapse() {
        let (mut g, _, r1, _) = chain(&[2, 6], &[3, 4], &[12]);
        // A second consumer of the intermediate shape pins r1.
        let floor = g.add_layer(LayerType::Floor, "floor", Descriptor::None);
        let o2 = g.add_output(1);
        g.connect(out(r1), inp(floor)).unwrap();
        g.connect(out(floor), inp(o2)).unwrap();
        g.set_output_info(out(floor), info(&[3, 4])).unwrap();

        assert_eq!(run(&mut g), 0);
        assert_eq!(g.num_layers(), 6);
    }
}
