// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`RewriteRule`] trait and the fixpoint [`Optimizer`] runner.

use crate::OptimizerError;
use graph_ir::{Graph, LayerId};

/// Outcome of one rule application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteResult {
    /// The rule decided against rewriting after a closer look.
    Unchanged,
    /// The graph was mutated.
    Rewritten,
}

/// A local graph-to-graph rewrite.
///
/// Rules are purely structural: no I/O, and no backend calls beyond
/// the capability queries a rule was constructed with.
///
/// The engine only calls [`RewriteRule::apply`] on a layer for which
/// [`RewriteRule::is_applicable`] returned `true` against the current
/// graph. An application must preserve the meaning of the graph and the
/// `TensorInfo` of every bound input and output, and must make progress:
/// repeated sweeps of the same catalogue have to reach a fixpoint.
pub trait RewriteRule {
    /// Human-readable name of this rule.
    fn name(&self) -> &str;

    /// Whether this rule matches the layer `id` in its current context.
    fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool;

    /// Rewrites the graph around layer `id`.
    fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError>;
}

/// Counters reported by one [`Optimizer::run`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Sweeps over the graph, including the final all-quiet one.
    pub sweeps: usize,
    /// Total rewrites applied across all sweeps.
    pub rewrites: usize,
}

/// Runs a rule catalogue to fixpoint.
#[derive(Debug, Default)]
pub struct Optimizer;

impl Optimizer {
    /// Applies `rules` to `graph` in repeated sweeps until one full
    /// sweep makes no rewrite.
    ///
    /// Each sweep walks a fresh topological snapshot; layers a rule
    /// prunes mid-sweep are skipped, layers a rule inserts are seen by
    /// the following sweep.
    pub fn run(
        graph: &mut Graph,
        rules: &[Box<dyn RewriteRule>],
    ) -> Result<OptimizeStats, OptimizerError> {
        let mut stats = OptimizeStats::default();
        loop {
            stats.sweeps += 1;
            let mut sweep_rewrites = 0usize;
            let order = graph.topological_sort()?;
            for rule in rules {
                for &id in &order {
                    if !graph.contains(id) {
                        continue;
                    }
                    if !rule.is_applicable(graph, id) {
                        continue;
                    }
                    if rule.apply(graph, id)? == RewriteResult::Rewritten {
                        tracing::debug!(rule = rule.name(), layer = %id, "applied rewrite");
                        sweep_rewrites += 1;
                    }
                }
            }
            stats.rewrites += sweep_rewrites;
            if sweep_rewrites == 0 {
                break;
            }
        }
        tracing::debug!(
            sweeps = stats.sweeps,
            rewrites = stats.rewrites,
            "optimizer reached fixpoint"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_ir::{Descriptor, LayerType};
    use tensor_core::{DType, Shape, TensorInfo};

    /// Prunes `Floor` layers by splicing them out of their edge.
    struct DropFloor;

    impl RewriteRule for DropFloor {
        fn name(&self) -> &str {
            "drop-floor"
        }

        fn is_applicable(&self, graph: &Graph, id: LayerId) -> bool {
            graph
                .layer(id)
                .map(|l| l.kind == LayerType::Floor)
                .unwrap_or(false)
        }

        fn apply(&self, graph: &mut Graph, id: LayerId) -> Result<RewriteResult, OptimizerError> {
            let input = graph_ir::InputSlotRef { layer: id, slot: 0 };
            let from = graph.disconnect(input)?;
            graph.substitute_producer(graph_ir::OutputSlotRef { layer: id, slot: 0 }, from)?;
            graph.prune_layer(id)?;
            Ok(RewriteResult::Rewritten)
        }
    }

    fn chain_of_floors(n: usize) -> Graph {
        let mut g = Graph::new();
        let info = TensorInfo::new(Shape::vector(8), DType::F32);
        let mut prev = g.add_input(0, info.clone());
        for i in 0..n {
            let f = g.add_layer(LayerType::Floor, format!("floor.{i}"), Descriptor::None);
            g.connect(
                graph_ir::OutputSlotRef { layer: prev, slot: 0 },
                graph_ir::InputSlotRef { layer: f, slot: 0 },
            )
            .unwrap();
            g.set_output_info(graph_ir::OutputSlotRef { layer: f, slot: 0 }, info.clone())
                .unwrap();
            prev = f;
        }
        let out = g.add_output(0);
        g.connect(
            graph_ir::OutputSlotRef { layer: prev, slot: 0 },
            graph_ir::InputSlotRef { layer: out, slot: 0 },
        )
        .unwrap();
        g
    }

    #[test]
    fn test_runs_to_fixpoint() {
        let mut g = chain_of_floors(3);
        let rules: Vec<Box<dyn RewriteRule>> = vec![Box::new(DropFloor)];
        let stats = Optimizer::run(&mut g, &rules).unwrap();
        assert_eq!(stats.rewrites, 3);
        assert_eq!(g.num_layers(), 2);
        g.validate().unwrap();
    }

    #[test]
    fn test_quiet_graph_takes_one_sweep() {
        let mut g = chain_of_floors(0);
        let rules: Vec<Box<dyn RewriteRule>> = vec![Box::new(DropFloor)];
        let stats = Optimizer::run(&mut g, &rules).unwrap();
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.rewrites, 0);
    }

    #[test]
    fn test_empty_catalogue_is_a_noop() {
        let mut g = chain_of_floors(2);
        let stats = Optimizer::run(&mut g, &[]).unwrap();
        assert_eq!(stats.rewrites, 0);
        assert_eq!(g.num_layers(), 4);
    }
}
