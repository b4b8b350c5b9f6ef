// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Builds a memory plan for one backend of a partitioned graph.
//!
//! The plan walks the execution order, derives a lifetime block for
//! every intermediate tensor the backend produces, hands the blocks to
//! a packing strategy, and lowers the resulting bins into the
//! [`BufferStorage`] form the memory manager consumes:
//!
//! ```text
//!   topological order ──► MemBlock per tensor ──► strategy.optimize
//!                                                       │
//!   MemoryManager ◄── BufferStorage per bin ◄── validate_bins
//! ```
//!
//! Graph inputs and outputs are owned by the caller and never planned.
//! Constant tensors are treated as live for the whole run, so no
//! strategy can recycle their bytes.

use std::collections::{HashMap, HashSet};

use graph_ir::{BackendId, LayerId, OutputSlotRef};
use partition_planner::PartitionedGraph;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::block::{validate_bins, MemBlock};
use crate::error::MemoryPlanError;
use crate::manager::{BufferStorage, TensorMemory};
use crate::strategy::MemBlockStrategy;

/// Summary of a built plan, suitable for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReport {
    /// Strategy that produced the plan.
    pub strategy: String,
    /// Number of packed bins, one buffer each.
    pub bins: usize,
    /// Sum of all tensor sizes, the cost without any packing.
    pub total_bytes: usize,
    /// Sum of the packed buffer sizes, the cost actually paid.
    pub peak_bytes: usize,
}

/// The packed layout of one backend's intermediate tensors.
#[derive(Debug, Clone)]
pub struct MemoryPlan {
    backend: BackendId,
    buffers: Vec<BufferStorage>,
    tensors: Vec<OutputSlotRef>,
    report: MemoryReport,
}

impl MemoryPlan {
    /// Plans the intermediate tensors of `backend` using `strategy`.
    ///
    /// A tensor's lifetime runs from its producer's position in the
    /// topological order to its last consumer's position. Backends
    /// absent from the partitioning produce an empty plan.
    pub fn build(
        partitioned: &PartitionedGraph,
        backend: &BackendId,
        strategy: &dyn MemBlockStrategy,
    ) -> Result<Self, MemoryPlanError> {
        let graph = partitioned.graph();
        let order = graph.topological_sort()?;
        let step_of: HashMap<LayerId, usize> =
            order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let owned: HashSet<LayerId> = partitioned
            .partitions()
            .iter()
            .filter(|p| &p.backend == backend)
            .flat_map(|p| p.layers.iter().copied())
            .collect();
        let last_step = order.len().saturating_sub(1);

        let mut blocks = Vec::new();
        let mut tensors = Vec::new();
        for &id in &order {
            if !owned.contains(&id) {
                continue;
            }
            let layer = graph.layer(id)?;
            if layer.kind.is_boundary() {
                continue;
            }
            let permanent = layer.constant.is_some();
            for slot in 0..layer.outputs.len() {
                let from = OutputSlotRef { layer: id, slot };
                let info = graph.output_info(from)?;
                let born = step_of[&id];
                let died = graph
                    .consumers(from)?
                    .iter()
                    .filter_map(|to| step_of.get(&to.layer).copied())
                    .max()
                    .unwrap_or(born);
                let (start, end) = if permanent { (0, last_step) } else { (born, died) };
                blocks.push(MemBlock::new(start, end, info.size_bytes(), tensors.len()));
                tensors.push(from);
            }
        }

        let total_bytes: usize = blocks.iter().map(|b| b.size_bytes).sum();
        let bins = strategy.optimize(blocks)?;
        validate_bins(&bins)?;

        let buffers: Vec<BufferStorage> = bins
            .iter()
            .map(|bin| BufferStorage {
                tensor_memories: bin
                    .blocks
                    .iter()
                    .map(|block| TensorMemory::new(block.offset, block.index))
                    .collect(),
                buffer_size: bin.buffer_size(),
                handle: None,
            })
            .collect();
        let report = MemoryReport {
            strategy: strategy.name().to_string(),
            bins: buffers.len(),
            total_bytes,
            peak_bytes: buffers.iter().map(|b| b.buffer_size).sum(),
        };
        info!(
            backend = backend.as_str(),
            strategy = report.strategy,
            tensors = tensors.len(),
            total_bytes = report.total_bytes,
            peak_bytes = report.peak_bytes,
            "built memory plan"
        );
        Ok(Self {
            backend: backend.clone(),
            buffers,
            tensors,
            report,
        })
    }

    pub fn backend(&self) -> &BackendId {
        &self.backend
    }

    pub fn buffers(&self) -> &[BufferStorage] {
        &self.buffers
    }

    /// Consumes the plan, yielding buffers ready for
    /// [`MemoryManager::store_mem_to_allocate`](crate::MemoryManager::store_mem_to_allocate).
    pub fn into_buffers(self) -> Vec<BufferStorage> {
        self.buffers
    }

    /// The output slot a `tensor_id` refers to.
    pub fn tensor_slot(&self, tensor_id: usize) -> Option<OutputSlotRef> {
        self.tensors.get(tensor_id).copied()
    }

    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    pub fn report(&self) -> &MemoryReport {
        &self.report
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use backend_registry::{
        BackendCapability, BackendRegistry, HandleFactoryRegistry, LayerSupport,
    };
    use graph_ir::{ConstantTensor, Descriptor, Graph, HandleFactoryId, InputSlotRef, LayerType};
    use partition_planner::partition;
    use tensor_core::{DType, Shape, TensorInfo};

    use super::*;
    use crate::packing::{ConstantMemoryStrategy, IntervalPackingStrategy};

    struct OpenBackend {
        id: BackendId,
    }

    impl BackendCapability for OpenBackend {
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
            LayerSupport::Supported
        }

        fn handle_factory_preferences(&self) -> Vec<HandleFactoryId> {
            Vec::new()
        }

        fn register_tensor_handle_factories(&self, _registry: &mut HandleFactoryRegistry) {}
    }

    fn registry_with(ids: &[&str]) -> BackendRegistry {
        let registry = BackendRegistry::new();
        for id in ids {
            let backend = BackendId::from(*id);
            registry
                .register(
                    backend.clone(),
                    Arc::new(move || {
                        Ok(Arc::new(OpenBackend {
                            id: backend.clone(),
                        }) as Arc<dyn BackendCapability>)
                    }),
                )
                .unwrap();
        }
        registry
    }

    fn element_info(elements: usize) -> TensorInfo {
        TensorInfo::new(Shape::from(&[1, elements][..]), DType::F32)
    }

    /// Input -> n activations on "cpu" -> Output, all tensors 64 bytes.
    fn cpu_chain(n: usize) -> PartitionedGraph {
        let mut g = Graph::new();
        let info = element_info(16);
        let mut prev = g.add_input(0, info.clone());
        for i in 0..n {
            let act = g.add_layer(LayerType::Activation, format!("act.{i}"), Descriptor::None);
            g.connect(
                OutputSlotRef { layer: prev, slot: 0 },
                InputSlotRef { layer: act, slot: 0 },
            )
            .unwrap();
            g.set_output_info(OutputSlotRef { layer: act, slot: 0 }, info.clone())
                .unwrap();
            g.layer_mut(act).unwrap().backend = BackendId::from("cpu");
            prev = act;
        }
        let output = g.add_output(0);
        g.connect(
            OutputSlotRef { layer: prev, slot: 0 },
            InputSlotRef { layer: output, slot: 0 },
        )
        .unwrap();
        partition(g, &registry_with(&["cpu"]), false).unwrap()
    }

    #[test]
    fn test_boundary_tensors_are_not_planned() {
        let partitioned = cpu_chain(2);
        let plan = MemoryPlan::build(
            &partitioned,
            &BackendId::from("cpu"),
            &ConstantMemoryStrategy,
        )
        .unwrap();
        // Only the two activation outputs; the input's tensor belongs
        // to the caller.
        assert_eq!(plan.num_tensors(), 2);
        assert_eq!(plan.report().total_bytes, 128);
        for tensor_id in 0..plan.num_tensors() {
            let slot = plan.tensor_slot(tensor_id).unwrap();
            let layer = partitioned.graph().layer(slot.layer).unwrap();
            assert!(!layer.kind.is_boundary());
        }
    }

    #[test]
    fn test_interval_packing_beats_constant_packing_on_a_chain() {
        let partitioned = cpu_chain(4);
        let backend = BackendId::from("cpu");
        let constant =
            MemoryPlan::build(&partitioned, &backend, &ConstantMemoryStrategy).unwrap();
        let interval =
            MemoryPlan::build(&partitioned, &backend, &IntervalPackingStrategy).unwrap();

        assert_eq!(constant.report().total_bytes, 256);
        assert_eq!(constant.report().peak_bytes, 256);
        // A chain only ever has two tensors live at once, so interval
        // packing folds four tensors into two slots.
        assert_eq!(interval.report().total_bytes, 256);
        assert_eq!(interval.report().peak_bytes, 128);
    }

    #[test]
    fn test_constant_tensors_stay_live_for_the_whole_run() {
        // Input ──► Addition ──► Activation ──► Output
        // Constant ──┘ (also feeds nothing later, but must survive
        // until the end regardless)
        let mut g = Graph::new();
        let info = element_info(16);
        let input = g.add_input(0, info.clone());
        let weights =
            ConstantTensor::from_f32(info.clone(), vec![1.0; 16]);
        let constant = g.add_constant("bias", weights);
        let add = g.add_layer(LayerType::Addition, "add", Descriptor::None);
        let act = g.add_layer(LayerType::Activation, "act", Descriptor::None);
        let output = g.add_output(0);
        g.connect(
            OutputSlotRef { layer: input, slot: 0 },
            InputSlotRef { layer: add, slot: 0 },
        )
        .unwrap();
        g.connect(
            OutputSlotRef { layer: constant, slot: 0 },
            InputSlotRef { layer: add, slot: 1 },
        )
        .unwrap();
        g.set_output_info(OutputSlotRef { layer: add, slot: 0 }, info.clone())
            .unwrap();
        g.connect(
            OutputSlotRef { layer: add, slot: 0 },
            InputSlotRef { layer: act, slot: 0 },
        )
        .unwrap();
        g.set_output_info(OutputSlotRef { layer: act, slot: 0 }, info.clone())
            .unwrap();
        g.connect(
            OutputSlotRef { layer: act, slot: 0 },
            InputSlotRef { layer: output, slot: 0 },
        )
        .unwrap();
        for id in [add, act] {
            g.layer_mut(id).unwrap().backend = BackendId::from("cpu");
        }

        let partitioned = partition(g, &registry_with(&["cpu"]), false).unwrap();
        let backend = BackendId::from("cpu");
        let plan =
            MemoryPlan::build(&partitioned, &backend, &IntervalPackingStrategy).unwrap();

        // Constant + two intermediates. The constant overlaps every
        // lifetime, so nothing shares its bytes and the peak covers it
        // plus the two concurrently live intermediates.
        assert_eq!(plan.num_tensors(), 3);
        assert_eq!(plan.report().peak_bytes, 192);
    }

    #[test]
    fn test_unknown_backend_yields_empty_plan() {
        let partitioned = cpu_chain(2);
        let plan = MemoryPlan::build(
            &partitioned,
            &BackendId::from("npu"),
            &IntervalPackingStrategy,
        )
        .unwrap();
        assert_eq!(plan.num_tensors(), 0);
        assert!(plan.buffers().is_empty());
        assert_eq!(plan.report().peak_bytes, 0);
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let partitioned = cpu_chain(3);
        let plan = MemoryPlan::build(
            &partitioned,
            &BackendId::from("cpu"),
            &IntervalPackingStrategy,
        )
        .unwrap();
        let encoded = serde_json::to_string(plan.report()).unwrap();
        let decoded: MemoryReport = serde_json::from_str(&encoded).unwrap();
        assert_eq!(&decoded, plan.report());
    }
}
