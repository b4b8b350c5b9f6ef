// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The capability interface every backend implements.
//!
//! The compiler consumes this interface and never implements it: each
//! backend ships its own implementation and registers a constructor with
//! the [`crate::BackendRegistry`]. Queries are pure with respect to the
//! graph; a capability object must answer `is_layer_supported` without
//! mutating anything.

use crate::handle::HandleFactoryRegistry;
use graph_ir::descriptor::PermutationVector;
use graph_ir::{BackendId, Descriptor, HandleFactoryId, LayerType};
use std::collections::HashMap;
use std::sync::Arc;
use tensor_core::TensorInfo;

/// Result of a layer-support query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSupport {
    Supported,
    NotSupported {
        /// Human-readable reason, surfaced verbatim in diagnostics.
        reason: String,
    },
}

impl LayerSupport {
    /// Convenience constructor for a rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        LayerSupport::NotSupported {
            reason: reason.into(),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, LayerSupport::Supported)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            LayerSupport::Supported => None,
            LayerSupport::NotSupported { reason } => Some(reason),
        }
    }
}

/// Opaque token for a constructed workload factory, handed to the
/// external execution engine together with the partitioned graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadFactoryHandle {
    backend: BackendId,
}

impl WorkloadFactoryHandle {
    pub fn new(backend: BackendId) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &BackendId {
        &self.backend
    }
}

/// The per-backend capability object.
///
/// Implementations live outside this core; the compiler only queries
/// them. All methods must be callable from any thread.
pub trait BackendCapability: Send + Sync {
    /// The id this capability was registered under.
    fn backend_id(&self) -> BackendId;

    /// Whether this backend can execute a layer of the given kind with
    /// the given operand descriptions and parameters.
    fn is_layer_supported(
        &self,
        kind: LayerType,
        inputs: &[TensorInfo],
        outputs: &[TensorInfo],
        descriptor: &Descriptor,
    ) -> LayerSupport;

    /// Constructs the workload factory token for the execution engine.
    fn create_workload_factory(&self) -> WorkloadFactoryHandle {
        WorkloadFactoryHandle::new(self.backend_id())
    }

    /// The backend's tensor-handle factories, most preferred first.
    /// An empty list means the backend predates the factory API and is
    /// reachable only through the legacy copy path.
    fn handle_factory_preferences(&self) -> Vec<HandleFactoryId>;

    /// Whether the backend participates in the tensor-handle factory
    /// negotiation at all. Derived from the preference list.
    fn supports_tensor_allocator_api(&self) -> bool {
        !self.handle_factory_preferences().is_empty()
    }

    /// Describes this backend's handle factories to the shared registry
    /// built before partitioning.
    fn register_tensor_handle_factories(&self, registry: &mut HandleFactoryRegistry);

    /// The weight-dimension order this backend's depth-multiplied
    /// convolution kernels expect, when it differs from the graph's
    /// declared layout. `None` means the declared layout is fine.
    fn preferred_depthwise_weight_order(&self) -> Option<PermutationVector> {
        None
    }

    /// Name of the packing strategy the memory planner should use for
    /// this backend's intermediate tensors. `None` means the backend
    /// brings its own tensor storage and is not planned. A registry
    /// association set through
    /// [`BackendRegistry::set_memory_strategy`](crate::BackendRegistry::set_memory_strategy)
    /// takes precedence over this.
    fn memory_strategy_name(&self) -> Option<&str> {
        None
    }
}

impl std::fmt::Debug for dyn BackendCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCapability")
            .field("backend_id", &self.backend_id())
            .finish_non_exhaustive()
    }
}

/// Resolved capabilities for every backend appearing in a graph.
pub type BackendsMap = HashMap<BackendId, Arc<dyn BackendCapability>>;
