// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # backend-registry
//!
//! The capability-negotiation surface between the compiler and
//! independently implemented hardware backends.
//!
//! - [`BackendCapability`]: the per-backend interface: layer-support
//!   queries, handle-factory preferences, workload-factory construction.
//!   Consumed, never implemented, by this workspace.
//! - [`BackendRegistry`]: process-wide id→factory map with an explicit
//!   register/deregister lifecycle; safe to use from multiple threads
//!   loading networks concurrently. Factory invocation is fallible
//!   ([`BackendUnavailable`]) and runs outside the registry lock.
//! - [`TensorHandleFactory`] / [`HandleFactoryRegistry`]: the storage
//!   capabilities (map/unmap, export/import masks) partitioning matches
//!   against each other.
//! - [`Allocator`]: the collaborator interface the memory planner
//!   drives for backends without native tensor storage.

mod allocator;
mod capability;
mod error;
mod handle;
mod registry;

pub use allocator::{AllocationHandle, Allocator, AllocatorError, MemoryRegion};
pub use capability::{BackendCapability, BackendsMap, LayerSupport, WorkloadFactoryHandle};
pub use error::{BackendUnavailable, RegistryError};
pub use handle::{HandleFactoryRegistry, TensorHandleFactory};
pub use registry::{BackendFactory, BackendRegistry};
