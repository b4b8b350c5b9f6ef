// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # partition-planner
//!
//! Splits an optimized graph across backends.
//!
//! The planner never chooses backends; layers arrive with assignments
//! and any backend that cannot honor its assignment fails the whole
//! partition. What the planner does decide is how tensors cross backend
//! boundaries: it negotiates a tensor-handle factory for every output
//! slot, marks each edge direct / zero-copy export / explicit copy, and
//! materializes the non-direct edges as MemCopy/MemImport layers.
//!
//! Entry point: [`partition`]. The phases are exported individually for
//! callers that need to interleave their own steps.

pub mod backends;
pub mod compatibility;
mod error;
pub mod selection;

mod plan;
#[cfg(test)]
pub(crate) mod testing;

pub use backends::{resolve_backends, validate_backend_support};
pub use compatibility::add_compatibility_layers;
pub use error::PartitionError;
pub use plan::{partition, BackendPartition, PartitionedGraph};
pub use selection::select_handle_factories;
