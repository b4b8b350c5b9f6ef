// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! The backend-agnostic dataflow graph the compiler rewrites and
//! partitions.
//!
//! - [`Graph`]: an arena of [`Layer`]s connected through slots; layers
//!   are addressed by stable [`LayerId`]s, edges by
//!   [`OutputSlotRef`]/[`InputSlotRef`] pairs.
//! - [`LayerType`]: the closed set of operation kinds, with
//!   classification helpers (layout-agnostic, boundary, compatibility).
//! - [`Descriptor`]: per-operation parameters, compared exactly.
//! - [`ConstantTensor`]: owned weight/bias payloads.
//! - [`EdgeStrategy`] / [`HandleFactoryId`]: per-edge partitioning
//!   results written back into the graph.
//!
//! The arena-and-index design keeps rewrite passes simple: passes
//! snapshot ids, decide against the immutable view, then apply mutations
//! through [`Graph::connect`], [`Graph::insert_before`],
//! [`Graph::substitute_producer`], and [`Graph::prune_layer`].

mod constant;
pub mod descriptor;
mod error;
mod graph;
mod layer;
mod slot;

pub use constant::{ConstantData, ConstantTensor};
pub use descriptor::Descriptor;
pub use error::GraphError;
pub use graph::{Graph, LayerId};
pub use layer::{BackendId, Layer, LayerType};
pub use slot::{EdgeStrategy, HandleFactoryId, InputSlot, InputSlotRef, OutputSlot, OutputSlotRef};
