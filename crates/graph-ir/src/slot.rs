// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Connection slots and edge metadata.
//!
//! Slots reference their peers by stable `(layer, slot)` ids rather than
//! pointers, so graph mutation never invalidates references held by an
//! in-flight rewrite pass.

use tensor_core::TensorInfo;

/// Identifies a tensor-handle factory registered by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HandleFactoryId(String);

impl HandleFactoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The fallback id used for backends that predate the tensor-handle
    /// factory API. Tensors behind it are always reachable via copy.
    pub fn legacy() -> Self {
        Self("legacy".to_string())
    }

    pub fn is_legacy(&self) -> bool {
        self.0 == "legacy"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandleFactoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for HandleFactoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The decided data-movement policy for one producer→consumer edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EdgeStrategy {
    /// Not yet decided. Never survives partitioning.
    #[default]
    Undefined,
    /// Producer and consumer share a tensor representation; no movement.
    DirectCompatibility,
    /// Producer exports its tensor, consumer imports it (zero-copy).
    ExportToTarget,
    /// An explicit copy layer is required.
    CopyToTarget,
}

impl std::fmt::Display for EdgeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EdgeStrategy::Undefined => "undefined",
            EdgeStrategy::DirectCompatibility => "direct",
            EdgeStrategy::ExportToTarget => "export",
            EdgeStrategy::CopyToTarget => "copy",
        };
        f.write_str(s)
    }
}

/// Addresses one output slot: `(owning layer, slot index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSlotRef {
    pub layer: crate::LayerId,
    pub slot: usize,
}

/// Addresses one input slot: `(owning layer, slot index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputSlotRef {
    pub layer: crate::LayerId,
    pub slot: usize,
}

/// An input connection point. Holds at most one back-reference to the
/// producing output slot; never ownership.
#[derive(Debug, Clone, Default)]
pub struct InputSlot {
    pub connection: Option<OutputSlotRef>,
}

/// An output connection point.
///
/// Owns the produced tensor's [`TensorInfo`], may fan out to many input
/// slots, and, once partitioned, records the chosen handle factory plus
/// one [`EdgeStrategy`] per connection (kept parallel to `connections`).
#[derive(Debug, Clone, Default)]
pub struct OutputSlot {
    pub info: Option<TensorInfo>,
    pub connections: Vec<InputSlotRef>,
    pub strategies: Vec<EdgeStrategy>,
    pub handle_factory: Option<HandleFactoryId>,
}

impl OutputSlot {
    /// Fan-out of this slot.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }
}
