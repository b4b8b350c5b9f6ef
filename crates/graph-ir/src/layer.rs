// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer definitions: the nodes of the dataflow graph.

use crate::constant::ConstantTensor;
use crate::descriptor::Descriptor;
use crate::slot::{InputSlot, OutputSlot};
use tensor_core::DType;

/// An opaque, stable identifier naming a backend.
///
/// The empty id means "not yet assigned"; partitioning requires every
/// layer to carry a non-empty id.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` once a real backend has been assigned.
    pub fn is_assigned(&self) -> bool {
        !self.0.is_empty()
    }
}

impl From<&str> for BackendId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of operation a layer performs.
///
/// This is a closed tag: rewrite rules and partitioning match on it
/// exhaustively, so front-ends cannot introduce kinds the compiler has
/// never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    /// Graph input, bound to an externally visible numeric id.
    Input,
    /// Graph output, bound to an externally visible numeric id.
    Output,
    /// Constant-producing layer owning its payload.
    Constant,
    Activation,
    Addition,
    Multiplication,
    Floor,
    FakeQuantization,
    Permute,
    Transpose,
    Reshape,
    Convolution2d,
    DepthwiseConvolution2d,
    FullyConnected,
    Pad,
    Pooling2d,
    /// Compatibility layer: explicit copy across a backend boundary.
    MemCopy,
    /// Compatibility layer: zero-copy import across a backend boundary.
    MemImport,
}

impl LayerType {
    /// Layers that change the physical data layout (the subjects of the
    /// layout-hoist rewrite).
    pub fn is_layout_changing(self) -> bool {
        matches!(self, LayerType::Permute | LayerType::Transpose)
    }

    /// Layers whose semantics are unaffected by the data layout, so a
    /// layout change may move past them.
    pub fn is_layout_agnostic(self) -> bool {
        matches!(
            self,
            LayerType::Activation
                | LayerType::Addition
                | LayerType::Multiplication
                | LayerType::Floor
                | LayerType::FakeQuantization
                | LayerType::MemCopy
        )
    }

    /// Graph boundary layers carrying binding ids.
    pub fn is_boundary(self) -> bool {
        matches!(self, LayerType::Input | LayerType::Output)
    }

    /// Automatically inserted copy/import layers.
    pub fn is_compatibility(self) -> bool {
        matches!(self, LayerType::MemCopy | LayerType::MemImport)
    }

    /// Layers that can hold weights/bias as internal members instead of
    /// reading them through a graph edge.
    pub fn has_member_tensors(self) -> bool {
        matches!(
            self,
            LayerType::Convolution2d
                | LayerType::DepthwiseConvolution2d
                | LayerType::FullyConnected
        )
    }

    /// Whether a layer of this kind accepts operands of the given
    /// element type. Used by the constant precision rewrites: a constant
    /// may only be narrowed when every consumer accepts the narrow type.
    pub fn accepts_dtype(self, dtype: DType) -> bool {
        match self {
            // Fake quantization inspects full f32 ranges.
            LayerType::FakeQuantization => dtype == DType::F32,
            // Floor is defined for the float types only.
            LayerType::Floor => dtype.is_float(),
            _ => true,
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Input => "input",
            LayerType::Output => "output",
            LayerType::Constant => "constant",
            LayerType::Activation => "activation",
            LayerType::Addition => "addition",
            LayerType::Multiplication => "multiplication",
            LayerType::Floor => "floor",
            LayerType::FakeQuantization => "fake_quantization",
            LayerType::Permute => "permute",
            LayerType::Transpose => "transpose",
            LayerType::Reshape => "reshape",
            LayerType::Convolution2d => "convolution2d",
            LayerType::DepthwiseConvolution2d => "depthwise_convolution2d",
            LayerType::FullyConnected => "fully_connected",
            LayerType::Pad => "pad",
            LayerType::Pooling2d => "pooling2d",
            LayerType::MemCopy => "mem_copy",
            LayerType::MemImport => "mem_import",
        }
    }

    /// Number of input slots a fresh layer of this kind gets.
    ///
    /// Member-capable kinds take their weight/bias operands through
    /// edges until the member-redirection rewrite bakes them in, so the
    /// count depends on the descriptor's `has_bias`.
    pub(crate) fn input_slot_count(self, descriptor: &Descriptor) -> usize {
        match self {
            LayerType::Input | LayerType::Constant => 0,
            LayerType::Addition | LayerType::Multiplication => 2,
            LayerType::Convolution2d => match descriptor {
                Descriptor::Convolution2d(d) if d.has_bias => 3,
                _ => 2,
            },
            LayerType::DepthwiseConvolution2d => match descriptor {
                Descriptor::DepthwiseConvolution2d(d) if d.has_bias => 3,
                _ => 2,
            },
            LayerType::FullyConnected => match descriptor {
                Descriptor::FullyConnected(d) if d.has_bias => 3,
                _ => 2,
            },
            _ => 1,
        }
    }

    /// Number of output slots a fresh layer of this kind gets.
    pub(crate) fn output_slot_count(self) -> usize {
        match self {
            LayerType::Output => 0,
            _ => 1,
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the graph: one operation with its parameters, connection
/// slots, backend assignment, and (for constants and member-capable
/// layers) owned payloads.
///
/// Layers are owned by the [`crate::Graph`] arena and referenced by
/// [`crate::LayerId`]; they never hold pointers to each other.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub kind: LayerType,
    pub descriptor: Descriptor,
    pub backend: BackendId,
    /// Stable, graph-unique id assigned at creation, never reused.
    pub guid: u64,
    /// External binding id for Input/Output layers.
    pub binding_id: Option<i32>,
    pub inputs: Vec<InputSlot>,
    pub outputs: Vec<OutputSlot>,
    /// Payload of a `Constant` layer.
    pub constant: Option<ConstantTensor>,
    /// Baked-in weights for member-capable layers.
    pub weights: Option<ConstantTensor>,
    /// Baked-in bias for member-capable layers.
    pub bias: Option<ConstantTensor>,
}

impl Layer {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: LayerType,
        descriptor: Descriptor,
        guid: u64,
    ) -> Self {
        let num_inputs = kind.input_slot_count(&descriptor);
        let num_outputs = kind.output_slot_count();
        Self {
            name: name.into(),
            kind,
            descriptor,
            backend: BackendId::default(),
            guid,
            binding_id: None,
            inputs: vec![InputSlot::default(); num_inputs],
            outputs: vec![OutputSlot::default(); num_outputs],
            constant: None,
            weights: None,
            bias: None,
        }
    }

    /// One-line summary used by `Graph`'s `Display` impl and diagnostics.
    pub fn summary(&self) -> String {
        let backend = if self.backend.is_assigned() {
            format!(" @{}", self.backend)
        } else {
            String::new()
        };
        format!(
            "{} '{}' ({} in, {} out){backend}",
            self.kind,
            self.name,
            self.inputs.len(),
            self.outputs.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Convolution2dDescriptor;
    use crate::descriptor::Padding2d;

    #[test]
    fn test_slot_counts() {
        let conv = Descriptor::Convolution2d(Convolution2dDescriptor {
            stride: (1, 1),
            dilation: (1, 1),
            padding: Padding2d::default(),
            has_bias: true,
        });
        assert_eq!(LayerType::Convolution2d.input_slot_count(&conv), 3);
        assert_eq!(LayerType::Addition.input_slot_count(&Descriptor::None), 2);
        assert_eq!(LayerType::Input.input_slot_count(&Descriptor::None), 0);
        assert_eq!(LayerType::Output.output_slot_count(), 0);
    }

    #[test]
    fn test_layout_classification() {
        assert!(LayerType::Permute.is_layout_changing());
        assert!(LayerType::Transpose.is_layout_changing());
        assert!(LayerType::Floor.is_layout_agnostic());
        assert!(!LayerType::Pooling2d.is_layout_agnostic());
        assert!(!LayerType::Reshape.is_layout_agnostic());
    }

    #[test]
    fn test_accepts_dtype() {
        assert!(LayerType::Activation.accepts_dtype(DType::F16));
        assert!(LayerType::FakeQuantization.accepts_dtype(DType::F32));
        assert!(!LayerType::FakeQuantization.accepts_dtype(DType::F16));
        assert!(!LayerType::Floor.accepts_dtype(DType::S32));
    }

    #[test]
    fn test_backend_id() {
        let id = BackendId::from("CpuRef");
        assert!(id.is_assigned());
        assert_eq!(id.as_str(), "CpuRef");
        assert!(!BackendId::default().is_assigned());
    }
}
