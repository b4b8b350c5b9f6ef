// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph construction and mutation.

use crate::LayerId;

/// Errors that can occur while building or rewriting a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A layer id refers to a pruned or never-created layer.
    #[error("layer {0} not found in graph")]
    LayerNotFound(LayerId),

    /// A slot index is out of range for the named layer.
    #[error("layer '{layer}' has no {kind} slot {slot}")]
    SlotOutOfRange {
        layer: String,
        kind: &'static str,
        slot: usize,
    },

    /// An input slot already holds a connection.
    #[error("input slot {slot} of layer '{layer}' is already connected")]
    AlreadyConnected { layer: String, slot: usize },

    /// An input slot that was expected to be connected is not.
    #[error("input slot {slot} of layer '{layer}' is not connected")]
    NotConnected { layer: String, slot: usize },

    /// The graph contains a cycle and cannot be topologically sorted.
    #[error("graph contains a cycle")]
    CycleDetected,

    /// An output slot is missing its tensor description.
    #[error("output slot {slot} of layer '{layer}' has no tensor info")]
    MissingTensorInfo { layer: String, slot: usize },

    /// Attempted to erase a layer that still has live connections.
    #[error("cannot erase layer '{layer}': it still has connected slots")]
    LayerStillConnected { layer: String },

    /// Two inputs of an elementwise layer have incompatible shapes.
    #[error("layer '{layer}': input shapes {lhs} and {rhs} are not broadcast-compatible")]
    IncompatibleInputs {
        layer: String,
        lhs: tensor_core::Shape,
        rhs: tensor_core::Shape,
    },

    /// An underlying tensor-metadata operation failed.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
