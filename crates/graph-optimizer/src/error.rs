// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the rewrite engine.

use graph_ir::GraphError;
use tensor_core::TensorError;

/// Errors surfaced while rewriting a graph.
///
/// `RuleNotApplicable` indicates a bug in a rule's applicability check,
/// not a property of the input graph; the engine only calls `apply`
/// after `is_applicable` returned `true`.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("rewrite '{rule}' applied to layer '{layer}' it does not match")]
    RuleNotApplicable { rule: String, layer: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
