// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for partitioning.

use backend_registry::BackendUnavailable;
use graph_ir::{BackendId, GraphError};

/// Errors surfaced while partitioning a graph across backends.
///
/// All are fatal to the partition attempt; the input graph ownership is
/// consumed but no registry state is disturbed.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// A backend named by a layer assignment failed to construct.
    #[error(transparent)]
    BackendUnavailable(#[from] BackendUnavailable),

    /// A backend named by a layer assignment was never registered.
    #[error("backend '{backend}' named by layer assignments is not registered")]
    UnknownBackend { backend: BackendId },

    /// The assigned backend rejected a layer. There is no fallback:
    /// assignment decisions belong to the caller.
    #[error("layer '{layer_name}' (#{layer_index}) not supported on backend '{backend}': {reason}")]
    UnsupportedLayer {
        layer_name: String,
        layer_index: usize,
        backend: BackendId,
        reason: String,
    },

    /// An edge ended partitioning without a data-movement strategy.
    #[error("no data-movement strategy decided for edge {producer} -> {consumer}")]
    UndefinedEdge { producer: String, consumer: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
