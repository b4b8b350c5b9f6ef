// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor metadata operations.

use crate::Shape;

/// Errors that can occur while manipulating tensor metadata.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A reshape target does not preserve the element count.
    #[error("cannot reshape {from} ({from_elements} elements) to {to} ({to_elements} elements)")]
    ElementCountMismatch {
        from: Shape,
        from_elements: usize,
        to: Shape,
        to_elements: usize,
    },

    /// A permutation mapping does not match the shape it is applied to.
    #[error("invalid permutation {mapping:?} for rank-{rank} shape")]
    InvalidPermutation { mapping: Vec<usize>, rank: usize },
}
