// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-operation parameter descriptors.
//!
//! Every layer carries a [`Descriptor`] holding the parameters of its
//! operation. Descriptors compare with `PartialEq`, and floating-point
//! members compare **exactly**: the sibling-squash and pad-fold rewrites
//! must only treat two layers as interchangeable when their parameters
//! are bit-identical, so no epsilon tolerance is applied.

use tensor_core::{Shape, TensorError};

/// A permutation of tensor dimensions.
///
/// `mapping[i]` is the destination position of source dimension `i`
/// (`dst[mapping[i]] = src[i]`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermutationVector(pub Vec<usize>);

impl PermutationVector {
    pub fn new(mapping: Vec<usize>) -> Self {
        Self(mapping)
    }

    /// Returns `true` when the mapping leaves every dimension in place.
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &m)| i == m)
    }

    /// Returns the inverse mapping.
    ///
    /// Assumes `self` is a valid permutation; positions outside the range
    /// are reported by [`Shape::permuted`] when the mapping is applied.
    pub fn inverse(&self) -> PermutationVector {
        let mut inv = vec![0usize; self.0.len()];
        for (i, &m) in self.0.iter().enumerate() {
            if m < inv.len() {
                inv[m] = i;
            }
        }
        PermutationVector(inv)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

/// Activation functions supported by the `Activation` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActivationFunction {
    ReLu,
    BoundedReLu,
    TanH,
    Sigmoid,
    LeakyReLu,
}

/// Parameters of an `Activation` layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ActivationDescriptor {
    pub function: ActivationFunction,
    /// Upper bound for `BoundedReLu`, slope for `LeakyReLu`.
    pub alpha: f32,
    /// Lower bound for `BoundedReLu`.
    pub beta: f32,
}

/// Parameters of a `Permute` layer: `dst[mapping[i]] = src[i]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PermuteDescriptor {
    pub mapping: PermutationVector,
    /// Set when the permute feeds from a constant and a later
    /// constant-folding pass may evaluate it at compile time.
    pub fold_into_constant: bool,
}

impl PermuteDescriptor {
    pub fn new(mapping: Vec<usize>) -> Self {
        Self {
            mapping: PermutationVector::new(mapping),
            fold_into_constant: false,
        }
    }

    /// Shape of the permuted output for a given input shape.
    pub fn output_shape(&self, input: &Shape) -> Result<Shape, TensorError> {
        input.permuted(self.mapping.as_slice())
    }
}

/// Parameters of a `Transpose` layer: `dst[i] = src[mapping[i]]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransposeDescriptor {
    pub mapping: PermutationVector,
}

impl TransposeDescriptor {
    pub fn new(mapping: Vec<usize>) -> Self {
        Self {
            mapping: PermutationVector::new(mapping),
        }
    }

    /// Shape of the transposed output for a given input shape.
    pub fn output_shape(&self, input: &Shape) -> Result<Shape, TensorError> {
        // Transpose indexes sources by destination, which is the inverse
        // of the permute convention.
        input.permuted(self.mapping.inverse().as_slice())
    }
}

/// Parameters of a `Reshape` layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReshapeDescriptor {
    pub target_shape: Shape,
}

/// Explicit spatial padding amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Padding2d {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

/// Parameters of a `Convolution2d` layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Convolution2dDescriptor {
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
    pub padding: Padding2d,
    pub has_bias: bool,
}

/// Parameters of a `DepthwiseConvolution2d` layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthwiseConvolution2dDescriptor {
    pub stride: (usize, usize),
    pub dilation: (usize, usize),
    pub padding: Padding2d,
    pub depth_multiplier: usize,
    pub has_bias: bool,
}

/// Parameters of a `FullyConnected` layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FullyConnectedDescriptor {
    pub has_bias: bool,
    pub transpose_weight_matrix: bool,
}

/// Pooling algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PoolingAlgorithm {
    Max,
    Average,
    L2,
}

/// How a pooling kernel treats padded border elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PaddingMethod {
    /// Padded values participate in the reduction as real data.
    IgnoreValue,
    /// Padded values are excluded from the reduction.
    Exclude,
}

/// Parameters of a `Pooling2d` layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pooling2dDescriptor {
    pub algorithm: PoolingAlgorithm,
    pub pool_size: (usize, usize),
    pub stride: (usize, usize),
    pub padding: Padding2d,
    pub padding_method: PaddingMethod,
}

/// Parameters of a `Pad` layer: per-dimension (before, after) counts and
/// the injected value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PadDescriptor {
    pub pads: Vec<(usize, usize)>,
    pub value: f32,
}

impl PadDescriptor {
    /// Returns `true` when the injected value is exactly zero, the only
    /// form the pad-fold rewrite may fuse.
    pub fn is_zero_pad(&self) -> bool {
        self.value == 0.0
    }

    /// Shape of the padded output for a given input shape.
    pub fn output_shape(&self, input: &Shape) -> Shape {
        let dims = input
            .dims()
            .iter()
            .zip(&self.pads)
            .map(|(&d, &(before, after))| d + before + after)
            .collect();
        Shape::new(dims)
    }
}

/// Parameters of a `FakeQuantization` layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FakeQuantizationDescriptor {
    pub min: f32,
    pub max: f32,
}

/// The polymorphic parameter block attached to every layer.
///
/// Layers without parameters (Floor, Addition, MemCopy, ...) carry
/// [`Descriptor::None`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Descriptor {
    None,
    Activation(ActivationDescriptor),
    Permute(PermuteDescriptor),
    Transpose(TransposeDescriptor),
    Reshape(ReshapeDescriptor),
    Convolution2d(Convolution2dDescriptor),
    DepthwiseConvolution2d(DepthwiseConvolution2dDescriptor),
    FullyConnected(FullyConnectedDescriptor),
    Pooling2d(Pooling2dDescriptor),
    Pad(PadDescriptor),
    FakeQuantization(FakeQuantizationDescriptor),
}
