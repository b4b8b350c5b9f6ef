// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor metadata types shared by every stage of the graph compiler.
//!
//! This crate provides:
//! - [`Shape`]: resolved tensor dimensions with permutation support.
//! - [`DType`]: element data types, including the quantized formats.
//! - [`QuantizationInfo`] / [`TensorInfo`]: the full per-tensor
//!   description carried on graph output slots.
//! - [`float`]: binary16/bfloat16 conversion for the constant
//!   precision rewrites.
//!
//! No tensor *data* lives here: the compiler manipulates metadata, and
//! the only payloads it touches (constant weights) are owned by the
//! graph IR. Clean error types via `thiserror`.

mod dtype;
mod error;
pub mod float;
mod shape;
mod tensor_info;

pub use dtype::DType;
pub use error::TensorError;
pub use shape::Shape;
pub use tensor_info::{QuantizationInfo, TensorInfo};
