// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Constant tensor payloads carried inside the graph.
//!
//! Constant layers and "baked-in" member tensors (convolution weights,
//! biases) own their data here. The precision rewrites replace an `F32`
//! payload with its narrowed form in place.

use half::{bf16, f16};
use tensor_core::float;
use tensor_core::{DType, TensorInfo};

/// Raw constant data, tagged by element type.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ConstantData {
    F32(Vec<f32>),
    F16(Vec<f16>),
    BF16(Vec<bf16>),
    U8(Vec<u8>),
    S32(Vec<i32>),
}

impl ConstantData {
    /// Number of elements in the payload.
    pub fn len(&self) -> usize {
        match self {
            ConstantData::F32(v) => v.len(),
            ConstantData::F16(v) => v.len(),
            ConstantData::BF16(v) => v.len(),
            ConstantData::U8(v) => v.len(),
            ConstantData::S32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element type of the stored payload.
    pub fn dtype(&self) -> DType {
        match self {
            ConstantData::F32(_) => DType::F32,
            ConstantData::F16(_) => DType::F16,
            ConstantData::BF16(_) => DType::BF16,
            ConstantData::U8(_) => DType::QAsymmU8,
            ConstantData::S32(_) => DType::S32,
        }
    }
}

/// A constant tensor: metadata plus owned payload.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConstantTensor {
    pub info: TensorInfo,
    pub data: ConstantData,
}

impl ConstantTensor {
    pub fn new(info: TensorInfo, data: ConstantData) -> Self {
        Self { info, data }
    }

    /// Convenience constructor for an f32 constant.
    pub fn from_f32(info: TensorInfo, values: Vec<f32>) -> Self {
        Self {
            info,
            data: ConstantData::F32(values),
        }
    }

    /// Narrows an `F32` payload to binary16, updating the declared dtype.
    ///
    /// Returns `None` when the payload is not `F32`.
    pub fn to_f16(&self) -> Option<ConstantTensor> {
        match &self.data {
            ConstantData::F32(values) => Some(ConstantTensor {
                info: self.info.with_dtype(DType::F16),
                data: ConstantData::F16(float::convert_f32_slice_to_f16(values)),
            }),
            _ => None,
        }
    }

    /// Narrows an `F32` payload to bfloat16, updating the declared dtype.
    ///
    /// Returns `None` when the payload is not `F32`.
    pub fn to_bf16(&self) -> Option<ConstantTensor> {
        match &self.data {
            ConstantData::F32(values) => Some(ConstantTensor {
                info: self.info.with_dtype(DType::BF16),
                data: ConstantData::BF16(float::convert_f32_slice_to_bf16(values)),
            }),
            _ => None,
        }
    }
}
