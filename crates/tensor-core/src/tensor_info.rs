// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor metadata: shape, element type, quantization, constant-ness.

use crate::{DType, Shape, TensorError};

/// Linear quantization parameters for the quantized [`DType`]s.
///
/// A real value `r` maps to a stored value `q` as `q = r / scale + offset`.
/// For float tensors the parameters are present but inert (scale 1, offset
/// 0), matching how the front-ends populate them.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuantizationInfo {
    pub scale: f32,
    pub offset: i32,
}

impl QuantizationInfo {
    pub fn new(scale: f32, offset: i32) -> Self {
        Self { scale, offset }
    }
}

impl Default for QuantizationInfo {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0,
        }
    }
}

/// Everything the compiler knows about one tensor: its shape, element
/// type, quantization parameters, and whether its contents are constant.
///
/// A `TensorInfo` lives on the output slot that produces the tensor and
/// is copied, never recomputed, onto compatibility layers spliced into an
/// edge.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorInfo {
    pub shape: Shape,
    pub dtype: DType,
    pub quantization: QuantizationInfo,
    /// Set when the producing layer's output never changes between
    /// inferences (constant weights, baked-in parameters).
    pub constant: bool,
}

impl TensorInfo {
    /// Creates a non-constant, unquantized tensor description.
    pub fn new(shape: Shape, dtype: DType) -> Self {
        Self {
            shape,
            dtype,
            quantization: QuantizationInfo::default(),
            constant: false,
        }
    }

    /// Marks this tensor as constant.
    pub fn as_constant(mut self) -> Self {
        self.constant = true;
        self
    }

    /// Attaches quantization parameters.
    pub fn with_quantization(mut self, quantization: QuantizationInfo) -> Self {
        self.quantization = quantization;
        self
    }

    /// Returns a copy of this info with a different element type.
    ///
    /// Used by the precision-conversion rewrites, which change the dtype
    /// but leave shape and constant-ness intact.
    pub fn with_dtype(&self, dtype: DType) -> Self {
        Self {
            shape: self.shape.clone(),
            dtype,
            quantization: self.quantization,
            constant: self.constant,
        }
    }

    /// Returns a copy of this info with a new shape, checking that the
    /// element count is preserved.
    pub fn reshaped(&self, shape: Shape) -> Result<Self, TensorError> {
        if shape.num_elements() != self.shape.num_elements() {
            return Err(TensorError::ElementCountMismatch {
                from: self.shape.clone(),
                from_elements: self.shape.num_elements(),
                to: shape.clone(),
                to_elements: shape.num_elements(),
            });
        }
        Ok(Self {
            shape,
            dtype: self.dtype,
            quantization: self.quantization,
            constant: self.constant,
        })
    }

    /// Memory footprint of the tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }
}

impl std::fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.dtype, self.shape)?;
        if self.constant {
            write!(f, " (const)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        let info = TensorInfo::new(Shape::new(vec![2, 3, 4]), DType::F32);
        assert_eq!(info.size_bytes(), 96);
        assert_eq!(info.with_dtype(DType::F16).size_bytes(), 48);
    }

    #[test]
    fn test_with_dtype_preserves_shape_and_constness() {
        let info = TensorInfo::new(Shape::matrix(3, 4), DType::F32).as_constant();
        let half = info.with_dtype(DType::F16);
        assert_eq!(half.shape, info.shape);
        assert!(half.constant);
        assert_eq!(half.dtype, DType::F16);
    }

    #[test]
    fn test_reshaped_ok() {
        let info = TensorInfo::new(Shape::new(vec![2, 6]), DType::F32);
        let r = info.reshaped(Shape::new(vec![3, 4])).unwrap();
        assert_eq!(r.shape.dims(), &[3, 4]);
        assert_eq!(r.dtype, DType::F32);
    }

    #[test]
    fn test_reshaped_rejects_element_mismatch() {
        let info = TensorInfo::new(Shape::new(vec![2, 6]), DType::F32);
        assert!(info.reshaped(Shape::new(vec![5, 5])).is_err());
    }

    #[test]
    fn test_quantization_default() {
        let q = QuantizationInfo::default();
        assert_eq!(q.scale, 1.0);
        assert_eq!(q.offset, 0);
    }

    #[test]
    fn test_display() {
        let info = TensorInfo::new(Shape::matrix(2, 2), DType::BF16).as_constant();
        assert_eq!(format!("{info}"), "bf16 [2, 2] (const)");
    }
}
