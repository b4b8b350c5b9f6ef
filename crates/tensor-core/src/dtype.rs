// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

/// Enumerates the element types a tensor described by a
/// [`crate::TensorInfo`] can hold.
///
/// The compiler uses `DType` to size memory buffers, to decide which
/// precision-conversion rewrites apply, and to ask backends whether they
/// support a layer at a given precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 16-bit brain floating point.
    BF16,
    /// 8-bit asymmetric unsigned quantized.
    QAsymmU8,
    /// 8-bit asymmetric signed quantized.
    QAsymmS8,
    /// 8-bit symmetric signed quantized.
    QSymmS8,
    /// 16-bit symmetric signed quantized.
    QSymmS16,
    /// 32-bit signed integer (bias tensors, shape data).
    S32,
    /// Boolean, stored one byte per element.
    Boolean,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 | DType::S32 => 4,
            DType::F16 | DType::BF16 | DType::QSymmS16 => 2,
            DType::QAsymmU8 | DType::QAsymmS8 | DType::QSymmS8 | DType::Boolean => 1,
        }
    }

    /// Returns `true` for the quantized integer types.
    pub fn is_quantized(self) -> bool {
        matches!(
            self,
            DType::QAsymmU8 | DType::QAsymmS8 | DType::QSymmS8 | DType::QSymmS16
        )
    }

    /// Returns `true` for the floating-point types.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F16 | DType::BF16)
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::QAsymmU8 => "qasymmu8",
            DType::QAsymmS8 => "qasymms8",
            DType::QSymmS8 => "qsymms8",
            DType::QSymmS16 => "qsymms16",
            DType::S32 => "s32",
            DType::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::F16.size_bytes(), 2);
        assert_eq!(DType::BF16.size_bytes(), 2);
        assert_eq!(DType::QAsymmU8.size_bytes(), 1);
        assert_eq!(DType::QSymmS16.size_bytes(), 2);
        assert_eq!(DType::S32.size_bytes(), 4);
    }

    #[test]
    fn test_is_quantized() {
        assert!(DType::QAsymmU8.is_quantized());
        assert!(DType::QSymmS8.is_quantized());
        assert!(!DType::F32.is_quantized());
        assert!(!DType::S32.is_quantized());
    }

    #[test]
    fn test_is_float() {
        assert!(DType::F32.is_float());
        assert!(DType::F16.is_float());
        assert!(DType::BF16.is_float());
        assert!(!DType::QAsymmU8.is_float());
        assert!(!DType::Boolean.is_float());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DType::BF16), "bf16");
        assert_eq!(format!("{}", DType::QAsymmS8), "qasymms8");
    }
}
