// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Narrow-float conversion used by the constant precision rewrites.
//!
//! Two target formats:
//!
//! - **binary16** (`f16`): IEEE 754 half precision, converted with
//!   round-to-nearest-even via the `half` crate.
//! - **bfloat16** (`bf16`): the top 16 bits of the binary32
//!   representation, rounded to nearest by inspecting bit 16 and letting
//!   the carry propagate into the upper half.
//!
//! Round-trip accuracy: `f32 → f16 → f32` stays within a relative error
//! of 2⁻¹⁰ for in-range values, `f32 → bf16 → f32` within 2⁻⁸.

use half::{bf16, f16};

/// Converts a single `f32` to IEEE binary16, rounding to nearest even.
pub fn f32_to_f16(value: f32) -> f16 {
    f16::from_f32(value)
}

/// Widens a binary16 value back to `f32` (exact).
pub fn f16_to_f32(value: f16) -> f32 {
    value.to_f32()
}

/// Converts a single `f32` to bfloat16.
///
/// The upper 16 bits of the binary32 representation are kept; bit 16
/// rounds the result to nearest, with the carry propagating through the
/// mantissa into the exponent when it overflows. NaN payloads are
/// quietened instead of rounded so they cannot turn into infinities.
pub fn f32_to_bf16(value: f32) -> bf16 {
    let bits = value.to_bits();
    if value.is_nan() {
        // Keep the sign, force a quiet NaN mantissa.
        return bf16::from_bits(((bits >> 16) as u16) | 0x0040);
    }
    let rounded = bits.wrapping_add(0x0000_8000);
    bf16::from_bits((rounded >> 16) as u16)
}

/// Widens a bfloat16 value back to `f32` (exact).
pub fn bf16_to_f32(value: bf16) -> f32 {
    value.to_f32()
}

/// Converts a slice of `f32` values to binary16.
pub fn convert_f32_slice_to_f16(values: &[f32]) -> Vec<f16> {
    values.iter().copied().map(f32_to_f16).collect()
}

/// Converts a slice of `f32` values to bfloat16.
pub fn convert_f32_slice_to_bf16(values: &[f32]) -> Vec<bf16> {
    values.iter().copied().map(f32_to_bf16).collect()
}

/// Widens a slice of binary16 values to `f32`.
pub fn convert_f16_slice_to_f32(values: &[f16]) -> Vec<f32> {
    values.iter().copied().map(f16_to_f32).collect()
}

/// Widens a slice of bfloat16 values to `f32`.
pub fn convert_bf16_slice_to_f32(values: &[bf16]) -> Vec<f32> {
    values.iter().copied().map(bf16_to_f32).collect()
}
