// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compile options loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! reduce_fp32_to_fp16 = false
//! reduce_fp32_to_bf16 = false
//! import_enabled = true
//! memory_strategy = "interval-packing"
//! debug_graph_dump = false
//! ```

use std::path::Path;

use graph_optimizer::PrecisionReduction;

use crate::error::CompileError;

/// Options steering one [`compile`](crate::compile) call.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Convert fp32 constant tensors to fp16 where every consumer can
    /// take them. Mutually exclusive with `reduce_fp32_to_bf16`.
    pub reduce_fp32_to_fp16: bool,
    /// Convert fp32 constant tensors to bfloat16 where every consumer
    /// can take them. Mutually exclusive with `reduce_fp32_to_fp16`.
    pub reduce_fp32_to_bf16: bool,
    /// Allow zero-copy export across backend boundaries when the
    /// consumer's handle factory can import the producer's memory.
    pub import_enabled: bool,
    /// Packing strategy name applied to every planned backend,
    /// overriding the per-backend registry selection.
    pub memory_strategy: Option<String>,
    /// Log the graph's `Display` form before and after optimization.
    pub debug_graph_dump: bool,
}

impl CompileOptions {
    /// Loads options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::Config(format!("cannot read options '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses options from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CompileError> {
        toml::from_str(toml_str)
            .map_err(|e| CompileError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises options to TOML.
    pub fn to_toml(&self) -> Result<String, CompileError> {
        toml::to_string_pretty(self)
            .map_err(|e| CompileError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects contradictory option combinations.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.reduce_fp32_to_fp16 && self.reduce_fp32_to_bf16 {
            return Err(CompileError::InvalidOptions {
                reason: "reduce_fp32_to_fp16 and reduce_fp32_to_bf16 cannot both be set"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The constant-precision reduction the optimizer should apply.
    pub fn precision_reduction(&self) -> PrecisionReduction {
        if self.reduce_fp32_to_fp16 {
            PrecisionReduction::Float16
        } else if self.reduce_fp32_to_bf16 {
            PrecisionReduction::BFloat16
        } else {
            PrecisionReduction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_conservative() {
        let options = CompileOptions::default();
        assert!(!options.reduce_fp32_to_fp16);
        assert!(!options.reduce_fp32_to_bf16);
        assert!(!options.import_enabled);
        assert_eq!(options.memory_strategy, None);
        assert!(!options.debug_graph_dump);
        assert_eq!(options.precision_reduction(), PrecisionReduction::None);
        options.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let options = CompileOptions::from_toml("import_enabled = true\n").unwrap();
        assert!(options.import_enabled);
        assert!(!options.reduce_fp32_to_fp16);
        assert_eq!(options.memory_strategy, None);
    }

    #[test]
    fn test_toml_round_trip() {
        let options = CompileOptions {
            reduce_fp32_to_fp16: true,
            reduce_fp32_to_bf16: false,
            import_enabled: true,
            memory_strategy: Some("interval-packing".to_string()),
            debug_graph_dump: true,
        };
        let encoded = options.to_toml().unwrap();
        let decoded = CompileOptions::from_toml(&encoded).unwrap();
        assert_eq!(decoded.reduce_fp32_to_fp16, options.reduce_fp32_to_fp16);
        assert_eq!(decoded.import_enabled, options.import_enabled);
        assert_eq!(decoded.memory_strategy, options.memory_strategy);
        assert_eq!(decoded.debug_graph_dump, options.debug_graph_dump);
    }

    #[test]
    fn test_reductions_are_mutually_exclusive() {
        let options = CompileOptions {
            reduce_fp32_to_fp16: true,
            reduce_fp32_to_bf16: true,
            ..Default::default()
        };
        match options.validate() {
            Err(CompileError::InvalidOptions { reason }) => {
                assert!(reason.contains("reduce_fp32_to_fp16"));
            }
            other => panic!("expected invalid options, got {other:?}"),
        }
    }

    #[test]
    fn test_precision_reduction_mapping() {
        let fp16 = CompileOptions {
            reduce_fp32_to_fp16: true,
            ..Default::default()
        };
        assert_eq!(fp16.precision_reduction(), PrecisionReduction::Float16);
        let bf16 = CompileOptions {
            reduce_fp32_to_bf16: true,
            ..Default::default()
        };
        assert_eq!(bf16.precision_reduction(), PrecisionReduction::BFloat16);
    }

    #[test]
    fn test_malformed_toml_is_a_config_error() {
        match CompileOptions::from_toml("import_enabled = \"yes\"") {
            Err(CompileError::Config(message)) => assert!(message.contains("TOML")),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
