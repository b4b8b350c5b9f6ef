// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The standard rewrite catalogue.
//!
//! Every rule is a standalone struct implementing
//! [`crate::RewriteRule`]; [`default_catalogue`] assembles them in the
//! order the compiler runs them. Structural cleanups come first so the
//! backend-aware rules (pad folding, weight relayout) see the smallest
//! possible graph, and constant narrowing runs last so it observes the
//! final consumer set of every constant.

pub mod collapse_reshapes;
pub mod convert_constants;
pub mod fold_pad;
pub mod move_layout_up;
pub mod redirect_members;
pub mod relayout_weights;
pub mod squash_siblings;

pub use collapse_reshapes::CollapseConsecutiveReshapes;
pub use convert_constants::{ConvertConstantsFloat32ToBFloat16, ConvertConstantsFloat32ToFloat16};
pub use fold_pad::FoldPadIntoPooling2d;
pub use move_layout_up::MoveLayoutChangesUp;
pub use redirect_members::RedirectMembersToConstantInputs;
pub use relayout_weights::PermuteDepthwiseConv2dWeights;
pub use squash_siblings::SquashEqualSiblings;

use crate::{OptimizerError, RewriteRule};
use backend_registry::BackendsMap;
use graph_ir::descriptor::PermutationVector;
use graph_ir::{Descriptor, Graph, LayerId};
use tensor_core::TensorInfo;

/// Which constant-precision narrowing, if any, closes the catalogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrecisionReduction {
    #[default]
    None,
    Float16,
    BFloat16,
}

/// Builds the standard rule catalogue.
pub fn default_catalogue(
    backends: &BackendsMap,
    reduction: PrecisionReduction,
) -> Vec<Box<dyn RewriteRule>> {
    let mut rules: Vec<Box<dyn RewriteRule>> = vec![
        Box::new(MoveLayoutChangesUp),
        Box::new(CollapseConsecutiveReshapes),
        Box::new(SquashEqualSiblings),
        Box::new(FoldPadIntoPooling2d::new(backends.clone())),
        Box::new(PermuteDepthwiseConv2dWeights::new(backends.clone())),
        Box::new(RedirectMembersToConstantInputs),
    ];
    match reduction {
        PrecisionReduction::None => {}
        PrecisionReduction::Float16 => rules.push(Box::new(ConvertConstantsFloat32ToFloat16)),
        PrecisionReduction::BFloat16 => rules.push(Box::new(ConvertConstantsFloat32ToBFloat16)),
    }
    rules
}

/// The permutation a layout-changing layer applies to its input, in the
/// `dst[m[i]] = src[i]` convention. `None` for any other descriptor.
pub(crate) fn applied_mapping(descriptor: &Descriptor) -> Option<PermutationVector> {
    match descriptor {
        Descriptor::Permute(d) => Some(d.mapping.clone()),
        // Transpose indexes sources by destination; its applied
        // permutation is the inverse of the stored mapping.
        Descriptor::Transpose(d) => Some(d.mapping.inverse()),
        _ => None,
    }
}

/// `TensorInfo` after the layout change described by `descriptor`.
pub(crate) fn permuted_info(
    info: &TensorInfo,
    descriptor: &Descriptor,
) -> Result<TensorInfo, OptimizerError> {
    let shape = match descriptor {
        Descriptor::Permute(d) => d.output_shape(&info.shape)?,
        Descriptor::Transpose(d) => d.output_shape(&info.shape)?,
        _ => info.shape.clone(),
    };
    let mut permuted = info.clone();
    permuted.shape = shape;
    Ok(permuted)
}

/// `true` when applying `first` then `second` leaves every dimension in
/// place.
pub(crate) fn compose_to_identity(first: &PermutationVector, second: &PermutationVector) -> bool {
    let (a, b) = (first.as_slice(), second.as_slice());
    a.len() == b.len()
        && a.iter()
            .enumerate()
            .all(|(i, &m)| b.get(m).copied() == Some(i))
}

/// Error for an `apply` whose precondition no longer holds.
pub(crate) fn inapplicable(rule: &dyn RewriteRule, graph: &Graph, id: LayerId) -> OptimizerError {
    let layer = graph
        .layer(id)
        .map(|l| l.name.clone())
        .unwrap_or_else(|_| id.to_string());
    OptimizerError::RuleNotApplicable {
        rule: rule.name().to_string(),
        layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_ir::descriptor::{PermuteDescriptor, TransposeDescriptor};

    #[test]
    fn test_applied_mapping_conventions() {
        let permute = Descriptor::Permute(PermuteDescriptor::new(vec![2, 0, 1]));
        assert_eq!(applied_mapping(&permute).unwrap().as_slice(), &[2, 0, 1]);

        let transpose = Descriptor::Transpose(TransposeDescriptor::new(vec![2, 0, 1]));
        assert_eq!(applied_mapping(&transpose).unwrap().as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn test_compose_to_identity() {
        let p = PermutationVector::new(vec![2, 0, 1]);
        assert!(compose_to_identity(&p, &p.inverse()));
        assert!(compose_to_identity(&p.inverse(), &p));
        assert!(!compose_to_identity(&p, &p));

        let swap = PermutationVector::new(vec![1, 0]);
        assert!(compose_to_identity(&swap, &swap));
    }
}
