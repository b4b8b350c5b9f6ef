// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor-handle factory descriptors.
//!
//! A backend's tensors are produced by one or more handle factories.
//! During partitioning, the producer's preferred factory is matched
//! against each consumer's accepted set; export/import compatibility is
//! decided by intersecting flag masks, exactly as independently
//! implemented backends negotiate it.

use graph_ir::HandleFactoryId;
use std::collections::HashMap;

/// Capability description of one tensor-handle factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorHandleFactory {
    pub id: HandleFactoryId,
    /// Whether tensors from this factory can be mapped into host memory
    /// for an explicit copy.
    pub supports_map_unmap: bool,
    /// Bitmask of memory-source kinds this factory can export.
    pub export_flags: u32,
    /// Bitmask of memory-source kinds this factory can import.
    pub import_flags: u32,
}

impl TensorHandleFactory {
    /// A plain host-memory factory: map/unmap only, no zero-copy paths.
    pub fn map_unmap_only(id: HandleFactoryId) -> Self {
        Self {
            id,
            supports_map_unmap: true,
            export_flags: 0,
            import_flags: 0,
        }
    }

    /// A factory with explicit export/import masks.
    pub fn with_flags(
        id: HandleFactoryId,
        supports_map_unmap: bool,
        export_flags: u32,
        import_flags: u32,
    ) -> Self {
        Self {
            id,
            supports_map_unmap,
            export_flags,
            import_flags,
        }
    }

    /// Whether this factory can export tensors at all.
    pub fn supports_export(&self) -> bool {
        self.export_flags != 0
    }

    /// Whether this factory can adopt (import) tensors exported by
    /// `producer` without a copy.
    pub fn can_import_from(&self, producer: &TensorHandleFactory) -> bool {
        self.import_flags & producer.export_flags != 0
    }
}

/// The id→factory table assembled from every resolved backend before
/// partitioning runs.
#[derive(Debug, Default)]
pub struct HandleFactoryRegistry {
    factories: HashMap<HandleFactoryId, TensorHandleFactory>,
}

impl HandleFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory description.
    ///
    /// Two backends may legitimately share a factory (e.g. a common
    /// host-memory factory); re-registration with identical capabilities
    /// is a no-op, while a conflicting description is rejected by
    /// keeping the first and logging.
    pub fn register(&mut self, factory: TensorHandleFactory) {
        match self.factories.get(&factory.id) {
            Some(existing) if *existing != factory => {
                tracing::warn!(
                    id = %factory.id,
                    "conflicting re-registration of handle factory ignored"
                );
            }
            _ => {
                self.factories.insert(factory.id.clone(), factory);
            }
        }
    }

    pub fn get(&self, id: &HandleFactoryId) -> Option<&TensorHandleFactory> {
        self.factories.get(id)
    }

    pub fn contains(&self, id: &HandleFactoryId) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
