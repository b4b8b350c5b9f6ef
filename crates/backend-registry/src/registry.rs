// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The process-wide backend registry.
//!
//! One registry instance is shared by every network being loaded in the
//! process; it is passed through explicitly rather than reached via a
//! global. A single `parking_lot::Mutex` guards the id→factory map and
//! the per-backend allocator/strategy associations. Factory invocation
//! happens **outside** that lock: constructing a backend may probe
//! hardware and take arbitrarily long, and must not block registration
//! of unrelated backends from other threads.

use crate::allocator::Allocator;
use crate::capability::BackendCapability;
use crate::error::{BackendUnavailable, RegistryError};
use graph_ir::BackendId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Fallible constructor for a backend's capability object.
///
/// Failure (hardware absent, driver missing) is an expected outcome and
/// leaves the registry entry untouched.
pub type BackendFactory =
    Arc<dyn Fn() -> Result<Arc<dyn BackendCapability>, BackendUnavailable> + Send + Sync>;

#[derive(Default)]
struct Inner {
    factories: HashMap<BackendId, BackendFactory>,
    allocators: HashMap<BackendId, Arc<dyn Allocator>>,
    memory_strategies: HashMap<BackendId, String>,
}

/// Process-wide mapping from backend id to capability factory, with the
/// per-backend custom allocator and memory-strategy associations that
/// share its lifecycle.
#[derive(Default)]
pub struct BackendRegistry {
    inner: Mutex<Inner>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend factory under `id`.
    ///
    /// Fails with `AlreadyRegistered` if the id exists; the existing
    /// entry is left untouched.
    pub fn register(&self, id: BackendId, factory: BackendFactory) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        if inner.factories.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered {
                id: id.to_string(),
            });
        }
        tracing::debug!(backend = %id, "registering backend factory");
        inner.factories.insert(id, factory);
        Ok(())
    }

    /// Removes a backend and any associated custom allocator and
    /// memory-strategy selection. Unknown ids report `NotFound`.
    pub fn deregister(&self, id: &BackendId) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        if inner.factories.remove(id).is_none() {
            return Err(RegistryError::NotFound { id: id.to_string() });
        }
        inner.allocators.remove(id);
        inner.memory_strategies.remove(id);
        tracing::debug!(backend = %id, "deregistered backend");
        Ok(())
    }

    /// Returns the factory registered under `id`.
    pub fn get_factory(&self, id: &BackendId) -> Result<BackendFactory, RegistryError> {
        let inner = self.inner.lock();
        inner
            .factories
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Looks up and invokes the factory for `id`.
    ///
    /// The lock is released before invocation; a failing factory
    /// propagates `Unavailable` without disturbing the registration.
    pub fn acquire(&self, id: &BackendId) -> Result<Arc<dyn BackendCapability>, RegistryError> {
        let factory = self.get_factory(id)?;
        Ok(factory()?)
    }

    /// Returns `true` if `id` has a registered factory.
    pub fn is_registered(&self, id: &BackendId) -> bool {
        self.inner.lock().factories.contains_key(id)
    }

    /// All registered backend ids, sorted for deterministic output.
    pub fn backend_ids(&self) -> Vec<BackendId> {
        let mut ids: Vec<BackendId> = self.inner.lock().factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Associates a custom allocator with a registered backend.
    pub fn set_custom_allocator(
        &self,
        id: &BackendId,
        allocator: Arc<dyn Allocator>,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        if !inner.factories.contains_key(id) {
            return Err(RegistryError::NotFound { id: id.to_string() });
        }
        inner.allocators.insert(id.clone(), allocator);
        Ok(())
    }

    /// The custom allocator associated with `id`, if any.
    pub fn custom_allocator(&self, id: &BackendId) -> Option<Arc<dyn Allocator>> {
        self.inner.lock().allocators.get(id).cloned()
    }

    /// Selects a memory-planning strategy (by library name) for a
    /// registered backend. Backends without a selection use their own
    /// native allocator and are skipped by the planner.
    pub fn set_memory_strategy(
        &self,
        id: &BackendId,
        strategy: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock();
        if !inner.factories.contains_key(id) {
            return Err(RegistryError::NotFound { id: id.to_string() });
        }
        inner.memory_strategies.insert(id.clone(), strategy.into());
        Ok(())
    }

    /// The memory-strategy name selected for `id`, if any.
    pub fn memory_strategy(&self, id: &BackendId) -> Option<String> {
        self.inner.lock().memory_strategies.get(id).cloned()
    }
}
