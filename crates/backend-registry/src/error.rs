// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for backend registration and lookup.

/// A backend factory was invoked but the backend cannot be constructed
/// (required hardware or driver absent).
///
/// This is an expected outcome, not an exceptional one: callers choose
/// whether to retry with a different backend set.
#[derive(Debug, Clone, thiserror::Error)]
#[error("backend '{id}' unavailable: {reason}")]
pub struct BackendUnavailable {
    pub id: String,
    pub reason: String,
}

/// Errors from the process-wide backend registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// `register` was called with an id that already exists.
    #[error("backend '{id}' is already registered")]
    AlreadyRegistered { id: String },

    /// The requested id has no registered factory.
    #[error("backend '{id}' is not registered")]
    NotFound { id: String },

    /// A registered factory was invoked and reported the backend
    /// unavailable. The registry entry itself is left intact.
    #[error(transparent)]
    Unavailable(#[from] BackendUnavailable),
}
