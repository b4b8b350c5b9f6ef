// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-optimizer
//!
//! Rewrite passes over the [`graph_ir::Graph`].
//!
//! The engine is deliberately small: a [`RewriteRule`] is a local,
//! purely structural rewrite, and [`Optimizer::run`] sweeps a catalogue
//! of rules over the graph until nothing fires. Rules compose through
//! the fixpoint; the layout hoist leaves inverse pairs and duplicate
//! siblings behind, and the cancellation and squash rules clean those up
//! in later sweeps.
//!
//! [`rules::default_catalogue`] assembles the standard catalogue the
//! compiler runs; see [`rules`] for the individual rewrites.

mod error;
mod pass;
pub mod rules;

pub use error::OptimizerError;
pub use pass::{OptimizeStats, Optimizer, RewriteResult, RewriteRule};
pub use rules::{default_catalogue, PrecisionReduction};
