// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-compiler
//!
//! The top of the stack: turns a raw tensor graph plus a backend
//! registry into a network ready to execute.
//!
//! One call does everything:
//! ```text
//! Graph ──► compile(graph, &registry, &options) ──► CompiledNetwork
//! ```
//! where `CompiledNetwork` carries the partitioned graph, a memory
//! manager holding the packed buffers, and a serialisable report of
//! what compilation did.
//!
//! Options come from TOML or are built in code; see [`CompileOptions`].

mod compile;
mod error;
mod options;

pub use compile::{compile, CompileReport, CompiledNetwork};
pub use error::CompileError;
pub use options::CompileOptions;
