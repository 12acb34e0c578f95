// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # macroscope
//!
//! Static deobfuscation of VBA macro source code extracted from office documents.
//!
//! `macroscope` does not parse VBA text itself. It consumes the parse tree an ANTLR VBA
//! grammar produces (serialized as JSON, one tree per macro stream), simplifies it and
//! renders equivalent, readable source again.
//!
//! ## Features
//!
//! - **Arena tree model** - Parent-linked nodes addressed by [`tree::NodeId`] handles, so
//!   removal, splicing and inlining never fight the borrow checker
//! - **Dead code elimination** - Per-procedure liveness analysis that drops effect-free
//!   statements and dead stores to a fixed point
//! - **Partial evaluation** - Side-effect-free procedures are lowered into a small
//!   evaluable dialect, executed by a sandboxed interpreter, and their call sites are
//!   replaced by the folded literal
//! - **Inlining** - Trivial zero-argument call chains are spliced into their callers
//! - **Identifier renaming** - Random-looking names are replaced by short, scoped names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use macroscope::prelude::*;
//!
//! let json = std::fs::read_to_string("module.json")?;
//! let streams = RawNode::streams_from_json(&json)?;
//!
//! let (source, result) = deobfuscate(&streams, &DeobfuscatorConfig::default())?;
//! println!("{source}");
//! println!("{}", result.summary());
//! # Ok::<(), macroscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`tree`] - Node arena, node kinds, queries and the JSON input contract
//! - [`module`] - The analyzed unit: three forests plus procedure and variable registries
//! - [`analysis`] - Procedure dependency graph
//! - [`emulation`] - The evaluation bridge and its interpreter
//! - [`deobfuscation`] - Cleaner, translator and the pass orchestrator

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// Parent-linked node arena, node kinds, tree queries and the JSON input contract.
///
/// Every grammar production the pipeline reasons about is a [`tree::NodeKind`] variant;
/// anything else is imported as [`tree::NodeKind::Unknown`] while its original name is
/// kept for round-tripping.
pub mod tree;

/// The analyzed unit: attribute, declaration and body forests plus registries.
pub mod module;

/// Dependency analysis between procedures and global variables.
pub mod analysis;

/// Evaluation bridge: the restricted dialect, its interpreter and runtime values.
pub mod emulation;

/// Deobfuscation passes and their orchestration.
pub mod deobfuscation;

pub use deobfuscation::{deobfuscate, deobfuscate_batch};
pub use error::Error;

/// The result type used throughout macroscope.
pub type Result<T> = std::result::Result<T, Error>;
