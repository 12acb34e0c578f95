//! Deobfuscation framework for VBA macro modules.
//!
//! This module rewrites the parse tree of one document's macros into equivalent, readable
//! source. The heavy lifting happens in three components driven by one orchestrator:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Deobfuscation Pipeline                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Input: parser records of every macro stream                     │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Module (attributes / declarations / body + registries)          │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Cosmetic passes                                                 │
//! │    attributes → arithmetic → whitespace → identifiers            │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Cleaner: dead stores and effect-free statements, per procedure  │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Resolution (fixed point)                                        │
//! │    Translator → Evaluator.register → fold call sites             │
//! │    remove translated procedures nobody calls                     │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Inlining of trivial zero-argument procedures                    │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Output: rendered source + DeobfuscationResult                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`Deobfuscator`] - Owns the module and runs the passes
//! - [`Cleaner`] - Per-procedure dead code elimination with rollback on failure
//! - [`Translator`] - Lowers procedures and expressions into the evaluator dialect, failing
//!   closed on anything it cannot prove side-effect free
//! - [`DeobfuscatorConfig`] / [`Passes`] - Pass selection and limits
//! - [`EventLog`] / [`DeobfuscationResult`] - What happened, for reporting
//!
//! # Usage
//!
//! ```rust,no_run
//! use macroscope::{deobfuscate, deobfuscation::DeobfuscatorConfig, tree::RawNode};
//!
//! # fn example(json: &str) -> macroscope::Result<()> {
//! let streams = RawNode::streams_from_json(json)?;
//! let (source, result) = deobfuscate(&streams, &DeobfuscatorConfig::default())?;
//!
//! println!("{source}");
//! println!("{}", result.detailed_summary());
//! # Ok(())
//! # }
//! ```

mod cleaner;
mod config;
mod engine;
mod events;
mod result;
mod translator;

pub use cleaner::{CleanFailure, CleanReport, Cleaner, Effect};
pub use config::{DeobfuscatorConfig, Passes, BOILERPLATE_ATTRIBUTES};
pub use engine::Deobfuscator;
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog, EventLogIter};
pub use result::DeobfuscationResult;
pub use translator::{is_pure_builtin, Position, TranslateError, Translation, Translator};

use log::debug;
use rayon::prelude::*;

use crate::{module::Module, tree::RawNode, Result};

/// Deobfuscates the macro streams of one document.
///
/// Returns the rendered source together with the outcome of the run.
///
/// # Errors
///
/// Any module-level failure; see [`Deobfuscator::run`].
pub fn deobfuscate(streams: &[RawNode], config: &DeobfuscatorConfig) -> Result<(String, DeobfuscationResult)> {
    let module = Module::from_streams(streams)?;
    debug!(
        "deobfuscating {} procedures and {} globals",
        module.procedures().len(),
        module.variables().len()
    );

    let mut deobfuscator = Deobfuscator::new(module, config.clone());
    let result = deobfuscator.run()?;
    Ok((deobfuscator.module().render(), result))
}

/// Deobfuscates many documents in parallel.
///
/// Every document gets its own pipeline; results are returned in input order.
#[must_use]
pub fn deobfuscate_batch(
    documents: &[Vec<RawNode>],
    config: &DeobfuscatorConfig,
) -> Vec<Result<(String, DeobfuscationResult)>> {
    documents
        .par_iter()
        .map(|streams| deobfuscate(streams, config))
        .collect()
}
