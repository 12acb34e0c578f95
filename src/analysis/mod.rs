//! Inter-procedural analysis over a [`Module`](crate::module::Module).
//!
//! # Architecture
//!
//! - [`DependencyAnalyzer`] - Computes free and classified identifiers per procedure
//! - [`DependencyGraph`] - The forward sets plus the inverted caller map
//!
//! # Usage
//!
//! ```rust,ignore
//! use macroscope::analysis::DependencyAnalyzer;
//!
//! let graph = DependencyAnalyzer::new(&module).build_graph();
//!
//! // Who still calls the decoder?
//! if let Some(callers) = graph.callers("Decode") {
//!     println!("Decode is used by {:?}", callers);
//! }
//! ```

mod deps;

pub use deps::{DependencyAnalyzer, DependencyGraph, ProcedureDependencies};
