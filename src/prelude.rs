//! # macroscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the macroscope library. Import this module to get quick access to the essential
//! types for macro deobfuscation.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all macroscope operations
pub use crate::Error;

/// The result type used throughout macroscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// One-call deobfuscation of a document or a batch of documents
pub use crate::{deobfuscate, deobfuscate_batch};

/// The analyzed unit and its registries
pub use crate::module::{Module, Registry};

// ================================================================================================
// Tree Model
// ================================================================================================

/// Arena, node handles, kinds and the parser input contract
pub use crate::tree::{FreshNames, Node, NodeId, NodeKind, RawNode, Step, Tree};

// ================================================================================================
// Analysis
// ================================================================================================

/// Procedure dependency graph
pub use crate::analysis::{DependencyAnalyzer, DependencyGraph, ProcedureDependencies};

// ================================================================================================
// Evaluation
// ================================================================================================

/// Evaluation contract, bundled interpreter and runtime values
pub use crate::emulation::{EvalError, EvalLimits, Evaluator, Interpreter, Value};

// ================================================================================================
// Deobfuscation
// ================================================================================================

/// Orchestrator, configuration and reporting
pub use crate::deobfuscation::{
    DeobfuscationResult, Deobfuscator, DeobfuscatorConfig, DerivedStats, Event, EventKind, EventLog, Passes,
};

/// Dead code elimination and lowering
pub use crate::deobfuscation::{CleanFailure, CleanReport, Cleaner, TranslateError, Translation, Translator};
