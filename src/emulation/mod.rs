//! Evaluation bridge for partially evaluating macro procedures.
//!
//! Procedures the translator proves side-effect free are lowered into a small,
//! indentation-structured dialect and handed to an [`Evaluator`]. The orchestrator then
//! evaluates call expressions against everything registered so far and splices the
//! resulting [`Value`] back into the tree as a literal.
//!
//! # Architecture
//!
//! - [`Evaluator`] - The narrow contract the passes depend on: register, evaluate, query
//! - [`Interpreter`] - The bundled sandboxed implementation of that contract
//! - [`Value`] - Runtime values and their rendering back into VBA literals
//! - [`EvalError`] - Everything that can go wrong while registering or evaluating
//! - [`EvalLimits`] - Step, call depth and string size budgets
//!
//! # The dialect
//!
//! ```text
//! def Decode(s):
//!   out = ""
//!   i = 0
//!   while (i < len(s)):
//!     out = (out + chr((ord(s[i]) - 1)))
//!     i = (i + 1)
//!   return out
//! ```
//!
//! Statements are `def`, `if`/`elif`/`else`, `while`, `break`, `pass`, `return`,
//! assignment to a name or an indexed name, and bare expressions. Strings use VBA quoting
//! (`""` inside a literal is one quote). Integers are 64-bit and checked: overflow is an
//! error, never a wrap. `/` is floor division, `%` takes the sign of the divisor, `^` is
//! exclusive or and `**` is exponentiation. `and`, `or` and `not` are logical on booleans
//! and bitwise on integers, mirroring VBA's operators of the same name.
//!
//! The built-in environment is fixed: `str int bool list chr ord asc len sgn abs upper
//! lower strip lstrip rstrip reverse replace instr disable_errors method_call`.
//! `method_call(object, method, args)` reaches a closed set of well-known members: the
//! `Err` object (`Raise`, `Number`, `Source`, `Clear`) and the string and conversion
//! functions of the `VBA` library.
//!
//! # Error state
//!
//! `disable_errors()` models `On Error Resume Next`. It is sticky for the lifetime of the
//! interpreter. `Err.Raise` is only modelled while errors are suppressed; the raised
//! number and source can then be read back until the next `register` or `evaluate` call
//! clears them.

mod builtins;
mod error;
mod interpreter;
mod lexer;
mod parser;
mod value;

use rustc_hash::FxHashMap;

pub use error::EvalError;
pub use interpreter::{EvalLimits, Interpreter};
pub use value::{quote, Value};

/// Contract between the deobfuscation passes and an evaluation backend.
///
/// Implementations must be deterministic and must not reach outside their own state:
/// registered code comes from untrusted macros.
pub trait Evaluator {
    /// Installs the definitions in `code`, which must define a callable named `name`.
    ///
    /// On failure nothing is installed.
    ///
    /// # Errors
    ///
    /// [`EvalError::Syntax`] if `code` is not valid dialect code and
    /// [`EvalError::NotDefined`] if it does not define `name`.
    fn register(&mut self, name: &str, code: &str) -> Result<(), EvalError>;

    /// Evaluates one expression against the registered callables, the built-ins and
    /// `locals`.
    ///
    /// # Errors
    ///
    /// Any [`EvalError`] raised while parsing or running the expression.
    fn evaluate(&mut self, expression: &str, locals: &FxHashMap<String, Value>) -> Result<Value, EvalError>;

    /// True if a callable named `name` is registered.
    fn is_registered(&self, name: &str) -> bool;
}

/// True if `name` is a keyword or built-in of the dialect and cannot name a variable or
/// procedure in lowered code.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    parser::KEYWORDS.contains(&name) || builtins::Builtin::lookup(name).is_some()
}
