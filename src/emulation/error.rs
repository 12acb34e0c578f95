//! Evaluation error types.

use std::fmt;

/// Errors raised while registering or evaluating dialect code.
///
/// All of these are local failures: the orchestrator records them and leaves the affected
/// procedure or call site untouched. Only arithmetic folding escalates them to
/// [`Error::Evaluation`](crate::Error::Evaluation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The code does not conform to the dialect grammar.
    Syntax {
        /// 1-based line of the offending token.
        line: usize,
        /// What went wrong.
        message: String,
    },
    /// A name is neither a local, a registered procedure nor a built-in.
    UndefinedName(String),
    /// Registered code does not define the expected procedure.
    NotDefined(String),
    /// An operation was applied to values of the wrong type.
    TypeMismatch {
        /// The operation.
        operation: &'static str,
        /// Type name(s) of the offending operand(s).
        found: String,
    },
    /// A callable was invoked with the wrong number of arguments.
    Arity {
        /// The callable.
        function: String,
        /// Accepted argument counts, human readable.
        expected: String,
        /// Number of arguments supplied.
        found: usize,
    },
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// Integer arithmetic overflowed.
    Overflow,
    /// Index outside a list or string.
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// Length of the indexed value.
        len: usize,
    },
    /// A mapping has no such key.
    KeyNotFound(String),
    /// The operation is valid but deliberately not modelled, such as an unknown object
    /// method or an error raised while errors are not suppressed.
    NotImplemented(String),
    /// An execution budget was exhausted.
    LimitExceeded(&'static str),
}

impl EvalError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        EvalError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(operation: &'static str, found: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            operation,
            found: found.into(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Syntax { line, message } => write!(f, "syntax error on line {line}: {message}"),
            EvalError::UndefinedName(name) => write!(f, "name '{name}' is not defined"),
            EvalError::NotDefined(name) => write!(f, "code does not define '{name}'"),
            EvalError::TypeMismatch { operation, found } => {
                write!(f, "unsupported operand type(s) for {operation}: {found}")
            }
            EvalError::Arity {
                function,
                expected,
                found,
            } => write!(f, "{function}() takes {expected} argument(s), {found} given"),
            EvalError::DivisionByZero => write!(f, "division by zero"),
            EvalError::Overflow => write!(f, "integer overflow"),
            EvalError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range (length: {len})")
            }
            EvalError::KeyNotFound(key) => write!(f, "key '{key}' not found"),
            EvalError::NotImplemented(what) => write!(f, "not implemented: {what}"),
            EvalError::LimitExceeded(limit) => write!(f, "{limit} limit exceeded"),
        }
    }
}

impl std::error::Error for EvalError {}
