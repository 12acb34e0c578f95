use thiserror::Error;

use crate::emulation::EvalError;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only module-level, fatal conditions are represented here. Failures that are local to a
/// single procedure (an unsupported node while cleaning, a construct the translator cannot
/// lower, an evaluation that raises) are ordinary values inside the pipeline and end up as
/// events in the [`EventLog`](crate::deobfuscation::EventLog) instead.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - The node tree violates the tree invariant
/// - [`Error::RecursionLimit`] - The input tree nests deeper than the importer accepts
/// - [`Error::Json`] - The input could not be decoded as a node tree
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Pipeline Errors
/// - [`Error::NamesExhausted`] - The fresh-name generator ran out of names
/// - [`Error::Evaluation`] - Folding a pure arithmetic expression failed
///
/// # Examples
///
/// ```rust
/// use macroscope::{Error, module::Module, tree::RawNode};
///
/// let json = r#"{"name": "WS", "value": " ", "children": [{"name": "EOF", "value": ""}]}"#;
/// let streams = RawNode::streams_from_json(json)?;
///
/// match Module::from_streams(&streams) {
///     Ok(module) => println!("{}", module.render()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed tree: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input tree is damaged and could not be imported or processed.
    ///
    /// Raised when a node carries both a value and children, when a stream root has an
    /// unexpected shape, or when a structural assumption of a pass (for example a
    /// procedure declaration not wrapped in a module body element) does not hold. The
    /// error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Maximum recursion depth exceeded while importing a tree.
    ///
    /// The associated value is the depth limit that was hit.
    #[error("Reached the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The fresh-name alphabet is exhausted.
    ///
    /// Every one- and two-letter name has been handed out during this run. This is
    /// fatal because renaming can no longer guarantee distinct names.
    #[error("Fresh identifier names exhausted")]
    NamesExhausted,

    /// Evaluating an expression that was expected to be safe failed.
    ///
    /// Only arithmetic folding raises this: the node kinds of a folded expression are
    /// restricted to literals, signs and parentheses, so a failure indicates a defect
    /// rather than hostile input.
    #[error("Evaluation failed - {0}")]
    Evaluation(#[from] EvalError),

    /// The JSON input could not be decoded.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
