use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

use crate::diagnostics::BestTry;
use crate::functions::Direction;

// Fatal errors raised while matching or rendering. Ordinary match failure is
// not an error: it is `Ok(None)` inside the matching protocol.
#[derive(Debug, Error)]
pub enum Error {
    // A call names a rule that no module defines
    #[error("unknown rule `{module}::{name}`")]
    UnknownRule { module: String, name: String },

    // The rule exists, but not with this many parameters
    #[error("rule `{module}::{name}` called with {found} arguments, defined with {expected:?}")]
    Arity {
        module: String,
        name: String,
        expected: Vec<usize>,
        found: usize,
    },

    // No function with this name supports the requested direction
    #[error("unknown function `{module}::{name}` ({direction})")]
    UnknownFunction {
        module: String,
        name: String,
        direction: Direction,
    },

    // A function rejected its arguments
    #[error("function `{name}` failed: {message}")]
    Function { name: String, message: String },

    // A call through an unbound variable needs a declared type to enumerate
    #[error("call target `${0}` is unbound and has no declared type")]
    UntypedCall(String),

    // The declared type of a call variable is not defined by the module
    #[error("unknown type `{0}`")]
    UnknownType(String),

    // Rendering referenced a variable the match never bound
    #[error("unbound variable `${0}`")]
    Unbound(String),

    // Rendering reached a pattern-only node
    #[error("`{0}` cannot appear in a result expression")]
    NotRenderable(&'static str),

    // The call-depth ceiling was hit: most likely an infinite recursion
    #[error("call stack depth {0} exceeded (likely infinite recursion)")]
    StackOverflow(usize),

    // Render-time function calls nested too deeply
    #[error("function nesting depth {0} exceeded")]
    FunctionNesting(usize),

    // The caller raised the cancellation signal
    #[error("match cancelled")]
    Cancelled,

    // Unmatched input in `Unmatched::Error` mode
    #[error("no rule matches at position {pos} ({best})")]
    Unmatched { pos: usize, best: BestTry },

    // A fatal error, wrapped with the furthest position any attempt reached
    #[error("{source} ({best})")]
    Transform {
        best: BestTry,
        #[source]
        source: Box<Error>,
    },

    // Program or configuration files that are not valid JSON for their schema
    #[error("invalid program: {0}")]
    Load(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Transform { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

// Type alias for results that use `Error` as the error type
pub type Result<T> = std::result::Result<T, Error>;
