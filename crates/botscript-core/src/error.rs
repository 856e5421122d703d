//! Error types for the BotScript core
//!
//! All fallible operations return `Result<T, Error>`.
//! Parse errors carry the source position of the token that triggered them;
//! construction and execution errors name the node kinds involved.

use crate::parser::tokenizer::Span;

/// BotScript error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed program text
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Misuse of the staged construction protocol
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Tick protocol driven out of order
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Reading or writing program/config files
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid run configuration
    #[error("Config error: {0}")]
    Config(String),
}

/// Syntax or structure violation while loading program text.
///
/// Always fatal to the parse; there is no partial-program recovery.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at {span}: {message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }

    /// Character offset of the offending token
    pub fn offset(&self) -> usize {
        self.span.offset
    }
}

/// Precondition violations on `attach`, `finish` and source rendering.
///
/// The parser checks `can_attach` before attaching, so it never triggers
/// these; other callers get a loud failure instead of a corrupted tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("({receiver}) does not accept {attachment}")]
    Rejected {
        receiver: &'static str,
        attachment: String,
    },

    #[error("({kind}) is not fully constructed")]
    Incomplete { kind: &'static str },

    #[error("attaching to ({receiver}) would make it contain itself")]
    Cycle { receiver: &'static str },

    #[error("cannot render ({kind}) before it is fully constructed")]
    Unrenderable { kind: &'static str },
}

/// Tick protocol misuse: `execute` without a preceding successful `step`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    #[error("({action}) was executed without being stepped")]
    NotStepped { action: &'static str },

    #[error("(seq) has no current child")]
    NoCurrentChild,

    #[error("(if) has not entered a branch")]
    NoActiveBranch,

    #[error("(while) is not iterating")]
    NotIterating,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias for BotScript operations
pub type Result<T> = std::result::Result<T, Error>;
