//! Error types for the fallible edges of the crate.
//!
//! Validation findings are never errors: they come back as
//! [`Diagnostic`](crate::diagnostic::Diagnostic) values. The enums here cover
//! malformed input documents, expression syntax, and programmer mistakes such
//! as registering a stage twice.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    /// Deserialization failed; `path` is the JSON path of the offending value.
    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },

    #[error("`{0}` is a structural key and cannot be used as a property")]
    ReservedKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Syntax errors from the expression parser. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unexpected character `{ch}` at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number literal `{text}` at {pos}")]
    InvalidNumber { pos: usize, text: String },

    #[error("expected {expected} at {pos}, found `{found}`")]
    UnexpectedToken {
        pos: usize,
        found: String,
        expected: &'static str,
    },

    #[error("expected {expected} but the expression ended")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown reference root `{name}` at {pos} (expected state, props, env or data)")]
    UnknownRoot { pos: usize, name: String },

    #[error("expression nests more than {limit} levels deep at {pos}")]
    TooDeep { pos: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation stage registered without a name")]
    EmptyStageName,

    #[error("validation stage `{0}` is already registered")]
    DuplicateStage(String),
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid pattern for field `{field}`: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}
