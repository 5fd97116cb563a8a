//! Error types shared by the grammar compiler, the scanner and the loaders.
//!
//!     Two kinds of failure matter to callers. A grammar that cannot be compiled is rejected
//!     as a whole with [Error::MalformedGrammar]; callers treat it as a startup-time
//!     configuration problem and leave the grammar out of the active set. An input that hits
//!     an illegal pattern while scanning fails with [Error::IllegalSequence]; this only aborts
//!     that one tokenization call.
//!
//!     Truncated input is not an error: modes still open at the end of the buffer are closed
//!     implicitly by the scanner.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The grammar definition cannot be compiled.
    #[error("malformed grammar `{grammar}`: {reason}")]
    MalformedGrammar { grammar: String, reason: String },

    /// An illegal pattern matched while scanning.
    #[error("illegal sequence for grammar `{grammar}` at offset {offset}")]
    IllegalSequence { grammar: String, offset: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(grammar: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedGrammar {
            grammar: grammar.into(),
            reason: reason.into(),
        }
    }

    /// Offset of the offending input, for [Error::IllegalSequence].
    pub fn illegal_offset(&self) -> Option<usize> {
        match self {
            Error::IllegalSequence { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
