//! Textual interchange codec: a length-prefixed, JSON-like format with a
//! fixed key order. Both directions share one grammar; every format
//! violation is detected eagerly and reported as a [`FormatError`].

pub mod reader;
pub mod token;
pub mod writer;

pub use reader::from_text;
pub use writer::to_text;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("malformed numeric literal '{0}'")]
    BadNumber(String),
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },
    #[error("expected key \"{expected}\", found \"{found}\"")]
    WrongKey { expected: String, found: String },
    #[error("expected non-negative integer, found {0}")]
    ExpectedUint(String),
    #[error("unknown operator code {0}")]
    UnknownOpCode(usize),
    #[error("operator name \"{name}\" does not match code {code} (canonical name \"{canonical}\")")]
    OpNameMismatch {
        code: usize,
        name: String,
        canonical: &'static str,
    },
    #[error("operator \"{name}\" declares {found} results, canonical count is {expected}")]
    OpResultMismatch {
        name: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("trailing characters after the graph object")]
    TrailingInput,
}
