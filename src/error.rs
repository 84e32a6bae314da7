use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::{ParseError, SyntaxError};

/// Why a query failed to compile. Every variant is terminal: no partial
/// predicate is ever produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("brackets nested deeper than {limit} levels at byte {position}")]
    RecursionLimitExceeded { position: usize, limit: usize },
    #[error("more than {limit} comparisons, the first extra one at byte {position}")]
    TooManyComparisons { position: usize, limit: usize },
    #[error("query is {length} bytes long, the limit is {limit}")]
    QueryTooLong { length: usize, limit: usize },
}

impl Error {
    /// Byte offset the error points at, if it points anywhere.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::Lex(err) => Some(err.position()),
            Error::Syntax(err) => Some(err.position),
            Error::RecursionLimitExceeded { position, .. }
            | Error::TooManyComparisons { position, .. } => Some(*position),
            Error::QueryTooLong { .. } => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Syntax(err) => Error::Syntax(err),
            ParseError::RecursionLimitExceeded { position, limit } => {
                Error::RecursionLimitExceeded { position, limit }
            }
            ParseError::TooManyComparisons { position, limit } => {
                Error::TooManyComparisons { position, limit }
            }
        }
    }
}
