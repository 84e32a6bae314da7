//! A small boolean filter language compiled into backend-neutral predicates.
//!
//! ```rust
//! use filter_ql::{Predicate, QueryLanguage};
//!
//! let language = QueryLanguage::default();
//! let predicate = language.compile(r#"team =~ "^core" and status != "closed""#).unwrap();
//! assert_eq!(
//!     predicate,
//!     Predicate::regex("team", "^core").and(Predicate::not_exact("status", "closed"))
//! );
//! ```
//!
//! The predicate is handed to a backend: [`sql`] for PostgreSQL `WHERE`
//! clauses, [`matcher`] for in-memory records and [`lookup`] for ORM-style
//! lookup trees.

pub mod ast;
pub mod config;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod lookup;
pub mod matcher;
pub mod parser;
pub mod predicate;
pub mod sql;
pub mod token;
pub mod transform;

pub use ast::ParseNode;
pub use config::{FilterConfig, Limits};
pub use error::Error;
pub use predicate::{Comparison, MatchMode, Predicate, Translate};

use lexer::tokenize;
use parser::Parser;

/// The filter language with its input limits.
///
/// Build one at startup and share it; compiling only reads it, so a single
/// value can serve any number of threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryLanguage {
    limits: Limits,
}

impl QueryLanguage {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.limits)
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn grammar(&self) -> &'static str {
        grammar::GRAMMAR
    }

    /// Lexes and parses `input` into its parse tree.
    pub fn parse<'a>(&self, input: &'a str) -> Result<ParseNode<'a>, Error> {
        if input.len() > self.limits.max_query_len {
            return Err(Error::QueryTooLong {
                length: input.len(),
                limit: self.limits.max_query_len,
            });
        }

        let tokens = tokenize(input)?;
        let tree = Parser::with_limits(&tokens, &self.limits).parse()?;
        Ok(tree)
    }

    /// Compiles `input` into a predicate.
    pub fn compile(&self, input: &str) -> Result<Predicate, Error> {
        let tree = self.parse(input)?;
        Ok(transform::transform(&tree))
    }
}

/// Compiles `input` with the default limits.
pub fn compile(input: &str) -> Result<Predicate, Error> {
    QueryLanguage::default().compile(input)
}
