//! The token definition for the filter language.

use std::fmt;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind<'a> {
    // Keywords
    And, // "and"
    Or,  // "or"

    // Literals
    Identifier(&'a str),
    String(&'a str), // The raw literal, including quotes and escapes

    // Punctuation
    LParen, // (
    RParen, // )

    // Operators
    Eq,            // =
    NotEq,         // !=
    RegexMatch,    // =~
    NotRegexMatch, // !~
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::And => f.write_str("`and`"),
            TokenKind::Or => f.write_str("`or`"),
            TokenKind::Identifier(name) => write!(f, "identifier `{name}`"),
            TokenKind::String(raw) => write!(f, "string {raw}"),
            TokenKind::LParen => f.write_str("`(`"),
            TokenKind::RParen => f.write_str("`)`"),
            TokenKind::Eq => f.write_str("`=`"),
            TokenKind::NotEq => f.write_str("`!=`"),
            TokenKind::RegexMatch => f.write_str("`=~`"),
            TokenKind::NotRegexMatch => f.write_str("`!~`"),
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
