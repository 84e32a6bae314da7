//! Lexer for the filter language.

use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

/// A character or literal the lexer cannot classify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character {ch:?} at byte {position}")]
    UnexpectedChar { position: usize, ch: char },
    #[error("unterminated string literal starting at byte {position}")]
    UnterminatedString { position: usize },
    #[error("invalid escape sequence `\\{ch}` at byte {position}")]
    InvalidEscape { position: usize, ch: char },
}

impl LexError {
    /// Byte offset of the offending input.
    pub fn position(&self) -> usize {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. } => *position,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    /// Current byte offset into `input`.
    position: usize,
    /// Set once an error has been yielded; the lexer is fused from then on.
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            failed: false,
        }
    }

    /// Returns the character at the current position without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances one character and returns it.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    /// Reads a double-quoted string literal. The opening quote has already been consumed.
    ///
    /// The token keeps the raw text, quotes included; decoding happens in the transformer.
    fn read_string(&mut self, start: usize) -> Result<Token<'a>, LexError> {
        loop {
            match self.bump() {
                None => return Err(LexError::UnterminatedString { position: start }),
                Some('"') => break,
                Some('\\') => {
                    let escape_at = self.position - 1;
                    match self.bump() {
                        Some('"' | '\\') => {}
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                position: escape_at,
                                ch,
                            })
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                }
                Some(_) => {}
            }
        }

        let raw = &self.input[start..self.position];
        Ok(self.token(TokenKind::String(raw), start))
    }

    /// Reads an identifier or keyword. The first character has already been consumed.
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }

    fn next_token(&mut self, start: usize, c: char) -> Result<Token<'a>, LexError> {
        let token = match c {
            '"' => return self.read_string(start),
            '=' => {
                if self.peek() == Some('~') {
                    self.bump();
                    self.token(TokenKind::RegexMatch, start)
                } else {
                    self.token(TokenKind::Eq, start)
                }
            }
            '!' => match self.peek() {
                Some('=') => {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                }
                Some('~') => {
                    self.bump();
                    self.token(TokenKind::NotRegexMatch, start)
                }
                _ => return Err(LexError::UnexpectedChar { position: start, ch: c }),
            },
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(start),
            _ => return Err(LexError::UnexpectedChar { position: start, ch: c }),
        };
        Ok(token)
    }
}

/// Keywords are case-sensitive and never match a prefix of a longer identifier.
fn match_keyword(s: &str) -> TokenKind<'_> {
    match s {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.skip_whitespace();
        let start = self.position;
        let c = self.bump()?;

        let result = self.next_token(start, c);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for Lexer<'_> {}

/// Lexes the whole input, stopping at the first error.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(input).collect()
}
