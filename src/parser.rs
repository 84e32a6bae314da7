//! Parser for the filter language.
//!
//! ## Call graph
//!
//! ```text
//! parse()
//!   └─ parse_expr()
//!        └─ parse_or_expression()
//!             ├─ parse_and_expression()
//!             │    ├─ parse_operand()
//!             │    │    ├─ "(" → parse_bracket_expression() (recurses into parse_expr)
//!             │    │    └─ IDENT → parse_comparison()
//!             │    │                 ├─ expect OP
//!             │    │                 └─ expect STRING
//!             │    │
//!             │    └─ on `and`, parse another operand
//!             │
//!             └─ on `or`, parse another and_expr
//! ```
//!
//! ## Precedence (high to low)
//!
//! 1. **Brackets** `( expr )`
//! 2. **Comparisons** `field = "v"`, `field != "v"`, `field =~ "re"`, `field !~ "re"`
//! 3. **`and`**
//! 4. **`or`**
//!
//! ## Examples
//!
//! ```text
//! status = "open"
//! status = "open" and owner != "bot"
//! (team =~ "^core" or team = "infra") and status != "closed"
//! ```

use std::fmt;

use thiserror::Error;

use crate::ast::{ComparisonNode, ComparisonOp, ParseNode};
use crate::config::Limits;
use crate::token::{Span, Token, TokenKind};

/// What the parser was prepared to accept when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// A field name or `(`.
    Operand,
    /// One of `=`, `!=`, `=~`, `!~`.
    Operator,
    StringLiteral,
    /// `and`, `or` or `)`.
    ClosingParen,
    /// `and`, `or` or the end of the query.
    EndOfInput,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Expected::Operand => "a field name or `(`",
            Expected::Operator => "one of `=`, `!=`, `=~`, `!~`",
            Expected::StringLiteral => "a double-quoted string",
            Expected::ClosingParen => "`and`, `or` or `)`",
            Expected::EndOfInput => "`and`, `or` or end of input",
        })
    }
}

/// What the parser found instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    Token(String),
    EndOfInput,
}

impl fmt::Display for Found {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Found::Token(description) => f.write_str(description),
            Found::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// The first token that cannot extend any production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found} at byte {position}")]
pub struct SyntaxError {
    pub position: usize,
    pub expected: Expected,
    pub found: Found,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("brackets nested deeper than {limit} levels at byte {position}")]
    RecursionLimitExceeded { position: usize, limit: usize },
    #[error("more than {limit} comparisons, the first extra one at byte {position}")]
    TooManyComparisons { position: usize, limit: usize },
}

/// Connective chains nest one tree level per link, so the comparison count
/// bounds the depth of every tree the parser hands out.
pub struct Parser<'t, 'a> {
    tokens: &'t [Token<'a>],
    position: usize,
    depth: usize,
    max_depth: usize,
    comparisons: usize,
    max_comparisons: usize,
}

impl<'t, 'a> Parser<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        Self::with_limits(tokens, &Limits::default())
    }

    /// A parser bounded by `limits.max_nesting_depth` and `limits.max_comparisons`.
    pub fn with_limits(tokens: &'t [Token<'a>], limits: &Limits) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            max_depth: limits.max_nesting_depth,
            comparisons: 0,
            max_comparisons: limits.max_comparisons,
        }
    }

    /// A parser that rejects brackets nested deeper than `max_depth`.
    pub fn with_max_depth(tokens: &'t [Token<'a>], max_depth: usize) -> Self {
        Self::with_limits(
            tokens,
            &Limits {
                max_nesting_depth: max_depth,
                ..Limits::default()
            },
        )
    }

    /// Returns the current token without advancing.
    fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.position)
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// Checks whether the current token has the given kind.
    fn match_token(&self, kind: &TokenKind<'_>) -> bool {
        self.peek()
            .is_some_and(|token| std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    /// Builds the error for whatever sits at the current position.
    fn unexpected(&self, expected: Expected) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError {
                position: token.span.start,
                expected,
                found: Found::Token(token.kind.to_string()),
            },
            None => SyntaxError {
                position: self.tokens.last().map_or(0, |token| token.span.end),
                expected,
                found: Found::EndOfInput,
            },
        }
    }

    /// Parses the whole token stream into a tree rooted at `start`.
    pub fn parse(&mut self) -> Result<ParseNode<'a>, ParseError> {
        let expr = self.parse_expr()?;

        if self.peek().is_some() {
            return Err(self.unexpected(Expected::EndOfInput).into());
        }

        Ok(ParseNode::Start(Box::new(expr)))
    }

    fn parse_expr(&mut self) -> Result<ParseNode<'a>, ParseError> {
        let inner = self.parse_or_expression()?;
        Ok(ParseNode::Expr(Box::new(inner)))
    }

    /// Lowest precedence.
    ///
    /// Grammar: `and_expr ("or" and_expr)*`
    fn parse_or_expression(&mut self) -> Result<ParseNode<'a>, ParseError> {
        let mut left = self.parse_and_expression()?;

        while self.match_token(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and_expression()?;
            left = ParseNode::OrExpr(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Grammar: `operand ("and" operand)*`
    fn parse_and_expression(&mut self) -> Result<ParseNode<'a>, ParseError> {
        let mut left = self.parse_operand()?;

        while self.match_token(&TokenKind::And) {
            self.advance();
            let right = self.parse_operand()?;
            left = ParseNode::AndExpr(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Grammar: `comparison | bracket_expr`
    fn parse_operand(&mut self) -> Result<ParseNode<'a>, ParseError> {
        match self.peek().map(|token| token.kind) {
            Some(TokenKind::LParen) => self.parse_bracket_expression(),
            Some(TokenKind::Identifier(_)) => {
                let comparison = self.parse_comparison()?;
                self.count_comparison(&comparison)?;
                Ok(ParseNode::Comparison(comparison))
            }
            _ => Err(self.unexpected(Expected::Operand).into()),
        }
    }

    fn parse_bracket_expression(&mut self) -> Result<ParseNode<'a>, ParseError> {
        let open = self.consume_span();

        if self.depth >= self.max_depth {
            return Err(ParseError::RecursionLimitExceeded {
                position: open.start,
                limit: self.max_depth,
            });
        }

        self.depth += 1;
        let inner = self.parse_expr()?;
        self.depth -= 1;

        if !self.match_token(&TokenKind::RParen) {
            return Err(self.unexpected(Expected::ClosingParen).into());
        }
        let close = self.consume_span();

        Ok(ParseNode::BracketExpr {
            open,
            inner: Box::new(inner),
            close,
        })
    }

    fn count_comparison(&mut self, comparison: &ComparisonNode<'a>) -> Result<(), ParseError> {
        if self.comparisons >= self.max_comparisons {
            return Err(ParseError::TooManyComparisons {
                position: comparison.span.start,
                limit: self.max_comparisons,
            });
        }
        self.comparisons += 1;
        Ok(())
    }

    /// Grammar: `IDENT OP STRING`
    fn parse_comparison(&mut self) -> Result<ComparisonNode<'a>, SyntaxError> {
        let Some(&Token {
            kind: TokenKind::Identifier(field),
            span: field_span,
        }) = self.peek()
        else {
            return Err(self.unexpected(Expected::Operand));
        };
        self.advance();

        let op = self.parse_comparison_operator()?;

        let Some(&Token {
            kind: TokenKind::String(literal),
            span: literal_span,
        }) = self.peek()
        else {
            return Err(self.unexpected(Expected::StringLiteral));
        };
        self.advance();

        Ok(ComparisonNode {
            field,
            op,
            literal,
            span: Span::new(field_span.start, literal_span.end),
        })
    }

    fn parse_comparison_operator(&mut self) -> Result<ComparisonOp, SyntaxError> {
        let op = match self.peek().map(|token| token.kind) {
            Some(TokenKind::Eq) => ComparisonOp::Eq,
            Some(TokenKind::NotEq) => ComparisonOp::NotEq,
            Some(TokenKind::RegexMatch) => ComparisonOp::RegexMatch,
            Some(TokenKind::NotRegexMatch) => ComparisonOp::NotRegexMatch,
            _ => return Err(self.unexpected(Expected::Operator)),
        };
        self.advance();
        Ok(op)
    }

    /// Advances past a token already known to be present and returns its span.
    fn consume_span(&mut self) -> Span {
        self.advance().map(|token| token.span).unwrap_or_default()
    }
}
