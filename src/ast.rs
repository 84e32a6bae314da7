//! Parse tree produced by the parser and consumed by the transformer.
//!
//! Every variant corresponds to one production of [`crate::grammar::GRAMMAR`].
//! The tree borrows from the query string and lives only until it is folded
//! into a [`crate::Predicate`].

use std::fmt;

use crate::token::Span;

/// The production rule a node was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Start,
    Expr,
    OrExpr,
    AndExpr,
    BracketExpr,
    Comparison,
}

impl Rule {
    /// The rule's name as written in the grammar.
    pub fn name(self) -> &'static str {
        match self {
            Rule::Start => "start",
            Rule::Expr => "expr",
            Rule::OrExpr => "or_expr",
            Rule::AndExpr => "and_expr",
            Rule::BracketExpr => "bracket_expr",
            Rule::Comparison => "comparison",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode<'a> {
    /// `start := expr EOI`
    Start(Box<ParseNode<'a>>),
    /// `expr := or_expr`
    Expr(Box<ParseNode<'a>>),
    /// Two operands joined by `or`. Chains nest to the left.
    OrExpr(Box<ParseNode<'a>>, Box<ParseNode<'a>>),
    /// Two operands joined by `and`. Chains nest to the left.
    AndExpr(Box<ParseNode<'a>>, Box<ParseNode<'a>>),
    /// `"(" expr ")"`
    BracketExpr {
        open: Span,
        inner: Box<ParseNode<'a>>,
        close: Span,
    },
    Comparison(ComparisonNode<'a>),
}

impl ParseNode<'_> {
    pub fn rule(&self) -> Rule {
        match self {
            ParseNode::Start(_) => Rule::Start,
            ParseNode::Expr(_) => Rule::Expr,
            ParseNode::OrExpr(..) => Rule::OrExpr,
            ParseNode::AndExpr(..) => Rule::AndExpr,
            ParseNode::BracketExpr { .. } => Rule::BracketExpr,
            ParseNode::Comparison(_) => Rule::Comparison,
        }
    }

    /// The source range covered by this node.
    pub fn span(&self) -> Span {
        match self {
            ParseNode::Start(inner) | ParseNode::Expr(inner) => inner.span(),
            ParseNode::OrExpr(lhs, rhs) | ParseNode::AndExpr(lhs, rhs) => {
                Span::new(lhs.span().start, rhs.span().end)
            }
            ParseNode::BracketExpr { open, close, .. } => Span::new(open.start, close.end),
            ParseNode::Comparison(node) => node.span,
        }
    }
}

/// `comparison := IDENT OP STRING`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonNode<'a> {
    pub field: &'a str,
    pub op: ComparisonOp,
    /// The string literal exactly as written, quotes and escapes included.
    pub literal: &'a str,
    pub span: Span,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,            // =
    NotEq,         // !=
    RegexMatch,    // =~
    NotRegexMatch, // !~
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::RegexMatch => "=~",
            ComparisonOp::NotRegexMatch => "!~",
        }
    }
}
