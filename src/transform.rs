//! Folds a parse tree into a [`Predicate`].

use crate::ast::{ComparisonNode, ComparisonOp, ParseNode};
use crate::predicate::{Comparison, MatchMode, Predicate};

/// Transforms a parse tree bottom-up into a predicate.
///
/// `start`, `expr` and `bracket_expr` only encode grouping, so they pass their
/// child through unchanged.
pub fn transform(node: &ParseNode<'_>) -> Predicate {
    match node {
        ParseNode::Start(inner)
        | ParseNode::Expr(inner)
        | ParseNode::BracketExpr { inner, .. } => transform(inner),
        ParseNode::AndExpr(lhs, rhs) => Predicate::And {
            left: Box::new(transform(lhs)),
            right: Box::new(transform(rhs)),
        },
        ParseNode::OrExpr(lhs, rhs) => Predicate::Or {
            left: Box::new(transform(lhs)),
            right: Box::new(transform(rhs)),
        },
        ParseNode::Comparison(comparison) => Predicate::Comparison(transform_comparison(comparison)),
    }
}

fn transform_comparison(node: &ComparisonNode<'_>) -> Comparison {
    let (mode, negated) = match node.op {
        ComparisonOp::Eq => (MatchMode::Exact, false),
        ComparisonOp::NotEq => (MatchMode::Exact, true),
        ComparisonOp::RegexMatch => (MatchMode::Regex, false),
        ComparisonOp::NotRegexMatch => (MatchMode::Regex, true),
    };

    Comparison {
        field: node.field.to_string(),
        mode,
        value: unescape_literal(node.literal),
        negated,
    }
}

/// Strips the surrounding quotes and decodes `\"` and `\\`.
///
/// The lexer only lets those two escapes through, so a backslash always
/// introduces exactly one literal character.
pub fn unescape_literal(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(literal);

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
            }
        } else {
            value.push(c);
        }
    }
    value
}
