//! The compiled form of a filter query.
//!
//! A [`Predicate`] is a plain value: a tree of comparisons joined by `and`/`or`,
//! with negation carried on the comparison leaves. Backends turn it into
//! something executable through [`Translate`].

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// How a comparison tests the field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The field equals the value.
    Exact,
    /// The value is a regular expression found somewhere in the field.
    Regex,
}

/// Leaf test: `field` matches `value` under `mode`, inverted when `negated`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comparison {
    pub field: String,
    pub mode: MatchMode,
    pub value: String,
    pub negated: bool,
}

impl Comparison {
    pub fn new(field: impl Into<String>, mode: MatchMode, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            mode,
            value: value.into(),
            negated: false,
        }
    }

    /// Flips the comparison, turning `=` into `!=` and `=~` into `!~`.
    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// The operator this comparison is written with.
    pub fn operator(&self) -> &'static str {
        match (self.mode, self.negated) {
            (MatchMode::Exact, false) => "=",
            (MatchMode::Exact, true) => "!=",
            (MatchMode::Regex, false) => "=~",
            (MatchMode::Regex, true) => "!~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Comparison(Comparison),
    And {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Or {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
}

impl Predicate {
    /// `field = "value"`
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Comparison(Comparison::new(field, MatchMode::Exact, value))
    }

    /// `field =~ "pattern"`
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Comparison(Comparison::new(field, MatchMode::Regex, pattern))
    }

    /// `field != "value"`
    pub fn not_exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Comparison(Comparison::new(field, MatchMode::Exact, value).negate())
    }

    /// `field !~ "pattern"`
    pub fn not_regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Comparison(Comparison::new(field, MatchMode::Regex, pattern).negate())
    }

    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Folds the tree bottom-up through `translator`.
    pub fn translate<T: Translate + ?Sized>(&self, translator: &mut T) -> T::Output {
        match self {
            Predicate::Comparison(comparison) => translator.comparison(comparison),
            Predicate::And { left, right } => {
                let left = left.translate(translator);
                let right = right.translate(translator);
                translator.and(left, right)
            }
            Predicate::Or { left, right } => {
                let left = left.translate(translator);
                let right = right.translate(translator);
                translator.or(left, right)
            }
        }
    }

    /// All comparison leaves, left to right.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut leaves = Vec::new();
        self.collect_comparisons(&mut leaves);
        leaves
    }

    fn collect_comparisons<'p>(&'p self, leaves: &mut Vec<&'p Comparison>) {
        match self {
            Predicate::Comparison(comparison) => leaves.push(comparison),
            Predicate::And { left, right } | Predicate::Or { left, right } => {
                left.collect_comparisons(leaves);
                right.collect_comparisons(leaves);
            }
        }
    }
}

impl From<Comparison> for Predicate {
    fn from(comparison: Comparison) -> Self {
        Predicate::Comparison(comparison)
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        self.and(rhs)
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        self.or(rhs)
    }
}

/// A backend that folds a [`Predicate`] into its own representation.
///
/// Children are translated before their parent, left before right.
pub trait Translate {
    type Output;

    fn comparison(&mut self, comparison: &Comparison) -> Self::Output;
    fn and(&mut self, left: Self::Output, right: Self::Output) -> Self::Output;
    fn or(&mut self, left: Self::Output, right: Self::Output) -> Self::Output;
}

/// Renders the predicate as query text that compiles back to an equal predicate,
/// provided every field is a valid identifier.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison(comparison) => write!(f, "{comparison}"),
            Predicate::And { left, right } => {
                write_operand(f, left, matches!(**left, Predicate::Or { .. }))?;
                f.write_str(" and ")?;
                write_operand(f, right, !matches!(**right, Predicate::Comparison(_)))
            }
            Predicate::Or { left, right } => {
                write_operand(f, left, false)?;
                f.write_str(" or ")?;
                write_operand(f, right, matches!(**right, Predicate::Or { .. }))
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Predicate, bracket: bool) -> fmt::Result {
    if bracket {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"", self.field, self.operator())?;
        for c in self.value.chars() {
            if c == '"' || c == '\\' {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("\"")
    }
}
