//! ORM-style backend: Django-flavoured `Q` lookup trees.
//!
//! `hi = "yes"` becomes `Q(hi__exact="yes")`, `hi !~ "y.*"` becomes
//! `~Q(hi__regex="y.*")`, and connectives combine the way `&` and `|` combine
//! `Q` objects, so the same query always yields the same tree shape and
//! rendering as the ORM itself would print.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::predicate::{Comparison, MatchMode, Translate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QChild {
    /// `("<field>__<lookup>", value)`
    Lookup(String, String),
    Node(Q),
}

/// A lookup node: children joined by `connector`, optionally negated as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Q {
    pub connector: Connector,
    pub negated: bool,
    pub children: Vec<QChild>,
}

impl Q {
    /// `Q(key=value)`
    pub fn lookup(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            connector: Connector::And,
            negated: false,
            children: vec![QChild::Lookup(key.into(), value.into())],
        }
    }

    /// Every `(key, value)` pair in the tree, left to right.
    pub fn lookups(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        self.collect_lookups(&mut pairs);
        pairs
    }

    fn collect_lookups<'q>(&'q self, pairs: &mut Vec<(&'q str, &'q str)>) {
        for child in &self.children {
            match child {
                QChild::Lookup(key, value) => pairs.push((key.as_str(), value.as_str())),
                QChild::Node(node) => node.collect_lookups(pairs),
            }
        }
    }

    fn combine(self, other: Q, connector: Connector) -> Q {
        let mut combined = Q {
            connector,
            negated: false,
            children: Vec::new(),
        };
        combined.add(self);
        combined.add(other);
        combined
    }

    /// Squashes `node` into `self` when that doesn't change the meaning.
    fn add(&mut self, node: Q) {
        if !node.negated && (node.connector == self.connector || node.children.len() == 1) {
            self.children.extend(node.children);
        } else {
            self.children.push(QChild::Node(node));
        }
    }
}

impl BitAnd for Q {
    type Output = Q;

    fn bitand(self, rhs: Q) -> Q {
        self.combine(rhs, Connector::And)
    }
}

impl BitOr for Q {
    type Output = Q;

    fn bitor(self, rhs: Q) -> Q {
        self.combine(rhs, Connector::Or)
    }
}

impl Not for Q {
    type Output = Q;

    fn not(mut self) -> Q {
        self.negated = !self.negated;
        self
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("(NOT ")?;
        }
        write!(f, "({}: ", self.connector)?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match child {
                QChild::Lookup(key, value) => {
                    write!(f, "({}, {})", PyRepr(key), PyRepr(value))?;
                }
                QChild::Node(node) => write!(f, "{node}")?,
            }
        }
        f.write_str(")")?;
        if self.negated {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Quotes a string the way Python's `repr` does.
struct PyRepr<'s>(&'s str);

impl fmt::Display for PyRepr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = if self.0.contains('\'') && !self.0.contains('"') {
            '"'
        } else {
            '\''
        };
        write!(f, "{quote}")?;
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                c if c == quote => write!(f, "\\{c}")?,
                c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
                c => write!(f, "{c}")?,
            }
        }
        write!(f, "{quote}")
    }
}

/// Translates predicates into [`Q`] trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTranslator {
    exact: String,
    regex: String,
}

impl Default for LookupTranslator {
    fn default() -> Self {
        Self::with_lookups("exact", "regex")
    }
}

impl LookupTranslator {
    /// Uses other lookup names, e.g. `iexact`/`iregex` for case-insensitive matching.
    pub fn with_lookups(exact: impl Into<String>, regex: impl Into<String>) -> Self {
        Self {
            exact: exact.into(),
            regex: regex.into(),
        }
    }
}

impl Translate for LookupTranslator {
    type Output = Q;

    fn comparison(&mut self, comparison: &Comparison) -> Q {
        let lookup = match comparison.mode {
            MatchMode::Exact => &self.exact,
            MatchMode::Regex => &self.regex,
        };
        let q = Q::lookup(
            format!("{}__{}", comparison.field, lookup),
            comparison.value.clone(),
        );
        if comparison.negated {
            !q
        } else {
            q
        }
    }

    fn and(&mut self, left: Q, right: Q) -> Q {
        left & right
    }

    fn or(&mut self, left: Q, right: Q) -> Q {
        left | right
    }
}
