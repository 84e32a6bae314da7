//! In-memory backend: evaluates a predicate against individual records.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use regex::Regex;
use thiserror::Error;

use crate::predicate::{Comparison, MatchMode, Predicate, Translate};

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("invalid regex {pattern:?} for field `{field}`: {source}")]
    InvalidRegex {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Something with named string fields.
pub trait Record {
    /// The field's value, or `None` when the record has no such field.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl<S: BuildHasher> Record for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }
}

impl Record for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }
}

/// Strings compare as-is; numbers and booleans by their JSON text. `null`
/// counts as a missing field.
impl Record for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.get(name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(value) => Some(Cow::Borrowed(value.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// Only objects have fields.
impl Record for serde_json::Value {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.as_object()?.field(name)
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        (**self).field(name)
    }
}

#[derive(Debug, Clone)]
enum Test {
    Exact(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        field: String,
        test: Test,
        negated: bool,
    },
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    fn matches(&self, record: &dyn Record) -> bool {
        match self {
            Node::Leaf {
                field,
                test,
                negated,
            } => {
                let hit = record.field(field).is_some_and(|actual| match test {
                    Test::Exact(expected) => actual == expected.as_str(),
                    Test::Regex(regex) => regex.is_match(&actual),
                });
                hit != *negated
            }
            Node::And(left, right) => left.matches(record) && right.matches(record),
            Node::Or(left, right) => left.matches(record) || right.matches(record),
        }
    }
}

struct Compiler {
    regexes: usize,
}

impl Translate for Compiler {
    type Output = Result<Node, MatcherError>;

    fn comparison(&mut self, comparison: &Comparison) -> Self::Output {
        let test = match comparison.mode {
            MatchMode::Exact => Test::Exact(comparison.value.clone()),
            MatchMode::Regex => {
                let regex = Regex::new(&comparison.value).map_err(|source| MatcherError::InvalidRegex {
                    field: comparison.field.clone(),
                    pattern: comparison.value.clone(),
                    source,
                })?;
                self.regexes += 1;
                Test::Regex(regex)
            }
        };

        Ok(Node::Leaf {
            field: comparison.field.clone(),
            test,
            negated: comparison.negated,
        })
    }

    fn and(&mut self, left: Self::Output, right: Self::Output) -> Self::Output {
        Ok(Node::And(Box::new(left?), Box::new(right?)))
    }

    fn or(&mut self, left: Self::Output, right: Self::Output) -> Self::Output {
        Ok(Node::Or(Box::new(left?), Box::new(right?)))
    }
}

/// A predicate with its regexes compiled, ready to test records.
///
/// Regex comparisons search anywhere in the value; anchor the pattern with
/// `^`/`$` to match the whole value. A record without the field fails every
/// positive comparison and passes every negated one.
#[derive(Debug, Clone)]
pub struct Matcher {
    root: Node,
}

impl Matcher {
    pub fn new(predicate: &Predicate) -> Result<Self, MatcherError> {
        let mut compiler = Compiler { regexes: 0 };
        let root = predicate.translate(&mut compiler)?;
        tracing::trace!(regexes = compiler.regexes, "compiled matcher");
        Ok(Self { root })
    }

    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.root.matches(&record)
    }
}
