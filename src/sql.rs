//! PostgreSQL backend: turns a predicate into a `WHERE` condition using sea-query.
//!
//! | Comparison | SQL |
//! |---|---|
//! | `f = "v"` | `"f" = 'v'` |
//! | `f != "v"` | `"f" <> 'v'` |
//! | `f =~ "re"` | `"f" ~ 're'` |
//! | `f !~ "re"` | `NOT "f" ~ 're'` |
//!
//! Negated tests follow SQL's three-valued logic: a `NULL` column satisfies
//! neither `f = "v"` nor `f != "v"`.

use std::collections::HashMap;

use sea_query::extension::postgres::PgBinOper;
use sea_query::{
    Alias, Asterisk, Expr, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr, Value, Values,
};

use crate::config::{FilterConfig, SqlConfig};
use crate::predicate::{Comparison, MatchMode, Predicate};

/// A rewrite applied while translating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimization {
    /// `c = "a" or c = "b" or ...` became `c IN (...)`.
    OrToIn { column: String, value_count: usize },
    /// `c != "a" and c != "b" and ...` became `c NOT IN (...)`.
    AndToNotIn { column: String, value_count: usize },
}

/// Result of SQL compilation with optimization information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub sql: String,
    pub optimizations: Vec<Optimization>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

pub struct SqlTranslator {
    config: SqlConfig,
}

impl Default for SqlTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlTranslator {
    pub fn new() -> Self {
        Self::with_config(SqlConfig::default())
    }

    pub fn with_config(config: SqlConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::with_config(config.sql.clone())
    }

    pub fn config(&self) -> &SqlConfig {
        &self.config
    }

    /// The `WHERE` condition for `predicate`, for embedding in the caller's own statements.
    pub fn condition(&self, predicate: &Predicate) -> (SimpleExpr, Vec<Optimization>) {
        let mut optimizations = Vec::new();
        let expr = self.compile_predicate(predicate, &mut optimizations);
        (expr, optimizations)
    }

    /// `SELECT * FROM <table> WHERE <condition>`
    pub fn select(&self, predicate: &Predicate) -> (SelectStatement, Vec<Optimization>) {
        let (condition, optimizations) = self.condition(predicate);

        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(Alias::new(self.config.table.as_str()))
            .and_where(condition);

        (select, optimizations)
    }

    /// Compiles to SQL text with the values inlined.
    pub fn compile(&self, predicate: &Predicate) -> CompileResult {
        let (select, optimizations) = self.select(predicate);
        CompileResult {
            sql: select.to_string(PostgresQueryBuilder),
            optimizations,
        }
    }

    /// Compiles to parameterized SQL (`$1`, `$2`, ...) and its values.
    pub fn build(&self, predicate: &Predicate) -> (String, Values) {
        let (select, _) = self.select(predicate);
        select.build(PostgresQueryBuilder)
    }

    fn compile_predicate(
        &self,
        predicate: &Predicate,
        optimizations: &mut Vec<Optimization>,
    ) -> SimpleExpr {
        let connective = match predicate {
            Predicate::Comparison(comparison) => return self.compile_comparison(comparison),
            Predicate::Or { .. } => Connective::Or,
            Predicate::And { .. } => Connective::And,
        };
        let leaves = collect_chain(predicate, connective);
        self.compile_chain(&leaves, connective, optimizations)
    }

    /// Compiles one flattened run of `connective`.
    ///
    /// Exact tests on one column that reach `or_to_in_threshold` are merged into a
    /// single `IN` (for `or` runs of `=`) or `NOT IN` (for `and` runs of `!=`),
    /// placed where the first of them stood.
    fn compile_chain(
        &self,
        leaves: &[&Predicate],
        connective: Connective,
        optimizations: &mut Vec<Optimization>,
    ) -> SimpleExpr {
        let threshold = self.config.or_to_in_threshold.max(2);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for &leaf in leaves {
            if let Some((column, _)) = self.set_member(leaf, connective) {
                *counts.entry(column).or_default() += 1;
            }
        }

        let mut parts: Vec<ChainPart<'_>> = Vec::with_capacity(leaves.len());
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for &leaf in leaves {
            match self.set_member(leaf, connective) {
                Some((column, value))
                    if counts.get(column).copied().unwrap_or_default() >= threshold =>
                {
                    match slots.get(column) {
                        Some(&slot) => {
                            if let ChainPart::Set { values, .. } = &mut parts[slot] {
                                values.push(string_value(value));
                            }
                        }
                        None => {
                            slots.insert(column, parts.len());
                            parts.push(ChainPart::Set {
                                column,
                                values: vec![string_value(value)],
                            });
                        }
                    }
                }
                _ => parts.push(ChainPart::Leaf(leaf)),
            }
        }

        let exprs = parts
            .into_iter()
            .map(|part| match part {
                ChainPart::Leaf(leaf) => self.compile_predicate(leaf, optimizations),
                ChainPart::Set { column, values } => {
                    collapse(column, values, connective, optimizations)
                }
            })
            .collect();
        fold_balanced(exprs, connective)
    }

    fn compile_comparison(&self, comparison: &Comparison) -> SimpleExpr {
        let col = Expr::col(Alias::new(self.config.column_for(&comparison.field)));
        let val = string_value(&comparison.value);

        match (comparison.mode, comparison.negated) {
            (MatchMode::Exact, false) => col.eq(val),
            (MatchMode::Exact, true) => col.ne(val),
            (MatchMode::Regex, false) => col.binary(PgBinOper::Regex, val),
            (MatchMode::Regex, true) => col.binary(PgBinOper::Regex, val).not(),
        }
    }

    /// The column and value of a leaf that may join an `IN` / `NOT IN` set.
    fn set_member<'p>(
        &'p self,
        leaf: &'p Predicate,
        connective: Connective,
    ) -> Option<(&'p str, &'p str)> {
        let Predicate::Comparison(comparison) = leaf else {
            return None;
        };
        let negated_expected = connective == Connective::And;
        if comparison.mode != MatchMode::Exact || comparison.negated != negated_expected {
            return None;
        }
        Some((self.config.column_for(&comparison.field), &comparison.value))
    }
}

enum ChainPart<'p> {
    Leaf(&'p Predicate),
    Set { column: &'p str, values: Vec<Value> },
}

fn collapse(
    column: &str,
    values: Vec<Value>,
    connective: Connective,
    optimizations: &mut Vec<Optimization>,
) -> SimpleExpr {
    let value_count = values.len();
    let col = Expr::col(Alias::new(column));
    let (expr, optimization) = match connective {
        Connective::Or => (
            col.is_in(values),
            Optimization::OrToIn {
                column: column.to_string(),
                value_count,
            },
        ),
        Connective::And => (
            col.is_not_in(values),
            Optimization::AndToNotIn {
                column: column.to_string(),
                value_count,
            },
        ),
    };

    tracing::debug!(?optimization, "collapsed comparison chain");
    optimizations.push(optimization);
    expr
}

/// Flattens the maximal run of `connective` nodes rooted at `predicate`, left to right.
fn collect_chain(predicate: &Predicate, connective: Connective) -> Vec<&Predicate> {
    let mut leaves = Vec::new();
    let mut pending = vec![predicate];
    while let Some(node) = pending.pop() {
        match (node, connective) {
            (Predicate::Or { left, right }, Connective::Or)
            | (Predicate::And { left, right }, Connective::And) => {
                pending.push(right);
                pending.push(left);
            }
            _ => leaves.push(node),
        }
    }
    leaves
}

/// Joins `exprs` pairwise, level by level, so the tree is only log2(n) deep.
fn fold_balanced(mut exprs: Vec<SimpleExpr>, connective: Connective) -> SimpleExpr {
    while exprs.len() > 1 {
        let mut joined = Vec::with_capacity(exprs.len().div_ceil(2));
        let mut rest = exprs.into_iter();
        while let Some(left) = rest.next() {
            joined.push(match rest.next() {
                Some(right) => match connective {
                    Connective::Or => left.or(right),
                    Connective::And => left.and(right),
                },
                None => left,
            });
        }
        exprs = joined;
    }
    exprs
        .pop()
        .unwrap_or_else(|| SimpleExpr::Constant((connective == Connective::And).into()))
}

fn string_value(value: &str) -> Value {
    Value::String(Some(Box::new(value.to_string())))
}
