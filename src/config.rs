//! Configuration: compile limits and SQL backend settings, loadable from JSON.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_QUERY_LEN: usize = 64 * 1024;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;
pub const DEFAULT_MAX_COMPARISONS: usize = 512;
pub const DEFAULT_OR_TO_IN_THRESHOLD: usize = 3;
pub const DEFAULT_TABLE: &str = "records";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Bounds on the input a [`crate::QueryLanguage`] accepts.
///
/// `max_nesting_depth` and `max_comparisons` together bound the depth of the
/// parse tree and of the predicate, and so the stack every walk over them
/// needs. Raise them only on threads with stack to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Longest query, in bytes.
    pub max_query_len: usize,
    /// Deepest bracket nesting.
    pub max_nesting_depth: usize,
    /// Most comparisons in one query.
    pub max_comparisons: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_query_len: DEFAULT_MAX_QUERY_LEN,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_comparisons: DEFAULT_MAX_COMPARISONS,
        }
    }
}

/// Settings for [`crate::sql::SqlTranslator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Table selected from by `SqlTranslator::select`.
    pub table: String,
    /// Query field name to database column name.
    pub columns: HashMap<String, String>,
    /// Minimum number of same-column tests before an `or` chain of `=` becomes `IN`
    /// (and an `and` chain of `!=` becomes `NOT IN`).
    pub or_to_in_threshold: usize,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            columns: HashMap::new(),
            or_to_in_threshold: DEFAULT_OR_TO_IN_THRESHOLD,
        }
    }
}

impl SqlConfig {
    /// The column for a query field; unmapped fields use their own name.
    pub fn column_for<'f>(&'f self, field: &'f str) -> &'f str {
        self.columns.get(field).map_or(field, String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub limits: Limits,
    pub sql: SqlConfig,
}

impl FilterConfig {
    /// Loads a config from a JSON file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: FilterConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                origin: path.display().to_string(),
                source,
            })?;

        tracing::debug!(
            path = %path.display(),
            table = %config.sql.table,
            mapped_columns = config.sql.columns.len(),
            "loaded filter config"
        );
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            origin: "<string>".to_string(),
            source,
        })
    }
}
