//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of an existing relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

/// Options for loading a CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLoadOptions {
    pub delimiter: char,
    /// Column name -> SQL type overrides for type inference
    pub column_types: BTreeMap<String, String>,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            column_types: BTreeMap::new(),
        }
    }
}

/// A single value read back from a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
}

impl CellValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Double(f) => Some(*f),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Double(d) => write!(f, "{}", d),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Column names and rows of a query result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryRows {
    /// Position of a column by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Database abstraction trait for Weathermart
///
/// Relation names are passed unquoted (`schema.name` or `name`);
/// implementations quote them.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Create table from SELECT statement
    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Create view from SELECT statement
    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()>;

    /// Upsert the rows of `select` into an existing table, keyed on `unique_key`.
    ///
    /// Rows whose key matches a source row are replaced; the rest are kept.
    /// Runs in a single transaction and returns the number of rows written.
    async fn merge_into(&self, name: &str, select: &str, unique_key: &[String])
        -> DbResult<usize>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Whether `name` is a table, a view, or absent
    async fn relation_kind(&self, name: &str) -> DbResult<Option<RelationKind>>;

    /// Number of rows a query returns
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Up to `limit` rows of a query, each formatted as `col=value, ...`
    async fn query_sample_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>>;

    /// All rows of a query
    async fn query_rows(&self, sql: &str) -> DbResult<QueryRows>;

    /// Load a CSV file into a table, replacing it
    async fn load_csv(&self, table: &str, path: &str, options: &CsvLoadOptions) -> DbResult<()>;

    /// Drop a table or view if it exists
    async fn drop_if_exists(&self, name: &str) -> DbResult<()>;

    /// Create a schema if it does not exist
    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
