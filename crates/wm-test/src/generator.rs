//! Test SQL generation
//!
//! Every generator returns a query selecting the rows that violate the
//! test. Relation names are passed unquoted and quoted here.

use thiserror::Error;
use wm_core::model::{SchemaTest, TestOrigin, TestType};
use wm_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified};

/// Error type for test SQL generation
#[derive(Error, Debug)]
pub enum TestGenError {
    /// Invalid threshold value (NaN or Infinity)
    #[error("invalid threshold value: {0}")]
    InvalidThreshold(String),
}

/// Result type alias for test generation
pub type TestGenResult<T> = Result<T, TestGenError>;

/// Duplicated values, one row per value
pub fn generate_unique_test(table: &str, column: &str) -> String {
    let qt = quote_qualified(table);
    let qc = quote_ident(column);
    format!("SELECT {qc}, COUNT(*) AS cnt\nFROM {qt}\nWHERE {qc} IS NOT NULL\nGROUP BY {qc}\nHAVING COUNT(*) > 1")
}

/// Rows where the column is NULL
pub fn generate_not_null_test(table: &str, column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} IS NULL",
        quote_qualified(table),
        quote_ident(column)
    )
}

/// Rows whose value is outside the list, or NULL.
///
/// Unquoted values that parse as numbers are emitted as numeric literals;
/// everything else is quoted.
pub fn generate_accepted_values_test(
    table: &str,
    column: &str,
    values: &[String],
    quote: bool,
) -> String {
    let values_list = values
        .iter()
        .map(|v| {
            if !quote && v.parse::<f64>().is_ok() {
                v.clone()
            } else {
                format!("'{}'", escape_sql_string(v))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let qt = quote_qualified(table);
    let qc = quote_ident(column);

    format!("SELECT * FROM {qt} WHERE {qc} NOT IN ({values_list}) OR {qc} IS NULL")
}

fn finite(kind: &str, value: f64) -> TestGenResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TestGenError::InvalidThreshold(format!(
            "{} must be finite, got {}",
            kind, value
        )))
    }
}

/// Rows below `min`. NULLs are not checked.
pub fn generate_min_value_test(table: &str, column: &str, min: f64) -> TestGenResult<String> {
    let min = finite("min_value", min)?;
    Ok(format!(
        "SELECT * FROM {} WHERE {} < {}",
        quote_qualified(table),
        quote_ident(column),
        min
    ))
}

/// Rows above `max`. NULLs are not checked.
pub fn generate_max_value_test(table: &str, column: &str, max: f64) -> TestGenResult<String> {
    let max = finite("max_value", max)?;
    Ok(format!(
        "SELECT * FROM {} WHERE {} > {}",
        quote_qualified(table),
        quote_ident(column),
        max
    ))
}

/// Non-null values of `table.column` missing from `ref_table.ref_column`
pub fn generate_relationship_test(
    table: &str,
    column: &str,
    ref_table: &str,
    ref_column: &str,
) -> String {
    let qt = quote_qualified(table);
    let qc = quote_ident(column);
    let qrt = quote_qualified(ref_table);
    let qrc = quote_ident(ref_column);
    format!(
        "SELECT src.{qc}\n\
         FROM {qt} AS src\n\
         WHERE src.{qc} IS NOT NULL\n\
         \x20 AND NOT EXISTS (\n\
         \x20   SELECT 1 FROM {qrt} AS ref_tbl\n\
         \x20   WHERE ref_tbl.{qrc} = src.{qc}\n\
         \x20 )"
    )
}

/// The single `TestType` -> SQL mapping.
///
/// An invalid threshold yields a query returning one row, so the test fails
/// with the reason instead of passing silently.
fn generate_sql_for_test_type(
    test_type: &TestType,
    table: &str,
    column: &str,
    ref_table: Option<&str>,
) -> String {
    let failing = |e: TestGenError| {
        format!(
            "SELECT '{}' AS error",
            escape_sql_string(&format!("ERROR: {}", e))
        )
    };
    match test_type {
        TestType::Unique => generate_unique_test(table, column),
        TestType::NotNull => generate_not_null_test(table, column),
        TestType::AcceptedValues { values, quote } => {
            generate_accepted_values_test(table, column, values, *quote)
        }
        TestType::MinValue { value } => {
            generate_min_value_test(table, column, *value).unwrap_or_else(failing)
        }
        TestType::MaxValue { value } => {
            generate_max_value_test(table, column, *value).unwrap_or_else(failing)
        }
        TestType::Relationships { to, field } => {
            let ref_column = field.as_deref().unwrap_or(column);
            generate_relationship_test(table, column, ref_table.unwrap_or(to), ref_column)
        }
    }
}

/// Test SQL with metadata
#[derive(Debug, Clone)]
pub struct GeneratedTest {
    /// Stable test name, e.g. `unique_mart_final__unique_key`
    pub name: String,

    /// Relation the test runs against (unquoted)
    pub relation: String,

    pub column: String,

    pub test_type: TestType,

    pub origin: TestOrigin,

    pub sql: String,
}

impl GeneratedTest {
    /// Generate a test against the relation named in the definition
    pub fn from_schema_test(test: &SchemaTest) -> Self {
        Self::from_schema_test_resolved(test, |name| name.to_string())
    }

    /// Generate a test, mapping model names to their relations.
    ///
    /// `resolve` is applied to the tested relation of model tests and to the
    /// `to` of relationship tests; source tests already carry `schema.table`.
    pub fn from_schema_test_resolved(test: &SchemaTest, resolve: impl Fn(&str) -> String) -> Self {
        let relation = match test.origin {
            TestOrigin::Model => resolve(&test.relation),
            TestOrigin::Source => test.relation.clone(),
        };
        let ref_table = match &test.test_type {
            TestType::Relationships { to, .. } => Some(resolve(to)),
            _ => None,
        };
        let sql = generate_sql_for_test_type(
            &test.test_type,
            &relation,
            &test.column,
            ref_table.as_deref(),
        );

        Self {
            name: test.name(),
            relation,
            column: test.column.clone(),
            test_type: test.test_type.clone(),
            origin: test.origin,
            sql,
        }
    }
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod tests;
