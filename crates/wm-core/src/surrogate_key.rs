//! Surrogate key derivation shared by the SQL templates and Rust-side checks.
//!
//! A key is `md5(part_1 || '-' || part_2 || ...)` where every part is the
//! VARCHAR rendering of a natural key column and a NULL part is replaced by
//! [`NULL_PLACEHOLDER`]. The SQL expression produced by [`sql_expression`]
//! and the Rust function [`surrogate_key`] yield identical lowercase hex
//! digests for identical inputs.

use crate::sql_utils::{escape_sql_string, quote_qualified};
use md5::{Digest, Md5};

/// Literal placed between key parts before hashing.
pub const KEY_SEPARATOR: &str = "-";

/// Stand-in for a NULL key part. Numeric ids can never render to this.
pub const NULL_PLACEHOLDER: &str = "__null__";

/// Concatenate key parts the way the SQL expression does, before hashing.
pub fn key_input(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .map(|p| p.unwrap_or(NULL_PLACEHOLDER))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Compute the surrogate key for a row's natural key parts.
pub fn surrogate_key(parts: &[Option<&str>]) -> String {
    let digest = Md5::digest(key_input(parts).as_bytes());
    hex::encode(digest)
}

/// Surrogate key for the weather mart: `(weather_id, country_id)`.
pub fn weather_country_key(weather_id: Option<i64>, country_id: Option<i64>) -> String {
    let weather = weather_id.map(|id| id.to_string());
    let country = country_id.map(|id| id.to_string());
    surrogate_key(&[weather.as_deref(), country.as_deref()])
}

/// Render the DuckDB expression computing the key over `columns`.
///
/// Columns may be qualified (`weather.weather_id`); each part is quoted.
pub fn sql_expression(columns: &[String]) -> String {
    let null = escape_sql_string(NULL_PLACEHOLDER);
    let sep = escape_sql_string(KEY_SEPARATOR);
    let parts = columns
        .iter()
        .map(|c| {
            format!(
                "COALESCE(CAST({} AS VARCHAR), '{}')",
                quote_qualified(c),
                null
            )
        })
        .collect::<Vec<_>>()
        .join(&format!(" || '{}' || ", sep));
    format!("MD5({})", parts)
}
