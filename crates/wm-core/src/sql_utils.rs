//! SQL identifier quoting helpers used when building DDL and test queries.

/// Quote a single SQL identifier, doubling embedded double quotes.
///
/// ```
/// use wm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("mart_final"), r#""mart_final""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote each dot-separated part of a relation name.
///
/// ```
/// use wm_core::sql_utils::quote_qualified;
/// assert_eq!(quote_qualified("raw.weather"), r#""raw"."weather""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}

/// Split `schema.relation` on the last dot; unqualified names land in `main`.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

/// Escape a value for use inside a single-quoted SQL string literal.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Join an optional schema and a relation name.
pub fn qualify(schema: Option<&str>, relation: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", s, relation),
        None => relation.to_string(),
    }
}
