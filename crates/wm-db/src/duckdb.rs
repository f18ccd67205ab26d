//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{CellValue, CsvLoadOptions, Database, QueryRows, RelationKind};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use wm_core::sql_utils::{escape_sql_string, quote_ident, quote_qualified, split_qualified_name};

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) a DuckDB database file
    pub fn from_path(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::ConnectionError(format!("{}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        log::debug!("duckdb execute: {}", sql);
        let conn = self.lock()?;
        conn.execute(sql, []).map_err(|e| with_sql(e, sql))
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(|e| with_sql(e, sql))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn relation_kind_sync(&self, name: &str) -> DbResult<Option<RelationKind>> {
        let (schema, table) = split_qualified_name(name);
        let sql = format!(
            "SELECT table_type FROM information_schema.tables \
             WHERE table_schema = '{}' AND table_name = '{}'",
            escape_sql_string(schema),
            escape_sql_string(table)
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let table_type: String = row.get(0)?;
                Ok(Some(if table_type.eq_ignore_ascii_case("VIEW") {
                    RelationKind::View
                } else {
                    RelationKind::Table
                }))
            }
            None => Ok(None),
        }
    }

    fn query_rows_sync(&self, sql: &str, limit: Option<usize>) -> DbResult<QueryRows> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(|e| with_sql(e, sql))?;
        let mut rows = stmt.query([]).map_err(|e| with_sql(e, sql))?;

        // column metadata is only available once the statement has run
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            if limit.is_some_and(|l| out.len() >= l) {
                break;
            }
            let cells = (0..columns.len())
                .map(|i| row.get::<_, Value>(i).map(cell_from_value))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(cells);
        }

        Ok(QueryRows { columns, rows: out })
    }

    fn merge_into_sync(&self, name: &str, select: &str, unique_key: &[String]) -> DbResult<usize> {
        if unique_key.is_empty() {
            return Err(DbError::MissingUniqueKey(name.to_string()));
        }

        let target = quote_qualified(name);
        let (_, table) = split_qualified_name(name);
        let target_alias = quote_ident(table);
        let matches = unique_key
            .iter()
            .map(|k| {
                let k = quote_ident(k);
                format!("wm_src.{k} = {target_alias}.{k}")
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE OR REPLACE TEMP TABLE wm_merge_src AS {select}"
        ))
        .map_err(|e| with_sql(e, select))?;
        let deleted = tx.execute(
            &format!(
                "DELETE FROM {target} WHERE EXISTS \
                 (SELECT 1 FROM wm_merge_src AS wm_src WHERE {matches})"
            ),
            [],
        )?;
        let inserted = tx.execute(
            &format!("INSERT INTO {target} BY NAME SELECT * FROM wm_merge_src"),
            [],
        )?;
        tx.execute_batch("DROP TABLE wm_merge_src")?;
        tx.commit()?;

        log::debug!(
            "Merged into {}: {} replaced, {} written",
            name,
            deleted,
            inserted
        );
        Ok(inserted)
    }
}

fn with_sql(err: duckdb::Error, sql: &str) -> DbError {
    match DbError::from(err) {
        DbError::ExecutionError(msg) => DbError::ExecutionError(format!("{}\n  SQL: {}", msg, sql)),
        other => other,
    }
}

fn cell_from_value(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Boolean(b) => CellValue::Boolean(b),
        Value::TinyInt(i) => CellValue::Integer(i.into()),
        Value::SmallInt(i) => CellValue::Integer(i.into()),
        Value::Int(i) => CellValue::Integer(i.into()),
        Value::BigInt(i) => CellValue::Integer(i),
        Value::UTinyInt(i) => CellValue::Integer(i.into()),
        Value::USmallInt(i) => CellValue::Integer(i.into()),
        Value::UInt(i) => CellValue::Integer(i.into()),
        Value::UBigInt(i) => i64::try_from(i)
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        Value::HugeInt(i) => i64::try_from(i)
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::Text(i.to_string())),
        Value::Float(f) => CellValue::Double(f.into()),
        Value::Double(f) => CellValue::Double(f),
        Value::Text(s) => CellValue::Text(s),
        other => CellValue::Text(format!("{:?}", other)),
    }
}

fn csv_options_sql(options: &CsvLoadOptions) -> String {
    let mut parts = vec![
        "header = true".to_string(),
        format!(
            "delim = '{}'",
            escape_sql_string(&options.delimiter.to_string())
        ),
    ];
    if !options.column_types.is_empty() {
        let types = options
            .column_types
            .iter()
            .map(|(col, ty)| format!("'{}': '{}'", escape_sql_string(col), escape_sql_string(ty)))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("types = {{{}}}", types));
    }
    parts.join(", ")
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn create_table_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let verb = if replace {
            "CREATE OR REPLACE TABLE"
        } else {
            "CREATE TABLE"
        };
        self.execute_sync(&format!("{} {} AS {}", verb, quote_qualified(name), select))?;
        Ok(())
    }

    async fn create_view_as(&self, name: &str, select: &str, replace: bool) -> DbResult<()> {
        let verb = if replace {
            "CREATE OR REPLACE VIEW"
        } else {
            "CREATE VIEW"
        };
        self.execute_sync(&format!("{} {} AS {}", verb, quote_qualified(name), select))?;
        Ok(())
    }

    async fn merge_into(
        &self,
        name: &str,
        select: &str,
        unique_key: &[String],
    ) -> DbResult<usize> {
        self.merge_into_sync(name, select, unique_key)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        Ok(self.relation_kind_sync(name)?.is_some())
    }

    async fn relation_kind(&self, name: &str) -> DbResult<Option<RelationKind>> {
        self.relation_kind_sync(name)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn query_sample_rows(&self, sql: &str, limit: usize) -> DbResult<Vec<String>> {
        let result = self.query_rows_sync(sql, Some(limit))?;
        Ok(result
            .rows
            .iter()
            .map(|row| {
                result
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(col, val)| format!("{}={}", col, val))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect())
    }

    async fn query_rows(&self, sql: &str) -> DbResult<QueryRows> {
        self.query_rows_sync(sql, None)
    }

    async fn load_csv(&self, table: &str, path: &str, options: &CsvLoadOptions) -> DbResult<()> {
        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto('{}', {})",
            quote_qualified(table),
            escape_sql_string(path),
            csv_options_sql(options)
        );
        self.execute_sync(&sql)
            .map_err(|e| DbError::CsvError(format!("{}: {}", path, e)))?;
        Ok(())
    }

    async fn drop_if_exists(&self, name: &str) -> DbResult<()> {
        let quoted = quote_qualified(name);
        match self.relation_kind_sync(name)? {
            Some(RelationKind::View) => {
                self.execute_sync(&format!("DROP VIEW IF EXISTS {}", quoted))?;
            }
            Some(RelationKind::Table) => {
                self.execute_sync(&format!("DROP TABLE IF EXISTS {}", quoted))?;
            }
            None => {}
        }
        Ok(())
    }

    async fn create_schema_if_not_exists(&self, schema: &str) -> DbResult<()> {
        self.execute_sync(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            quote_ident(schema)
        ))?;
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
