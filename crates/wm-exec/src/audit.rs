//! Cross-check of the persisted mart against the reference join.
//!
//! Reads the staged relations and `mart_final` back from the warehouse,
//! recomputes the mart in Rust with [`wm_core::records::build_mart`] and
//! reports where they disagree.

use crate::compile::CompiledProject;
use crate::error::{ExecError, ExecResult};
use wm_core::records::{audit_mart, MartAudit};
use wm_core::{CountryRecord, MartRecord, WeatherRecord};
use wm_db::{CellValue, Database, QueryRows};

pub const WEATHER_MODEL: &str = "stg_weather";
pub const COUNTRY_MODEL: &str = "stg_country";
pub const MART_MODEL: &str = "mart_final";

fn relation(compiled: &CompiledProject, model: &str) -> ExecResult<String> {
    compiled
        .model(model)
        .map(|m| m.quoted_relation())
        .ok_or_else(|| ExecError::AuditModelMissing {
            model: model.to_string(),
        })
}

/// Typed access to a row by column position
struct Row<'r> {
    relation: &'r str,
    cells: &'r [CellValue],
}

impl Row<'_> {
    fn cell(&self, idx: usize) -> ExecResult<&CellValue> {
        self.cells.get(idx).ok_or_else(|| ExecError::AuditRow {
            relation: self.relation.to_string(),
            message: format!("missing column {}", idx),
        })
    }

    fn int(&self, idx: usize) -> ExecResult<Option<i64>> {
        match self.cell(idx)? {
            CellValue::Null => Ok(None),
            v => v.as_i64().map(Some).ok_or_else(|| self.mismatch(idx, "an integer", v)),
        }
    }

    fn float(&self, idx: usize) -> ExecResult<Option<f64>> {
        match self.cell(idx)? {
            CellValue::Null => Ok(None),
            v => v.as_f64().map(Some).ok_or_else(|| self.mismatch(idx, "a number", v)),
        }
    }

    fn text(&self, idx: usize) -> ExecResult<Option<String>> {
        match self.cell(idx)? {
            CellValue::Null => Ok(None),
            v => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.mismatch(idx, "text", v)),
        }
    }

    fn mismatch(&self, idx: usize, expected: &str, got: &CellValue) -> ExecError {
        ExecError::AuditRow {
            relation: self.relation.to_string(),
            message: format!("column {} should be {}, got {}", idx, expected, got),
        }
    }
}

fn rows<'r>(relation: &'r str, result: &'r QueryRows) -> impl Iterator<Item = Row<'r>> {
    result.rows.iter().map(move |cells| Row { relation, cells })
}

async fn read_weather(db: &dyn Database, relation: &str) -> ExecResult<Vec<WeatherRecord>> {
    let result = db
        .query_rows(&format!(
            "SELECT CAST(weather_id AS BIGINT), CAST(city AS VARCHAR), \
             CAST(country_name AS VARCHAR), CAST(temperature AS DOUBLE), \
             CAST(humidity AS BIGINT) FROM {}",
            relation
        ))
        .await?;
    rows(relation, &result)
        .map(|r| -> ExecResult<WeatherRecord> {
            Ok(WeatherRecord {
                weather_id: r.int(0)?,
                city: r.text(1)?,
                country_name: r.text(2)?,
                temperature: r.float(3)?,
                humidity: r.int(4)?,
            })
        })
        .collect()
}

async fn read_countries(db: &dyn Database, relation: &str) -> ExecResult<Vec<CountryRecord>> {
    let result = db
        .query_rows(&format!(
            "SELECT CAST(country_id AS BIGINT), CAST(country_name AS VARCHAR), \
             CAST(capital AS VARCHAR), CAST(population AS BIGINT), \
             CAST(region AS VARCHAR) FROM {}",
            relation
        ))
        .await?;
    rows(relation, &result)
        .map(|r| -> ExecResult<CountryRecord> {
            Ok(CountryRecord {
                country_id: r.int(0)?,
                country_name: r.text(1)?,
                capital: r.text(2)?,
                population: r.int(3)?,
                region: r.text(4)?,
            })
        })
        .collect()
}

async fn read_mart(db: &dyn Database, relation: &str) -> ExecResult<Vec<MartRecord>> {
    let result = db
        .query_rows(&format!(
            "SELECT CAST(unique_key AS VARCHAR), CAST(weather_id AS BIGINT), \
             CAST(city AS VARCHAR), CAST(temperature AS DOUBLE), CAST(humidity AS BIGINT), \
             CAST(country_name AS VARCHAR), CAST(capital AS VARCHAR), \
             CAST(population AS BIGINT), CAST(region AS VARCHAR) FROM {}",
            relation
        ))
        .await?;
    rows(relation, &result)
        .map(|r| -> ExecResult<MartRecord> {
            Ok(MartRecord {
                unique_key: r.text(0)?.unwrap_or_default(),
                weather_id: r.int(1)?,
                city: r.text(2)?,
                temperature: r.float(3)?,
                humidity: r.int(4)?,
                country_name: r.text(5)?,
                capital: r.text(6)?,
                population: r.int(7)?,
                region: r.text(8)?,
            })
        })
        .collect()
}

/// Read the persisted mart rows
pub async fn read_mart_records(
    db: &dyn Database,
    compiled: &CompiledProject,
) -> ExecResult<Vec<MartRecord>> {
    read_mart(db, &relation(compiled, MART_MODEL)?).await
}

/// Compare `mart_final` with the join of `stg_weather` and `stg_country`
pub async fn audit_project(db: &dyn Database, compiled: &CompiledProject) -> ExecResult<MartAudit> {
    let weather = read_weather(db, &relation(compiled, WEATHER_MODEL)?).await?;
    let countries = read_countries(db, &relation(compiled, COUNTRY_MODEL)?).await?;
    let mart = read_mart_records(db, compiled).await?;

    let audit = audit_mart(&weather, &countries, &mart);
    log::debug!(
        "Audit: {} weather rows, {} expected, {} actual",
        audit.weather_rows,
        audit.expected_rows,
        audit.actual_rows
    );
    Ok(audit)
}
