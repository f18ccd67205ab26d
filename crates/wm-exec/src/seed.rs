//! Loading seed CSVs into raw tables

use crate::error::{ExecError, ExecResult};
use crate::run_results::RunStatus;
use serde::Serialize;
use std::time::Instant;
use wm_core::sql_utils::{quote_qualified, split_qualified_name};
use wm_core::{Project, Seed};
use wm_db::{CsvLoadOptions, Database, DbResult};

/// Outcome of loading one seed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedResult {
    pub seed: String,
    pub relation: String,
    pub status: RunStatus,
    pub rows: usize,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Seeds to load: all of them, or the named ones in project order.
///
/// Naming a seed that does not exist is an error.
pub fn select_seeds<'a>(project: &'a Project, names: Option<&[String]>) -> ExecResult<Vec<&'a Seed>> {
    let Some(names) = names.filter(|n| !n.is_empty()) else {
        return Ok(project.seeds.iter().collect());
    };

    for name in names {
        if !project.seeds.iter().any(|s| &s.name == name) {
            let available: Vec<&str> = project.seeds.iter().map(|s| s.name.as_str()).collect();
            return Err(ExecError::UnknownSeed {
                name: name.clone(),
                available: if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                },
            });
        }
    }

    Ok(project
        .seeds
        .iter()
        .filter(|s| names.contains(&s.name))
        .collect())
}

async fn load_seed(
    db: &dyn Database,
    seed: &Seed,
    relation: &str,
    full_refresh: bool,
) -> DbResult<usize> {
    let (schema, _) = split_qualified_name(relation);
    if relation.contains('.') {
        db.create_schema_if_not_exists(schema).await?;
    }
    if full_refresh {
        db.drop_if_exists(relation).await?;
    }

    let options = CsvLoadOptions {
        delimiter: seed.config.delimiter,
        column_types: seed.config.column_types.clone(),
    };
    db.load_csv(relation, &seed.path.display().to_string(), &options)
        .await?;
    db.query_count(&format!("SELECT * FROM {}", quote_qualified(relation)))
        .await
}

/// Load the given seeds, creating their schemas as needed.
///
/// Disabled seeds are reported as skipped. A seed that fails to load does
/// not stop the others.
pub async fn load_seeds(
    db: &dyn Database,
    project: &Project,
    seeds: &[&Seed],
    full_refresh: bool,
) -> Vec<SeedResult> {
    let default_schema = project.config.schema.as_deref();
    let mut results = Vec::with_capacity(seeds.len());

    for seed in seeds {
        let relation = seed.qualified_name(default_schema);
        let timer = Instant::now();

        let (status, rows, error) = if !seed.is_enabled() {
            log::debug!("Seed {} is disabled", seed.name);
            (RunStatus::Skipped, 0, None)
        } else {
            match load_seed(db, seed, &relation, full_refresh).await {
                Ok(rows) => (RunStatus::Success, rows, None),
                Err(e) => {
                    log::warn!("Seed {} failed: {}", seed.name, e);
                    (RunStatus::Error, 0, Some(e.to_string()))
                }
            }
        };

        results.push(SeedResult {
            seed: seed.name.clone(),
            relation,
            status,
            rows,
            duration_secs: timer.elapsed().as_secs_f64(),
            error,
        });
    }

    results
}
