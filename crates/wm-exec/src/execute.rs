//! Model materialization in dependency order.

use crate::compile::{compile_project, CompileOptions, CompiledModel, CompiledProject};
use crate::error::ExecResult;
use crate::run_results::{ModelRunResult, RunResults, RunStatus};
use chrono::Utc;
use std::collections::HashSet;
use std::time::Instant;
use wm_core::{Materialization, ModelName, Project};
use wm_db::{Database, DbResult, RelationKind};

/// Options for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Drop and rebuild incremental models
    pub full_refresh: bool,
    /// Model selector (`name`, `+name`, `name+`, comma separated)
    pub selector: Option<String>,
}

/// Compile a project against the current warehouse state.
///
/// Incremental models are rendered a second time once it is known whether
/// their relation already exists.
pub async fn compile_for_run(
    db: &dyn Database,
    project: &Project,
    full_refresh: bool,
) -> ExecResult<CompiledProject> {
    let mut options = CompileOptions {
        full_refresh,
        ..Default::default()
    };
    let compiled = compile_project(project, &options)?;
    if full_refresh {
        return Ok(compiled);
    }

    for relation in compiled.incremental_relations() {
        if db.relation_exists(relation).await? {
            options.existing_relations.insert(relation.to_string());
        }
    }
    if options.existing_relations.is_empty() {
        return Ok(compiled);
    }
    compile_project(project, &options)
}

/// Materialize one model, replacing a relation of the other kind if needed.
///
/// Returns the rows written by an incremental merge, zero otherwise.
pub async fn materialize(
    db: &dyn Database,
    model: &CompiledModel,
    full_refresh: bool,
) -> DbResult<usize> {
    if let Some(schema) = &model.schema {
        db.create_schema_if_not_exists(schema).await?;
    }

    let relation = model.relation.as_str();
    let existing = db.relation_kind(relation).await?;

    match model.materialization {
        Materialization::View => {
            if existing == Some(RelationKind::Table) {
                db.drop_if_exists(relation).await?;
            }
            db.create_view_as(relation, &model.sql, true).await?;
            Ok(0)
        }
        Materialization::Table => {
            if existing == Some(RelationKind::View) {
                db.drop_if_exists(relation).await?;
            }
            db.create_table_as(relation, &model.sql, true).await?;
            Ok(0)
        }
        Materialization::Incremental => {
            let merge = existing == Some(RelationKind::Table) && !full_refresh;
            if merge {
                return db.merge_into(relation, &model.sql, &model.unique_key).await;
            }
            if existing.is_some() {
                db.drop_if_exists(relation).await?;
            }
            db.create_table_as(relation, &model.sql, false).await?;
            Ok(0)
        }
    }
}

/// Materialize the selected models in order.
///
/// A failed model is reported as `error`; every model that depends on it,
/// directly or transitively, is reported as `skipped` without running.
/// `on_result` sees each result as soon as it is known.
pub async fn run_models(
    db: &dyn Database,
    compiled: &CompiledProject,
    selection: &[ModelName],
    full_refresh: bool,
    mut on_result: impl FnMut(&ModelRunResult),
) -> RunResults {
    let started_at = Utc::now();
    let mut failed: HashSet<ModelName> = HashSet::new();
    let mut results = Vec::with_capacity(selection.len());

    for name in selection {
        let Some(model) = compiled.model(name) else {
            continue;
        };
        let model_started = Utc::now();
        let timer = Instant::now();

        let upstream_failure = compiled
            .dag
            .ancestors(name)
            .into_iter()
            .find(|a| failed.contains(a));

        let (status, error) = match upstream_failure {
            Some(upstream) => (
                RunStatus::Skipped,
                Some(format!("upstream model '{}' did not build", upstream)),
            ),
            None => match materialize(db, model, full_refresh).await {
                Ok(rows) => {
                    log::debug!("Materialized {} ({} rows merged)", model.relation, rows);
                    (RunStatus::Success, None)
                }
                Err(e) => {
                    log::warn!("Model {} failed: {}", name, e);
                    (RunStatus::Error, Some(e.to_string()))
                }
            },
        };

        if status != RunStatus::Success {
            failed.insert(name.clone());
        }

        let result = ModelRunResult {
            model: name.clone(),
            relation: model.relation.clone(),
            status,
            materialization: model.materialization,
            started_at: model_started,
            duration_secs: timer.elapsed().as_secs_f64(),
            error,
        };
        on_result(&result);
        results.push(result);
    }

    RunResults::new(started_at, results)
}

/// Compile and run a project, returning the compiled project and results.
pub async fn run_project(
    db: &dyn Database,
    project: &Project,
    options: &RunOptions,
    on_result: impl FnMut(&ModelRunResult),
) -> ExecResult<(CompiledProject, RunResults)> {
    let compiled = compile_for_run(db, project, options.full_refresh).await?;
    let selection = compiled.select(options.selector.as_deref())?;
    let results = run_models(db, &compiled, &selection, options.full_refresh, on_result).await;
    Ok((compiled, results))
}

#[cfg(test)]
#[path = "execute_test.rs"]
mod tests;
