//! Model compilation: template rendering, dependency capture and DAG ordering.
//!
//! Compiling is done in two passes. The first renders every model against
//! relations in the project's default schema, which is enough to read each
//! model's `config()`. The second renders again with every `ref()` pointing
//! at the schema the referenced model configured for itself.

use crate::error::{ExecError, ExecResult};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use wm_core::checksum::compute_checksum;
use wm_core::manifest::{Manifest, ManifestModel};
use wm_core::sql_utils::{qualify, quote_qualified};
use wm_core::{Materialization, ModelDag, ModelName, Project};
use wm_jinja::{IncrementalState, JinjaEnvironment, ModelContext, Relations, RenderedModel};

/// Inputs to a compile beyond the project itself
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Rebuild incremental models from scratch
    pub full_refresh: bool,

    /// Unquoted relations already present in the warehouse.
    ///
    /// An incremental model whose relation is listed renders with
    /// `is_incremental()` true.
    pub existing_relations: HashSet<String>,
}

/// A rendered model ready to materialize
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModel {
    pub name: ModelName,

    /// Template path
    pub path: PathBuf,

    /// Unquoted `schema.name`, or `name` when no schema applies
    pub relation: String,

    pub schema: Option<String>,

    /// Rendered SELECT
    pub sql: String,

    pub materialization: Materialization,

    /// Merge key columns for incremental models
    pub unique_key: Vec<String>,

    /// Models referenced through `ref()`
    pub refs: Vec<ModelName>,

    /// `source.table` pairs referenced through `source()`
    pub sources: Vec<String>,
}

impl CompiledModel {
    /// Relation name quoted for SQL
    pub fn quoted_relation(&self) -> String {
        quote_qualified(&self.relation)
    }

    pub fn checksum(&self) -> String {
        compute_checksum(&self.sql)
    }
}

/// Every model of a project, compiled and ordered
#[derive(Debug)]
pub struct CompiledProject {
    pub models: BTreeMap<ModelName, CompiledModel>,
    pub dag: ModelDag,
    /// Upstream models first
    pub execution_order: Vec<ModelName>,
}

impl CompiledProject {
    pub fn model(&self, name: &str) -> Option<&CompiledModel> {
        self.models.get(name)
    }

    /// Models matching a selector, in execution order. `None` selects all.
    pub fn select(&self, selector: Option<&str>) -> ExecResult<Vec<ModelName>> {
        match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sel) => Ok(self.dag.select(sel)?),
            None => Ok(self.execution_order.clone()),
        }
    }

    /// Relation a model test runs against, by model name
    pub fn relation_of(&self, name: &str) -> Option<&str> {
        self.models.get(name).map(|m| m.relation.as_str())
    }

    /// Incremental models, by relation
    pub fn incremental_relations(&self) -> Vec<&str> {
        self.models
            .values()
            .filter(|m| m.materialization == Materialization::Incremental)
            .map(|m| m.relation.as_str())
            .collect()
    }

    /// Build the manifest for this compile
    pub fn manifest(&self, project: &Project) -> Manifest {
        let models = self
            .models
            .iter()
            .map(|(name, m)| {
                let entry = ManifestModel {
                    name: name.clone(),
                    source_path: relative_to(&m.path, &project.root),
                    compiled_path: relative_to(&compiled_sql_path(project, name), &project.root),
                    materialized: m.materialization,
                    relation: m.relation.clone(),
                    schema: m.schema.clone(),
                    unique_key: m.unique_key.clone(),
                    depends_on: m.refs.clone(),
                    sources: m.sources.clone(),
                    checksum: m.checksum(),
                };
                (name.clone(), entry)
            })
            .collect();

        let sources = project
            .sources
            .iter()
            .flat_map(|src| {
                src.tables.iter().map(move |t| {
                    (format!("{}.{}", src.name, t.name), src.qualified_name(t))
                })
            })
            .collect();

        Manifest {
            project_name: project.config.name.clone(),
            compiled_at: Utc::now().to_rfc3339(),
            models,
            execution_order: self.execution_order.clone(),
            sources,
        }
    }

    /// Write `compiled/<model>.sql` for the given models and `manifest.json`
    /// into the target directory.
    pub fn write_artifacts(&self, project: &Project, models: &[ModelName]) -> ExecResult<Manifest> {
        for name in models {
            let Some(model) = self.models.get(name) else {
                continue;
            };
            let path = compiled_sql_path(project, name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ExecError::artifact(parent, e))?;
            }
            std::fs::write(&path, format!("{}\n", model.sql))
                .map_err(|e| ExecError::artifact(&path, e))?;
        }

        let manifest = self.manifest(project);
        let manifest_path = manifest_path(project);
        manifest.save(&manifest_path)?;
        log::debug!("Wrote manifest to {}", manifest_path.display());
        Ok(manifest)
    }
}

/// `target/compiled/<model>.sql`
pub fn compiled_sql_path(project: &Project, name: &str) -> PathBuf {
    project
        .target_dir()
        .join("compiled")
        .join(format!("{}.sql", name))
}

/// `target/manifest.json`
pub fn manifest_path(project: &Project) -> PathBuf {
    project.target_dir().join("manifest.json")
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Render every model, build the dependency graph and order it.
///
/// Any unresolved `ref()` or `source()` fails the whole compile, as does a
/// dependency cycle or an incremental model without a `unique_key`.
pub fn compile_project(project: &Project, options: &CompileOptions) -> ExecResult<CompiledProject> {
    let default_schema = project.config.schema.as_deref();

    // Pass 1: configs only
    let provisional: HashMap<String, String> = project
        .models
        .keys()
        .map(|name| {
            (
                name.to_string(),
                quote_qualified(&qualify(default_schema, name)),
            )
        })
        .collect();
    let env = JinjaEnvironment::with_relations(
        &project.config.vars,
        Relations::new(provisional.clone(), project.source_lookup()),
    );

    let mut relations: HashMap<ModelName, (Option<String>, String)> = HashMap::new();
    let mut materializations: HashMap<ModelName, Materialization> = HashMap::new();
    for (name, model) in &project.models {
        let ctx = ModelContext {
            this: provisional.get(name.as_str()).cloned().unwrap_or_default(),
            incremental: IncrementalState::default(),
        };
        let rendered = env
            .render_model(&model.raw_sql, &ctx)
            .map_err(|e| ExecError::render(name, e))?;
        let schema = rendered
            .config
            .schema
            .clone()
            .or_else(|| default_schema.map(String::from));
        let relation = qualify(schema.as_deref(), name);
        relations.insert(name.clone(), (schema, relation));
        materializations.insert(
            name.clone(),
            rendered
                .config
                .materialized
                .unwrap_or(project.config.materialization),
        );
    }

    // Pass 2: final relations
    let final_relations: HashMap<String, String> = relations
        .iter()
        .map(|(name, (_, rel))| (name.to_string(), quote_qualified(rel)))
        .collect();
    let env = JinjaEnvironment::with_relations(
        &project.config.vars,
        Relations::new(final_relations, project.source_lookup()),
    );

    let mut models = BTreeMap::new();
    for (name, model) in &project.models {
        let (schema, relation) = relations
            .get(name)
            .cloned()
            .unwrap_or_else(|| (None, name.to_string()));
        let materialization = materializations
            .get(name)
            .copied()
            .unwrap_or(project.config.materialization);

        let ctx = ModelContext {
            this: quote_qualified(&relation),
            incremental: IncrementalState::new(
                materialization == Materialization::Incremental,
                options.existing_relations.contains(&relation),
                options.full_refresh,
            ),
        };
        let RenderedModel {
            sql,
            config,
            refs,
            sources,
        } = env
            .render_model(&model.raw_sql, &ctx)
            .map_err(|e| ExecError::render(name, e))?;

        let unique_key = config.unique_key_columns();
        if materialization == Materialization::Incremental && unique_key.is_empty() {
            return Err(ExecError::MissingUniqueKey {
                model: name.to_string(),
            });
        }

        models.insert(
            name.clone(),
            CompiledModel {
                name: name.clone(),
                path: model.path.clone(),
                relation,
                schema,
                sql,
                materialization,
                unique_key,
                refs,
                sources,
            },
        );
    }

    let dependencies: BTreeMap<ModelName, Vec<ModelName>> = models
        .iter()
        .map(|(name, m)| (name.clone(), m.refs.clone()))
        .collect();
    let dag = ModelDag::build(&dependencies)?;
    let execution_order = dag.topological_order()?;

    log::debug!(
        "Compiled {} models, execution order: {:?}",
        models.len(),
        execution_order
    );

    Ok(CompiledProject {
        models,
        dag,
        execution_order,
    })
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;
