//! Model representation

pub mod schema;
pub mod testing;

pub use schema::{ModelSchema, SchemaColumnDef};
pub use testing::{
    expand_column_tests, parse_test_definition, SchemaTest, TestDefinition, TestOrigin,
    TestParams, TestType,
};

use crate::config::Materialization;
use crate::error::{read_file, CoreError, CoreResult};
use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A SQL model template in the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model name (file stem)
    pub name: ModelName,

    /// Path to the SQL template
    pub path: PathBuf,

    /// Template text before rendering
    pub raw_sql: String,

    /// Schema metadata from the 1:1 .yml file, if present
    #[serde(default)]
    pub schema: Option<ModelSchema>,
}

/// Configuration captured from a model's `config()` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Materialization type (view, table or incremental)
    #[serde(default)]
    pub materialized: Option<Materialization>,

    /// Target schema
    #[serde(default)]
    pub schema: Option<String>,

    /// Unique key column(s) for incremental merge, comma separated
    #[serde(default)]
    pub unique_key: Option<String>,
}

impl ModelConfig {
    /// Split `unique_key` into trimmed column names
    pub fn unique_key_columns(&self) -> Vec<String> {
        self.unique_key
            .as_deref()
            .map(|k| {
                k.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Model {
    /// Load a model from its SQL file, picking up a sibling `.yml`/`.yaml`.
    pub fn from_file(path: PathBuf) -> CoreResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::ModelParseError {
                name: path.display().to_string(),
                message: "Cannot extract model name from path".to_string(),
            })?;
        let name = ModelName::parse(stem)?;

        let raw_sql = read_file(&path)?;
        if raw_sql.trim().is_empty() {
            return Err(CoreError::ModelParseError {
                name: name.into_inner(),
                message: "SQL file is empty".to_string(),
            });
        }

        let schema = schema_file_for(&path)
            .map(|p| ModelSchema::load(&p, &name))
            .transpose()?;

        Ok(Self {
            name,
            path,
            raw_sql,
            schema,
        })
    }

    /// Column tests declared in this model's schema file
    pub fn schema_tests(&self) -> Vec<SchemaTest> {
        self.schema
            .as_ref()
            .map(|s| s.tests_for(&self.name))
            .unwrap_or_default()
    }

    /// Description from the schema file
    pub fn description(&self) -> Option<&str> {
        self.schema.as_ref().and_then(|s| s.description.as_deref())
    }
}

fn schema_file_for(sql_path: &Path) -> Option<PathBuf> {
    ["yml", "yaml"]
        .iter()
        .map(|ext| sql_path.with_extension(ext))
        .find(|p| p.exists())
}

/// Discover every `*.sql` model under the given directories, recursively.
///
/// Files are returned sorted by path. Name clashes are reported by the
/// project loader, not here.
pub fn discover_models(model_paths: &[PathBuf]) -> CoreResult<Vec<Model>> {
    let mut files = Vec::new();
    for dir in model_paths {
        if dir.exists() {
            collect_sql_files(dir, &mut files)?;
        }
    }
    files.sort();

    files.into_iter().map(Model::from_file).collect()
}

fn collect_sql_files(dir: &Path, out: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sql_files(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "sql") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
