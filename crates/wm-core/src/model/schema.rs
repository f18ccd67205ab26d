//! Schema metadata for a model's 1:1 YAML file

use super::testing::{expand_column_tests, SchemaTest, TestDefinition, TestOrigin};
use crate::error::{read_file, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema metadata for a single model.
///
/// Lives next to the SQL file with the same stem (`mart_final.sql` +
/// `mart_final.yml`). Materialization is not configured here; use
/// `{{ config() }}` in the template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSchema {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Model name (optional, must match the SQL file if given)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub columns: Vec<SchemaColumnDef>,
}

fn default_version() -> u32 {
    1
}

/// Column documentation and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaColumnDef {
    pub name: String,

    #[serde(default, rename = "type")]
    pub data_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl ModelSchema {
    /// Load the schema file at `path` for `model`
    pub fn load(path: &Path, model: &str) -> CoreResult<Self> {
        let content = read_file(path)?;
        let schema: ModelSchema =
            serde_yaml::from_str(&content).map_err(|e| CoreError::SchemaParseError {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;

        if let Some(declared) = schema.name.as_deref() {
            if declared != model {
                return Err(CoreError::SchemaNameMismatch {
                    path: path.display().to_string(),
                    model: model.to_string(),
                    declared: declared.to_string(),
                });
            }
        }

        Ok(schema)
    }

    /// Column tests bound to `model`
    pub fn tests_for(&self, model: &str) -> Vec<SchemaTest> {
        self.columns
            .iter()
            .flat_map(|col| expand_column_tests(model, &col.name, &col.tests, TestOrigin::Model))
            .collect()
    }

    /// Look up a column definition by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&SchemaColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
