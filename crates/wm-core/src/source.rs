//! Source definitions for raw tables owned by an external loader
//!
//! Sources are declared in YAML files with `kind: sources` and referenced
//! from templates as `{{ source('raw', 'weather') }}`.

use crate::error::{read_file, CoreError, CoreResult};
use crate::model::{expand_column_tests, SchemaTest, TestDefinition, TestOrigin};
use crate::sql_utils::quote_qualified;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A source definition file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Must be "sources"
    pub kind: SourceKind,

    #[serde(default = "default_version")]
    pub version: u32,

    /// Logical name used as the first argument of `source()`
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Schema holding the tables
    pub schema: String,

    pub tables: Vec<SourceTable>,

    /// File this source was loaded from
    #[serde(skip)]
    pub path: PathBuf,
}

fn default_version() -> u32 {
    1
}

/// Enforces kind: sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sources,
}

/// A single table within a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTable {
    /// Logical name used in templates
    pub name: String,

    /// Physical table name, if it differs from `name`
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub columns: Vec<SourceColumn>,
}

/// Column definition within a source table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,

    #[serde(default, rename = "type")]
    pub data_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl SourceTable {
    /// Physical table name
    pub fn physical_name(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.name)
    }
}

impl SourceFile {
    /// Load and validate a source file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_file(path)?;

        let mut source: SourceFile =
            serde_yaml::from_str(&content).map_err(|e| CoreError::SourceParseError {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
        source.path = path.to_path_buf();

        if source.tables.is_empty() {
            return Err(CoreError::SourceEmptyTables {
                name: source.name.clone(),
                path: path.display().to_string(),
            });
        }

        let mut seen_tables = HashSet::new();
        for table in &source.tables {
            if !seen_tables.insert(table.name.as_str()) {
                return Err(CoreError::SourceDuplicateTable {
                    table: table.name.clone(),
                    source_name: source.name.clone(),
                });
            }
        }

        Ok(source)
    }

    /// Find a table by its logical name
    pub fn table(&self, name: &str) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// `schema.table` for a table of this source (unquoted)
    pub fn qualified_name(&self, table: &SourceTable) -> String {
        format!("{}.{}", self.schema, table.physical_name())
    }

    /// Column tests declared on every table of this source
    pub fn schema_tests(&self) -> Vec<SchemaTest> {
        self.tables
            .iter()
            .flat_map(|table| {
                let relation = self.qualified_name(table);
                table
                    .columns
                    .iter()
                    .flat_map(|col| {
                        expand_column_tests(&relation, &col.name, &col.tests, TestOrigin::Source)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Probe used to skip YAML files that are not source declarations
#[derive(Deserialize)]
struct SourceKindProbe {
    #[serde(default)]
    kind: Option<SourceKind>,
}

/// Discover and load all `kind: sources` files under the given directories.
///
/// YAML files with any other `kind` are ignored. Source names must be unique
/// across files.
pub fn discover_sources(source_paths: &[PathBuf]) -> CoreResult<Vec<SourceFile>> {
    let mut files = Vec::new();
    for dir in source_paths {
        if dir.exists() {
            collect_yaml_files(dir, &mut files)?;
        }
    }
    files.sort();

    let mut sources: Vec<SourceFile> = Vec::new();
    for path in files {
        let content = read_file(&path)?;
        let is_source = serde_yaml::from_str::<SourceKindProbe>(&content)
            .map(|p| matches!(p.kind, Some(SourceKind::Sources)))
            .unwrap_or(false);
        if !is_source {
            log::debug!("Skipping non-source YAML file {}", path.display());
            continue;
        }

        let source = SourceFile::load(&path)?;
        if let Some(prev) = sources.iter().find(|s| s.name == source.name) {
            return Err(CoreError::SourceDuplicateName {
                name: source.name.clone(),
                path1: prev.path.display().to_string(),
                path2: path.display().to_string(),
            });
        }
        sources.push(source);
    }

    Ok(sources)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            out.push(path);
        }
    }
    Ok(())
}

/// Maps `(source, table)` pairs to quoted relation names.
#[derive(Debug, Clone, Default)]
pub struct SourceLookup {
    relations: HashMap<(String, String), String>,
}

impl SourceLookup {
    /// Index every table of every source
    pub fn new(sources: &[SourceFile]) -> Self {
        let relations = sources
            .iter()
            .flat_map(|s| {
                s.tables.iter().map(move |t| {
                    (
                        (s.name.clone(), t.name.clone()),
                        quote_qualified(&s.qualified_name(t)),
                    )
                })
            })
            .collect();
        Self { relations }
    }

    /// Quoted relation for `source(source_name, table)`
    pub fn resolve(&self, source_name: &str, table: &str) -> Option<&str> {
        self.relations
            .get(&(source_name.to_string(), table.to_string()))
            .map(String::as_str)
    }

    /// Sorted `source.table` names, for error messages
    pub fn known(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .relations
            .keys()
            .map(|(s, t)| format!("{}.{}", s, t))
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
