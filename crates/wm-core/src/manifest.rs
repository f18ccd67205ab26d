//! Manifest of a compiled project, written to `target/manifest.json`

use crate::config::Materialization;
use crate::error::{read_file, CoreResult};
use crate::model_name::ModelName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Compiled project metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub project_name: String,

    /// RFC 3339 compile timestamp
    pub compiled_at: String,

    /// Models keyed by name
    pub models: BTreeMap<ModelName, ManifestModel>,

    /// Execution order
    pub execution_order: Vec<ModelName>,

    /// `source.table` -> relation name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, String>,
}

/// A model entry in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestModel {
    pub name: ModelName,

    /// Path to the template
    pub source_path: String,

    /// Path to the rendered SQL
    pub compiled_path: String,

    pub materialized: Materialization,

    /// Relation the model materializes into
    pub relation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_key: Vec<String>,

    /// Models referenced through `ref()`
    pub depends_on: Vec<ModelName>,

    /// `source.table` pairs referenced through `source()`
    pub sources: Vec<String>,

    /// SHA-256 of the compiled SQL
    pub checksum: String,
}

impl Manifest {
    /// Write the manifest as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a manifest written by [`Manifest::save`]
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_file(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn model(&self, name: &str) -> Option<&ManifestModel> {
        self.models.get(name)
    }
}
