//! Seed CSV files for loading raw tables locally
//!
//! Each seed may have a sibling `.yml` with the same stem
//! (`weather.csv` + `weather.yml`) that sets its schema, column types,
//! delimiter and whether it is enabled.

use crate::error::{read_file, CoreError, CoreResult};
use crate::sql_utils::qualify;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A CSV seed file in the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Table name (file stem)
    pub name: String,

    /// Path to the CSV file
    pub path: PathBuf,

    #[serde(default)]
    pub config: SeedConfig,
}

/// Options from a seed's 1:1 YAML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Target schema (defaults to the project schema)
    #[serde(default)]
    pub schema: Option<String>,

    /// Column name -> SQL type overrides for CSV type inference
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_enabled() -> bool {
    true
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            description: None,
            schema: None,
            column_types: BTreeMap::new(),
            delimiter: default_delimiter(),
            enabled: default_enabled(),
        }
    }
}

impl SeedConfig {
    /// Load seed options from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_file(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::SeedInvalid {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl Seed {
    /// Create a seed from a CSV path, picking up a sibling `.yml`/`.yaml`
    pub fn from_file(path: PathBuf) -> CoreResult<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::SeedInvalid {
                path: path.display().to_string(),
                message: "Invalid file name".to_string(),
            })?
            .to_string();

        let config = ["yml", "yaml"]
            .iter()
            .map(|ext| path.with_extension(ext))
            .find(|p| p.exists())
            .map(|p| SeedConfig::load(&p))
            .transpose()?
            .unwrap_or_default();

        Ok(Self { name, path, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// `schema.name`, or just `name` when neither the seed nor the project sets a schema
    pub fn qualified_name(&self, default_schema: Option<&str>) -> String {
        let schema = self.config.schema.as_deref().or(default_schema);
        qualify(schema, &self.name)
    }
}

/// Discover all `*.csv` seeds in the given directories, sorted by name.
pub fn discover_seeds(seed_paths: &[PathBuf]) -> CoreResult<Vec<Seed>> {
    let mut seeds = Vec::new();
    for dir in seed_paths {
        if dir.exists() {
            collect_seeds(dir, &mut seeds)?;
        }
    }
    seeds.sort_by(|a, b| a.name.cmp(&b.name));

    for pair in seeds.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(CoreError::SeedInvalid {
                path: pair[1].path.display().to_string(),
                message: format!(
                    "seed name '{}' is also used by {}",
                    pair[1].name,
                    pair[0].path.display()
                ),
            });
        }
    }

    Ok(seeds)
}

fn collect_seeds(dir: &Path, seeds: &mut Vec<Seed>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_seeds(&path, seeds)?;
        } else if path.extension().is_some_and(|e| e == "csv") {
            seeds.push(Seed::from_file(path)?);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
