//! Configuration types and parsing for weathermart.yml

use crate::error::{read_file, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File names tried when loading a project, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["weathermart.yml", "weathermart.yaml"];

/// Main project configuration from weathermart.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Directories containing model SQL files and schema YAML
    #[serde(default = "default_model_paths")]
    pub model_paths: Vec<String>,

    /// Directories containing source definitions
    #[serde(default = "default_source_paths")]
    pub source_paths: Vec<String>,

    /// Directories containing seed CSV files
    #[serde(default = "default_seed_paths")]
    pub seed_paths: Vec<String>,

    /// Output directory for compiled SQL, manifest and run results
    #[serde(default = "default_target_path")]
    pub target_path: String,

    /// Default materialization for models without a config() override
    #[serde(default)]
    pub materialization: Materialization,

    /// Default schema for models
    #[serde(default)]
    pub schema: Option<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Variables available in templates through var()
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,

    /// Directories removed by `wm clean`
    #[serde(default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    /// Named target configurations (e.g. dev, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Schema override
    #[serde(default)]
    pub schema: Option<String>,

    /// Variable overrides, merged over the base vars
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Physical persistence strategy for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Materialization {
    /// `CREATE OR REPLACE VIEW`
    #[default]
    View,
    /// `CREATE OR REPLACE TABLE ... AS`
    Table,
    /// Keyed merge into an existing table
    Incremental,
}

impl Materialization {
    /// Whether this materialization persists rows
    pub fn is_persisted(self) -> bool {
        !matches!(self, Materialization::View)
    }
}

impl fmt::Display for Materialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Materialization::View => "view",
            Materialization::Table => "table",
            Materialization::Incremental => "incremental",
        };
        f.write_str(s)
    }
}

impl FromStr for Materialization {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(Materialization::View),
            "table" => Ok(Materialization::Table),
            "incremental" => Ok(Materialization::Incremental),
            _ => Err(CoreError::UnknownMaterialization {
                value: s.to_string(),
            }),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_model_paths() -> Vec<String> {
    vec!["models".to_string()]
}

fn default_source_paths() -> Vec<String> {
    vec!["sources".to_string()]
}

fn default_seed_paths() -> Vec<String> {
    vec!["seeds".to_string()]
}

const DEFAULT_TARGET_DIR: &str = "target";

fn default_target_path() -> String {
    DEFAULT_TARGET_DIR.to_string()
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_clean_targets() -> Vec<String> {
    vec![DEFAULT_TARGET_DIR.to_string()]
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = read_file(path)?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .map(|p| Self::load(&p))
            .unwrap_or_else(|| {
                Err(CoreError::ConfigNotFound {
                    path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
                })
            })
    }

    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.model_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one model_paths entry must be specified".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Apply a named target's overrides, returning the effective config.
    ///
    /// `None` returns the config unchanged.
    pub fn with_target(mut self, target: Option<&str>) -> CoreResult<Self> {
        let Some(name) = target else {
            return Ok(self);
        };

        let Some(overrides) = self.targets.get(name).cloned() else {
            let mut available: Vec<&str> = self.targets.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CoreError::UnknownTarget {
                name: name.to_string(),
                available: if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                },
            });
        };

        if let Some(db) = overrides.database {
            self.database = db;
        }
        if overrides.schema.is_some() {
            self.schema = overrides.schema;
        }
        self.vars.extend(overrides.vars);
        log::debug!("Applied target '{}' (database: {})", name, self.database.path);
        Ok(self)
    }

    /// Merge ad-hoc variables (e.g. from `--vars`) over the project vars.
    pub fn merge_vars(&mut self, extra: HashMap<String, serde_yaml::Value>) {
        self.vars.extend(extra);
    }

    fn paths_absolute(paths: &[String], root: &Path) -> Vec<PathBuf> {
        paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get absolute model paths relative to a project root
    pub fn model_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        Self::paths_absolute(&self.model_paths, root)
    }

    /// Get absolute source paths relative to a project root
    pub fn source_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        Self::paths_absolute(&self.source_paths, root)
    }

    /// Get absolute seed paths relative to a project root
    pub fn seed_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        Self::paths_absolute(&self.seed_paths, root)
    }

    /// Get absolute clean-target paths relative to a project root
    pub fn clean_targets_absolute(&self, root: &Path) -> Vec<PathBuf> {
        Self::paths_absolute(&self.clean_targets, root)
    }

    /// Get absolute target directory
    pub fn target_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }

    /// Database path, resolved against the project root unless in-memory or absolute.
    pub fn database_path(&self, root: &Path) -> String {
        let path = &self.database.path;
        if path == ":memory:" || Path::new(path).is_absolute() {
            path.clone()
        } else {
            root.join(path).display().to_string()
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
