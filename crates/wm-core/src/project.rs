//! Project discovery and loading

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::model::{discover_models, Model, SchemaTest};
use crate::model_name::ModelName;
use crate::seed::{discover_seeds, Seed};
use crate::source::{discover_sources, SourceFile, SourceLookup};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A loaded weathermart project
#[derive(Debug)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,

    /// Project configuration, with the selected target applied
    pub config: Config,

    /// Models keyed by name
    pub models: BTreeMap<ModelName, Model>,

    /// Source declarations
    pub sources: Vec<SourceFile>,

    /// Seed CSV files
    pub seeds: Vec<Seed>,
}

impl Project {
    /// Load the project at `root` using the base configuration
    pub fn load(root: &Path) -> CoreResult<Self> {
        Self::load_with_target(root, None)
    }

    /// Load the project at `root`, applying the named target if given
    pub fn load_with_target(root: &Path, target: Option<&str>) -> CoreResult<Self> {
        if !root.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }

        let config = Config::load_from_dir(root)?.with_target(target)?;

        let mut models: BTreeMap<ModelName, Model> = BTreeMap::new();
        for model in discover_models(&config.model_paths_absolute(root))? {
            if let Some(existing) = models.get(&model.name) {
                return Err(CoreError::DuplicateModel {
                    name: model.name.to_string(),
                    path1: existing.path.display().to_string(),
                    path2: model.path.display().to_string(),
                });
            }
            models.insert(model.name.clone(), model);
        }

        let sources = discover_sources(&config.source_paths_absolute(root))?;
        let seeds = discover_seeds(&config.seed_paths_absolute(root))?;

        log::debug!(
            "Loaded project '{}': {} models, {} sources, {} seeds",
            config.name,
            models.len(),
            sources.len(),
            seeds.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            models,
            sources,
            seeds,
        })
    }

    /// Get a model by name
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// All model names, sorted
    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(|n| n.as_str()).collect()
    }

    /// Resolver for `source()` calls
    pub fn source_lookup(&self) -> SourceLookup {
        SourceLookup::new(&self.sources)
    }

    /// Every column test declared on models and sources
    pub fn schema_tests(&self) -> Vec<SchemaTest> {
        self.models
            .values()
            .flat_map(Model::schema_tests)
            .chain(self.sources.iter().flat_map(SourceFile::schema_tests))
            .collect()
    }

    /// Directory for compiled SQL, manifest and run results
    pub fn target_dir(&self) -> PathBuf {
        self.config.target_path_absolute(&self.root)
    }

    /// Database path for the active target
    pub fn database_path(&self) -> String {
        self.config.database_path(&self.root)
    }
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
