//! wm-core - Core library for Weathermart
//!
//! Project configuration, model/source/seed discovery, the model
//! dependency graph, SQL quoting helpers, the surrogate key and the typed
//! weather mart records.

pub mod checksum;
pub mod config;
pub mod dag;
pub mod error;
pub mod manifest;
pub mod model;
pub mod model_name;
pub mod project;
pub mod records;
pub mod seed;
pub mod source;
pub mod sql_utils;
pub mod surrogate_key;

pub use config::{Config, Materialization};
pub use dag::ModelDag;
pub use error::{CoreError, CoreResult};
pub use manifest::{Manifest, ManifestModel};
pub use model::{Model, ModelConfig, SchemaTest, TestOrigin, TestType};
pub use model_name::ModelName;
pub use project::Project;
pub use records::{CountryRecord, MartRecord, WeatherRecord};
pub use seed::Seed;
pub use source::{SourceFile, SourceLookup};
