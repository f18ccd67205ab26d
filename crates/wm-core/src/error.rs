//! Error types for wm-core

use thiserror::Error;

/// Core error type for Weathermart
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config {path}: {message}")]
    ConfigParseError { path: String, message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Model not found
    #[error("[E005] Model not found: {name}")]
    ModelNotFound { name: String },

    /// E006: Invalid model name (empty or not a plain SQL identifier)
    #[error("[E006] Invalid model name '{name}': {reason}")]
    InvalidModelName { name: String, reason: String },

    /// E007: Circular dependency detected
    #[error("[E007] Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// E008: Duplicate model name
    #[error("[E008] Duplicate model name '{name}' in {path1} and {path2}")]
    DuplicateModel {
        name: String,
        path1: String,
        path2: String,
    },

    /// E009: Invalid selector
    #[error("[E009] Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// E010: Unknown materialization value
    #[error("[E010] Unknown materialization '{value}' (expected view, table or incremental)")]
    UnknownMaterialization { value: String },

    /// E011: Schema file names a different model than its SQL file
    #[error("[E011] Schema file {path} names model '{declared}' but belongs to '{model}'")]
    SchemaNameMismatch {
        path: String,
        model: String,
        declared: String,
    },

    /// E012: Schema file parse error
    #[error("[E012] Failed to parse schema file {path}: {details}")]
    SchemaParseError { path: String, details: String },

    /// E013: Unknown target name
    #[error("[E013] Unknown target '{name}'. Available targets: {available}")]
    UnknownTarget { name: String, available: String },

    /// E017: Model file could not be read as a model
    #[error("[E017] Failed to parse model '{name}': {message}")]
    ModelParseError { name: String, message: String },

    /// SRC001: Failed to parse source file
    #[error("[SRC001] Failed to parse source file {path}: {details}")]
    SourceParseError { path: String, details: String },

    /// SRC002: Source has no tables defined
    #[error("[SRC002] Source '{name}' has no tables defined in {path}")]
    SourceEmptyTables { name: String, path: String },

    /// SRC003: Duplicate source name
    #[error("[SRC003] Duplicate source name '{name}' in {path1} and {path2}")]
    SourceDuplicateName {
        name: String,
        path1: String,
        path2: String,
    },

    /// SRC004: Duplicate table in source
    #[error("[SRC004] Duplicate table '{table}' in source '{source_name}'")]
    SourceDuplicateTable { table: String, source_name: String },

    /// SEED001: Invalid seed file
    #[error("[SEED001] Invalid seed file {path}: {message}")]
    SeedInvalid { path: String, message: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E015: IO error with file path context
    #[error("[E015] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E016: YAML parse error
    #[error("[E016] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Read a file to a string, attaching the path to any IO error.
pub(crate) fn read_file(path: &std::path::Path) -> CoreResult<String> {
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}
