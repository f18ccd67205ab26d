//! Error types for wm-jinja

use thiserror::Error;

/// Jinja templating errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// Template render error (J001)
    #[error("[J001] Jinja render error: {0}")]
    RenderError(String),

    /// Invalid config key (J002)
    #[error("[J002] Invalid config key '{key}'. Valid keys: materialized, schema, unique_key")]
    InvalidConfigKey { key: String },

    /// Invalid config value (J003)
    #[error("[J003] Invalid value for config key '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    /// ref() to a model that does not exist (J004)
    #[error("[J004] ref('{name}') does not match any model. Known models: {known}")]
    UnknownModel { name: String, known: String },

    /// source() to a table that is not declared (J005)
    #[error("[J005] source('{source_name}', '{table}') is not declared. Known sources: {known}")]
    UnknownSource {
        source_name: String,
        table: String,
        known: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for JinjaError
pub type JinjaResult<T> = Result<T, JinjaError>;

impl From<minijinja::Error> for JinjaError {
    fn from(err: minijinja::Error) -> Self {
        JinjaError::RenderError(err.to_string())
    }
}
