//! Error types for wm-exec

use thiserror::Error;
use wm_core::CoreError;
use wm_db::DbError;
use wm_jinja::JinjaError;

/// Errors raised while compiling or materializing a project
#[derive(Error, Debug)]
pub enum ExecError {
    /// X001: A model template failed to render
    #[error("[X001] Failed to compile model '{model}': {source}")]
    Render {
        model: String,
        #[source]
        source: JinjaError,
    },

    /// X002: Incremental model without a unique_key
    #[error("[X002] Model '{model}' is incremental but declares no unique_key")]
    MissingUniqueKey { model: String },

    /// X003: Unknown seed requested
    #[error("[X003] Seed not found: {name}. Available seeds: {available}")]
    UnknownSeed { name: String, available: String },

    /// X004: A model the audit reads is not part of the project
    #[error("[X004] Audit needs model '{model}', which is not in the project")]
    AuditModelMissing { model: String },

    /// X005: A row read back for the audit has an unexpected shape
    #[error("[X005] Unexpected row in {relation}: {message}")]
    AuditRow { relation: String, message: String },

    /// X006: Artifact could not be written
    #[error("[X006] Failed to write {path}: {message}")]
    Artifact { path: String, message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for ExecError
pub type ExecResult<T> = Result<T, ExecError>;

impl ExecError {
    pub(crate) fn render(model: &str, source: JinjaError) -> Self {
        ExecError::Render {
            model: model.to_string(),
            source,
        }
    }

    pub(crate) fn artifact(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        ExecError::Artifact {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
