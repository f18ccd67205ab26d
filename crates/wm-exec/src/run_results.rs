//! Per-model outcomes of a run, written to `target/run_results.json`

use crate::error::{ExecError, ExecResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use wm_core::{Materialization, ModelName};

/// Outcome of a single model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
    Skipped,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Error => write!(f, "error"),
            RunStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Run result for a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRunResult {
    pub model: ModelName,
    pub relation: String,
    pub status: RunStatus,
    pub materialization: Materialization,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run results output file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    pub results: Vec<ModelRunResult>,
}

impl RunResults {
    /// Summarize a list of model results
    pub fn new(started_at: DateTime<Utc>, results: Vec<ModelRunResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let elapsed = (Utc::now() - started_at).num_milliseconds().max(0) as f64 / 1000.0;
        Self {
            started_at,
            elapsed_secs: elapsed,
            success_count: count(RunStatus::Success),
            failure_count: count(RunStatus::Error),
            skipped_count: count(RunStatus::Skipped),
            results,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count > 0 || self.skipped_count > 0
    }

    pub fn result(&self, model: &str) -> Option<&ModelRunResult> {
        self.results.iter().find(|r| r.model == *model)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ExecResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExecError::artifact(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ExecError::artifact(path, e))?;
        std::fs::write(path, json).map_err(|e| ExecError::artifact(path, e))
    }

    pub fn load(path: &Path) -> ExecResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ExecError::artifact(path, e))?;
        serde_json::from_str(&content).map_err(|e| ExecError::artifact(path, e))
    }
}
