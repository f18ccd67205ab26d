//! Shared utilities for CLI commands

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fmt;
use wm_core::Project;
use wm_db::DuckDbBackend;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process exits.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command has already printed its summary
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit code for failed data-quality tests
pub(crate) const EXIT_TEST_FAILURES: i32 = 2;

/// Exit code for failed models or seeds
pub(crate) const EXIT_DATABASE_FAILURES: i32 = 4;

/// Load the project with the selected target applied
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    Project::load_with_target(&global.project_dir, global.target.as_deref())
        .context("Failed to load project")
}

/// Load the project and merge `--vars` over its variables
pub(crate) fn load_project_with_vars(global: &GlobalArgs, vars: Option<&str>) -> Result<Project> {
    let mut project = load_project(global)?;
    if let Some(vars) = vars {
        project.config.merge_vars(parse_vars(vars)?);
    }
    Ok(project)
}

/// Parse a `--vars` JSON object into project variables
pub(crate) fn parse_vars(json: &str) -> Result<HashMap<String, serde_yaml::Value>> {
    let value: serde_json::Value = serde_json::from_str(json).context("Invalid --vars JSON")?;
    let serde_json::Value::Object(map) = value else {
        bail!("--vars must be a JSON object, got: {}", json);
    };
    map.into_iter()
        .map(|(key, value)| {
            let value = serde_yaml::to_value(value)
                .with_context(|| format!("Invalid value for var '{}'", key))?;
            Ok((key, value))
        })
        .collect()
}

/// Open the database of the active target
pub(crate) fn open_database(project: &Project) -> Result<DuckDbBackend> {
    let path = project.database_path();
    log::debug!("Opening database {}", path);
    DuckDbBackend::new(&path).with_context(|| format!("Failed to connect to database {}", path))
}

/// Split a comma-separated argument, dropping empty entries
pub(crate) fn split_list(arg: Option<&str>) -> Option<Vec<String>> {
    arg.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

/// Combine `--models` and `--select` into one selector
pub(crate) fn selector(models: Option<&str>, select: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [models, select]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}
