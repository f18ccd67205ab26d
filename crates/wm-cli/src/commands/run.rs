//! Run command implementation

use anyhow::{Context, Result};
use std::time::Instant;
use wm_exec::{run_project, ModelRunResult, RunOptions, RunStatus};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{
    load_project_with_vars, open_database, selector, ExitCode, EXIT_DATABASE_FAILURES,
};

fn print_result(result: &ModelRunResult) {
    let millis = (result.duration_secs * 1000.0).round() as u64;
    match result.status {
        RunStatus::Success => println!(
            "  ✓ {} ({}) [{}ms]",
            result.model, result.materialization, millis
        ),
        RunStatus::Error => println!(
            "  ✗ {} - {} [{}ms]",
            result.model,
            result.error.as_deref().unwrap_or("unknown error"),
            millis
        ),
        RunStatus::Skipped => println!(
            "  - {} skipped ({})",
            result.model,
            result.error.as_deref().unwrap_or("upstream failure")
        ),
    }
}

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let start_time = Instant::now();
    let project = load_project_with_vars(global, args.vars.as_deref())?;
    let db = open_database(&project)?;

    let options = RunOptions {
        full_refresh: args.full_refresh,
        selector: selector(args.models.as_deref(), args.select.as_deref()),
    };

    if global.verbose {
        eprintln!(
            "[verbose] Running project '{}' against {}",
            project.config.name,
            project.database_path()
        );
    }

    println!("Running models...\n");
    let (compiled, results) = run_project(&db, &project, &options, print_result)
        .await
        .context("Failed to compile project")?;

    let selection = compiled.select(options.selector.as_deref())?;
    compiled
        .write_artifacts(&project, &selection)
        .context("Failed to write compiled artifacts")?;

    let results_path = project.target_dir().join("run_results.json");
    results
        .save(&results_path)
        .context("Failed to write run results")?;

    println!();
    println!(
        "Completed: {} succeeded, {} failed, {} skipped",
        results.success_count, results.failure_count, results.skipped_count
    );
    println!("Total time: {}ms", start_time.elapsed().as_millis());

    if results.has_failures() {
        return Err(ExitCode(EXIT_DATABASE_FAILURES).into());
    }
    Ok(())
}
