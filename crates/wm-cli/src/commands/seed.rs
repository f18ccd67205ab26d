//! Seed command implementation

use anyhow::Result;
use wm_exec::{load_seeds, select_seeds, RunStatus};

use crate::cli::{GlobalArgs, SeedArgs};
use crate::commands::common::{
    load_project, open_database, split_list, ExitCode, EXIT_DATABASE_FAILURES,
};

/// Execute the seed command
pub async fn execute(args: &SeedArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;

    if project.seeds.is_empty() {
        println!("No seed files found in seed_paths.");
        return Ok(());
    }

    let names = split_list(args.seeds.as_deref());
    let seeds = select_seeds(&project, names.as_deref())?;
    let db = open_database(&project)?;

    if global.verbose {
        eprintln!(
            "[verbose] Loading {} seeds from paths: {:?}",
            seeds.len(),
            project.config.seed_paths
        );
    }

    println!("Loading {} seeds...\n", seeds.len());

    let results = load_seeds(&db, &project, &seeds, args.full_refresh).await;

    let mut failure_count = 0;
    let mut total_rows = 0;
    for result in &results {
        match result.status {
            RunStatus::Success => {
                total_rows += result.rows;
                println!("  ✓ {} -> {} ({} rows)", result.seed, result.relation, result.rows);
            }
            RunStatus::Error => {
                failure_count += 1;
                println!(
                    "  ✗ {} - {}",
                    result.seed,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            RunStatus::Skipped => println!("  - {} (disabled)", result.seed),
        }
    }

    println!();
    println!(
        "Loaded {} seeds ({} rows), {} failed",
        results.len() - failure_count,
        total_rows,
        failure_count
    );

    if failure_count > 0 {
        return Err(ExitCode(EXIT_DATABASE_FAILURES).into());
    }
    Ok(())
}
