//! Clean command implementation

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::cli::{CleanArgs, GlobalArgs};
use crate::commands::common::load_project;

/// Execute the clean command
pub async fn execute(args: &CleanArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;

    if args.dry_run {
        println!("Dry run - would clean the following paths:");
    } else {
        println!("Cleaning project: {}", project.config.name);
    }

    let mut cleaned_count = 0;
    let mut skipped_count = 0;

    for target_path in project.config.clean_targets_absolute(&project.root) {
        // Never delete outside the project
        if !target_path.starts_with(&project.root) || target_path == project.root {
            eprintln!(
                "  Refusing to remove {}: not inside the project",
                target_path.display()
            );
            skipped_count += 1;
            continue;
        }

        if !target_path.exists() {
            if global.verbose {
                println!("  Skipping (not found): {}", target_path.display());
            }
            skipped_count += 1;
            continue;
        }

        if args.dry_run {
            println!("  Would remove: {}", target_path.display());
            cleaned_count += 1;
            continue;
        }

        match remove_path(&target_path) {
            Ok(()) => {
                println!("  Removed: {}", target_path.display());
                cleaned_count += 1;
            }
            Err(e) => {
                eprintln!("  Failed to remove {}: {}", target_path.display(), e);
            }
        }
    }

    println!();
    if args.dry_run {
        println!(
            "Would clean {} path{}, {} not found",
            cleaned_count,
            if cleaned_count == 1 { "" } else { "s" },
            skipped_count
        );
    } else {
        println!(
            "Cleaned {} path{}, {} skipped",
            cleaned_count,
            if cleaned_count == 1 { "" } else { "s" },
            skipped_count
        );
    }

    Ok(())
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
#[path = "clean_test.rs"]
mod tests;
