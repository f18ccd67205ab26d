//! Compile command implementation

use anyhow::{Context, Result};
use wm_exec::compile::{compiled_sql_path, manifest_path};
use wm_exec::{compile_project, CompileOptions};

use crate::cli::{CompileArgs, GlobalArgs};
use crate::commands::common::{load_project_with_vars, selector};

/// Execute the compile command
pub async fn execute(args: &CompileArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project_with_vars(global, args.vars.as_deref())?;

    let compiled = compile_project(&project, &CompileOptions::default())
        .context("Failed to compile project")?;
    let selection = compiled.select(selector(args.models.as_deref(), None).as_deref())?;

    println!("Compiling {} models...\n", selection.len());

    let manifest = compiled
        .write_artifacts(&project, &selection)
        .context("Failed to write compiled artifacts")?;

    for name in &selection {
        let Some(model) = compiled.model(name) else {
            continue;
        };
        println!("  ✓ {} ({})", name, model.materialization);
        if global.verbose {
            eprintln!(
                "[verbose] Compiled {} -> {}",
                name,
                compiled_sql_path(&project, name).display()
            );
        }
    }

    println!();
    println!(
        "Compiled {} models, execution order: {}",
        selection.len(),
        manifest
            .execution_order
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    println!("Manifest written to {}", manifest_path(&project).display());

    Ok(())
}
