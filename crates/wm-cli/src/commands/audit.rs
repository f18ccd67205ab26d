//! Audit command implementation

use anyhow::{Context, Result};
use wm_core::records::MartAudit;
use wm_exec::{audit_project, compile_project, CompileOptions};

use crate::cli::{AuditArgs, GlobalArgs};
use crate::commands::common::{load_project, open_database, ExitCode, EXIT_TEST_FAILURES};

/// At most this many ids/keys are listed per finding
const MAX_LISTED: usize = 10;

fn print_list<T: std::fmt::Display>(label: &str, items: &[T]) {
    if items.is_empty() {
        return;
    }
    println!("  ✗ {} ({}):", label, items.len());
    for item in items.iter().take(MAX_LISTED) {
        println!("      {}", item);
    }
    if items.len() > MAX_LISTED {
        println!("      ... and {} more", items.len() - MAX_LISTED);
    }
}

fn print_audit(audit: &MartAudit) {
    println!("  weather rows:   {}", audit.weather_rows);
    println!("  expected rows:  {}", audit.expected_rows);
    println!("  mart rows:      {}", audit.actual_rows);
    println!("  unmatched rows: {}", audit.unmatched_rows);
    println!("  fan-out rows:   {}", audit.fan_out_rows);
    println!();
    print_list("weather ids missing from mart", &audit.missing_weather_ids);
    print_list("keys missing from mart", &audit.missing_keys);
    print_list("unexpected keys in mart", &audit.unexpected_keys);
    print_list("rows whose contents differ", &audit.mismatched_rows);
}

/// Execute the audit command
pub async fn execute(args: &AuditArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let compiled = compile_project(&project, &CompileOptions::default())
        .context("Failed to compile project")?;
    let db = open_database(&project)?;

    let audit = audit_project(&db, &compiled)
        .await
        .context("Failed to audit mart")?;

    if args.json {
        let json = serde_json::to_string_pretty(&audit).context("Failed to serialize to JSON")?;
        println!("{}", json);
    } else {
        println!("Auditing mart against its inputs...\n");
        print_audit(&audit);
        if audit.is_consistent() {
            println!("  ✓ mart matches the recomputed join");
        }
    }

    if !audit.is_consistent() {
        return Err(ExitCode(EXIT_TEST_FAILURES).into());
    }
    Ok(())
}
