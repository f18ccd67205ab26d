//! End-to-end tests of the `wm` binary on a copy of the weather project

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const WEATHER_PROJECT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../weather_project");

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            if entry.file_name() != "target" {
                copy_dir(&entry.path(), &dest);
            }
        } else {
            std::fs::copy(entry.path(), dest).unwrap();
        }
    }
}

fn scratch_project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("weather_project");
    copy_dir(Path::new(WEATHER_PROJECT), &root);
    (temp, root)
}

/// Run `wm` against a project and return (stdout, stderr, exit code).
fn run_wm(root: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_wm"))
        .arg("-p")
        .arg(root)
        .args(args)
        .env_remove("WM_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute wm with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn assert_ok(root: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_wm(root, args);
    assert_eq!(code, 0, "wm {:?}\nstdout:\n{}\nstderr:\n{}", args, stdout, stderr);
    stdout
}

#[test]
fn test_seed_run_test_audit() {
    let (_temp, root) = scratch_project();

    let out = assert_ok(&root, &["seed"]);
    assert!(out.contains("✓ country -> raw.country (4 rows)"));
    assert!(out.contains("✓ weather -> raw.weather (7 rows)"));

    let out = assert_ok(&root, &["run"]);
    assert!(out.contains("✓ stg_country (view)"));
    assert!(out.contains("✓ mart_final (table)"));
    assert!(out.contains("3 succeeded, 0 failed, 0 skipped"));
    assert!(root.join("target/run_results.json").exists());
    assert!(root.join("target/compiled/mart_final.sql").exists());

    let run_results: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(root.join("target/run_results.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(run_results["success_count"], 3);
    assert_eq!(run_results["results"][2]["model"], "mart_final");
    assert_eq!(run_results["results"][2]["status"], "success");

    let out = assert_ok(&root, &["test"]);
    assert!(out.contains("✓ unique_mart_final__unique_key"));
    assert!(out.contains("Failed: 0, Errors: 0"));

    let out = assert_ok(&root, &["audit"]);
    assert!(out.contains("mart matches the recomputed join"));

    let out = assert_ok(&root, &["audit", "--json"]);
    let audit: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(audit["weather_rows"], 7);
    assert_eq!(audit["unmatched_rows"], 1);
}

#[test]
fn test_failing_data_test_exits_with_2() {
    let (_temp, root) = scratch_project();
    let weather = root.join("seeds/weather.csv");
    let mut csv = std::fs::read_to_string(&weather).unwrap();
    csv.push_str("8,Mawsynram,India,21.0,150\n");
    std::fs::write(&weather, csv).unwrap();

    assert_ok(&root, &["seed"]);
    let (stdout, _, code) = run_wm(&root, &["test", "-m", "weather"]);
    assert_eq!(code, 2, "{}", stdout);
    assert!(stdout.contains("✗ max_value_raw_weather__HUMIDITY (1 failures)"));
    assert!(stdout.contains("HUMIDITY=150"));
}

#[test]
fn test_missing_temperature_fails_not_null() {
    let (_temp, root) = scratch_project();
    let weather = root.join("seeds/weather.csv");
    let mut csv = std::fs::read_to_string(&weather).unwrap();
    csv.push_str("8,Kyoto,Japan,,65\n");
    std::fs::write(&weather, csv).unwrap();

    assert_ok(&root, &["seed"]);
    let (stdout, _, code) = run_wm(&root, &["test", "-m", "weather"]);
    assert_eq!(code, 2, "{}", stdout);
    assert!(stdout.contains("✗ not_null_raw_weather__TEMPERATURE (1 failures)"));
    assert!(stdout.contains("✓ not_null_raw_weather__HUMIDITY"));
}

#[test]
fn test_run_without_seeds_fails_and_skips_mart() {
    let (_temp, root) = scratch_project();

    let (stdout, _, code) = run_wm(&root, &["run"]);
    assert_eq!(code, 4, "{}", stdout);
    assert!(stdout.contains("✗ stg_country"));
    assert!(stdout.contains("- mart_final skipped"));
}

#[test]
fn test_compile_ls_and_clean() {
    let (_temp, root) = scratch_project();

    let out = assert_ok(&root, &["compile"]);
    assert!(out.contains("Compiled 3 models"));
    assert!(out.trim_end().lines().any(|l| l.ends_with("-> mart_final")));
    let sql = std::fs::read_to_string(root.join("target/compiled/stg_weather.sql")).unwrap();
    assert!(sql.contains(r#""raw"."weather""#));

    let out = assert_ok(&root, &["ls", "-o", "json", "-s", "+mart_final"]);
    let nodes: serde_json::Value = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"mart_final"));
    assert!(names.contains(&"raw.weather"));

    let out = assert_ok(&root, &["ls", "-o", "tree"]);
    assert!(out.contains("└── mart_final"));

    assert_ok(&root, &["clean"]);
    assert!(!root.join("target").exists());
}

#[test]
fn test_unknown_target_is_an_error() {
    let (_temp, root) = scratch_project();
    let (_, stderr, code) = run_wm(&root, &["-t", "production", "ls"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("production"), "{}", stderr);
}
