//! End-to-end runs of the shipped weather project on in-memory DuckDB

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wm_core::surrogate_key::weather_country_key;
use wm_core::Project;
use wm_db::{CellValue, Database, DuckDbBackend, RelationKind};
use wm_exec::audit::read_mart_records;
use wm_exec::{
    audit_project, compile_project, load_seeds, run_project, select_seeds, CompileOptions,
    ExecError, RunOptions, RunStatus,
};

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

/// A scratch copy of the weather project, so artifacts land in a temp dir
fn scratch_project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("weather_project");
    copy_dir(Path::new(WEATHER_PROJECT), &root);
    (temp, root)
}

fn load(root: &Path) -> Project {
    Project::load_with_target(root, Some("ci")).unwrap()
}

async fn seeded(project: &Project) -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    let seeds = select_seeds(project, None).unwrap();
    let results = load_seeds(&db, project, &seeds, false).await;
    assert!(results.iter().all(|r| r.status == RunStatus::Success));
    db
}

async fn run(db: &DuckDbBackend, project: &Project) -> wm_exec::RunResults {
    let (_, results) = run_project(db, project, &RunOptions::default(), |_| {})
        .await
        .unwrap();
    assert_eq!(results.failure_count, 0, "{:?}", results.results);
    results
}

fn text(cell: &CellValue) -> Option<&str> {
    cell.as_str()
}

#[tokio::test]
async fn test_run_builds_views_and_mart() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;

    let results = run(&db, &project).await;
    assert_eq!(results.success_count, 3);
    assert_eq!(results.results.last().unwrap().model, "mart_final");

    assert_eq!(
        db.relation_kind("stg_country").await.unwrap(),
        Some(RelationKind::View)
    );
    assert_eq!(
        db.relation_kind("stg_weather").await.unwrap(),
        Some(RelationKind::View)
    );
    assert_eq!(
        db.relation_kind("mart_final").await.unwrap(),
        Some(RelationKind::Table)
    );

    let columns = db
        .query_rows("SELECT * FROM mart_final LIMIT 0")
        .await
        .unwrap()
        .columns;
    assert_eq!(
        columns,
        vec![
            "unique_key",
            "weather_id",
            "city",
            "temperature",
            "humidity",
            "country_name",
            "capital",
            "population",
            "region"
        ]
    );
}

#[tokio::test]
async fn test_matched_row_example() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    run(&db, &project).await;

    let rows = db
        .query_rows(
            "SELECT unique_key, weather_id, city, temperature, humidity, country_name, \
             capital, population, region FROM mart_final WHERE weather_id = 1",
        )
        .await
        .unwrap();
    assert_eq!(rows.rows.len(), 1);
    let row = &rows.rows[0];

    assert_eq!(text(&row[0]), Some("dd56b78777e20754464527f860399711"));
    assert_eq!(text(&row[0]).unwrap(), weather_country_key(Some(1), Some(10)));
    assert_eq!(row[1].as_i64(), Some(1));
    assert_eq!(text(&row[2]), Some("Paris"));
    assert_eq!(row[3].as_f64(), Some(20.0));
    assert_eq!(row[4].as_i64(), Some(60));
    assert_eq!(text(&row[5]), Some("France"));
    assert_eq!(text(&row[6]), Some("Paris"));
    assert_eq!(row[7].as_i64(), Some(67_000_000));
    assert_eq!(text(&row[8]), Some("Europe"));
}

#[tokio::test]
async fn test_unmatched_row_keeps_weather_fields() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    run(&db, &project).await;

    let rows = db
        .query_rows(
            "SELECT unique_key, city, country_name, capital, population, region \
             FROM mart_final WHERE weather_id = 7",
        )
        .await
        .unwrap();
    assert_eq!(rows.rows.len(), 1);
    let row = &rows.rows[0];

    assert_eq!(text(&row[0]), Some("a5c875742bd5f64867bed84c99e141a2"));
    assert_eq!(text(&row[1]), Some("Reykjavik"));
    assert!(row[2..].iter().all(CellValue::is_null));
}

#[tokio::test]
async fn test_every_weather_row_kept_and_keys_unique() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    run(&db, &project).await;

    let weather = db.query_count("SELECT * FROM raw.weather").await.unwrap();
    let mart = db.query_count("SELECT * FROM mart_final").await.unwrap();
    assert_eq!(mart, weather);
    assert_eq!(
        db.query_count(
            "SELECT ID FROM raw.weather WHERE ID NOT IN (SELECT weather_id FROM mart_final)"
        )
        .await
        .unwrap(),
        0
    );
    assert_eq!(
        db.query_count("SELECT DISTINCT unique_key FROM mart_final")
            .await
            .unwrap(),
        mart
    );
}

#[tokio::test]
async fn test_duplicate_country_name_fans_out() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    db.execute("INSERT INTO raw.country VALUES (31, 'Japan', 'Kyoto', 1, 'Asia')")
        .await
        .unwrap();
    run(&db, &project).await;

    // Tokyo and Osaka each match both Japan rows
    assert_eq!(db.query_count("SELECT * FROM mart_final").await.unwrap(), 9);
    let keys = db
        .query_rows("SELECT unique_key FROM mart_final WHERE weather_id = 4 ORDER BY unique_key")
        .await
        .unwrap();
    let mut expected = vec![
        weather_country_key(Some(4), Some(30)),
        weather_country_key(Some(4), Some(31)),
    ];
    expected.sort();
    let actual: Vec<String> = keys.rows.iter().map(|r| r[0].to_string()).collect();
    assert_eq!(actual, expected);
    assert!(actual.contains(&"4d359352ddfeaf4a6791b61aff841cb8".to_string()));

    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert_eq!(audit.fan_out_rows, 2);
    assert!(audit.is_consistent());
}

fn compiled(project: &Project) -> wm_exec::CompiledProject {
    compile_project(project, &CompileOptions::default()).unwrap()
}

#[tokio::test]
async fn test_rerun_is_deterministic() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    let compiled = compiled(&project);

    run(&db, &project).await;
    let mut first = read_mart_records(&db, &compiled).await.unwrap();
    run(&db, &project).await;
    let mut second = read_mart_records(&db, &compiled).await.unwrap();

    first.sort_by(|a, b| a.unique_key.cmp(&b.unique_key));
    second.sort_by(|a, b| a.unique_key.cmp(&b.unique_key));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_audit_agrees_with_reference_join() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    run(&db, &project).await;

    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert!(audit.is_consistent(), "{:?}", audit);
    assert_eq!(audit.weather_rows, 7);
    assert_eq!(audit.unmatched_rows, 1);
    assert_eq!(audit.fan_out_rows, 0);

    // a tampered mart is caught
    db.execute("DELETE FROM mart_final WHERE weather_id = 3")
        .await
        .unwrap();
    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert!(!audit.is_consistent());
    assert_eq!(audit.missing_weather_ids, vec![3]);
}

#[tokio::test]
async fn test_audit_catches_changed_country_fields() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let db = seeded(&project).await;
    run(&db, &project).await;

    db.execute("UPDATE mart_final SET capital = 'Marseille' WHERE weather_id = 1")
        .await
        .unwrap();
    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert!(!audit.is_consistent(), "{:?}", audit);
    assert_eq!(
        audit.mismatched_rows,
        vec![weather_country_key(Some(1), Some(10))]
    );
    assert!(audit.missing_keys.is_empty());
    assert_eq!(audit.actual_rows, 7);

    db.execute(
        "UPDATE mart_final SET country_name = NULL, capital = NULL, population = NULL, \
         region = NULL WHERE weather_id = 2",
    )
    .await
    .unwrap();
    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert_eq!(audit.mismatched_rows.len(), 2);
}

#[tokio::test]
async fn test_incremental_mart_is_idempotent() {
    let (_temp, root) = scratch_project();
    let mart_path = root.join("models/marts/mart_final.sql");
    let sql = std::fs::read_to_string(&mart_path).unwrap();
    std::fs::write(
        &mart_path,
        sql.replace("materialized='table'", "materialized='incremental'"),
    )
    .unwrap();

    let project = load(&root);
    let db = seeded(&project).await;
    for _ in 0..3 {
        run(&db, &project).await;
    }
    assert_eq!(db.query_count("SELECT * FROM mart_final").await.unwrap(), 7);

    db.execute("INSERT INTO raw.weather VALUES (8, 'Kyoto', 'Japan', 15.5, 65)")
        .await
        .unwrap();
    run(&db, &project).await;
    assert_eq!(db.query_count("SELECT * FROM mart_final").await.unwrap(), 8);

    let audit = audit_project(&db, &compiled(&project)).await.unwrap();
    assert!(audit.is_consistent(), "{:?}", audit);
}

#[tokio::test]
async fn test_unknown_ref_fails_before_execution() {
    let (_temp, root) = scratch_project();
    std::fs::write(
        root.join("models/marts/mart_city.sql"),
        "select * from {{ ref('stg_city') }}",
    )
    .unwrap();

    let project = load(&root);
    let db = seeded(&project).await;
    let err = run_project(&db, &project, &RunOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::Render { ref model, .. } if model == "mart_city"));

    assert!(!db.relation_exists("stg_country").await.unwrap());
    assert!(!db.relation_exists("stg_weather").await.unwrap());
    assert!(!db.relation_exists("mart_final").await.unwrap());
}

#[tokio::test]
async fn test_compile_writes_artifacts() {
    let (_temp, root) = scratch_project();
    let project = load(&root);
    let compiled = compiled(&project);
    let manifest = compiled
        .write_artifacts(&project, &compiled.execution_order)
        .unwrap();

    let sql = std::fs::read_to_string(root.join("target/compiled/mart_final.sql")).unwrap();
    assert!(sql.contains("left join country"));
    assert!(sql.contains("MD5(COALESCE(CAST(\"weather\".\"weather_id\" AS VARCHAR), '__null__')"));
    assert!(!sql.contains("{{"));

    let mart = manifest.model("mart_final").unwrap();
    assert_eq!(mart.depends_on.len(), 2);
    assert_eq!(mart.unique_key, vec!["unique_key"]);
    assert_eq!(
        manifest.model("stg_weather").unwrap().sources,
        vec!["raw.weather"]
    );
    assert!(root.join("target/manifest.json").exists());
}
