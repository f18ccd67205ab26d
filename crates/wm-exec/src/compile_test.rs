use super::*;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project_with(extra: &[(&str, &str)]) -> (TempDir, Project) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "weathermart.yml", "name: weather\n");
    write(
        root,
        "sources/raw.yml",
        "kind: sources\nname: raw\nschema: raw\ntables:\n  - name: country\n  - name: weather\n",
    );
    write(
        root,
        "models/stg_country.sql",
        "{{ config(materialized='view') }}\nselect COUNTRYID as country_id, COUNTRY as country_name from {{ source('raw', 'country') }}",
    );
    write(
        root,
        "models/stg_weather.sql",
        "{{ config(materialized='view') }}\nselect ID as weather_id, COUNTRY as country_name from {{ source('raw', 'weather') }}",
    );
    for (rel, content) in extra {
        write(root, rel, content);
    }
    let project = Project::load(root).unwrap();
    (temp, project)
}

const MART: &str = "{{ config(materialized='table', unique_key='unique_key') }}
select {{ surrogate_key(['w.weather_id', 'c.country_id']) }} as unique_key
from {{ ref('stg_weather') }} w left join {{ ref('stg_country') }} c on w.country_name = c.country_name";

#[test]
fn test_compile_orders_staging_before_mart() {
    let (_temp, project) = project_with(&[("models/mart_final.sql", MART)]);
    let compiled = compile_project(&project, &CompileOptions::default()).unwrap();

    let order: Vec<&str> = compiled.execution_order.iter().map(|n| n.as_str()).collect();
    assert_eq!(order.len(), 3);
    assert_eq!(order[2], "mart_final");

    let mart = compiled.model("mart_final").unwrap();
    assert_eq!(mart.materialization, Materialization::Table);
    assert_eq!(mart.unique_key, vec!["unique_key"]);
    assert_eq!(mart.relation, "mart_final");
    assert_eq!(mart.refs.len(), 2);
    assert!(mart.sql.contains("from \"stg_weather\" w"));

    let stg = compiled.model("stg_weather").unwrap();
    assert_eq!(stg.sources, vec!["raw.weather"]);
    assert!(stg.sql.ends_with("from \"raw\".\"weather\""));
}

#[test]
fn test_project_default_materialization_applies() {
    let (_temp, project) = project_with(&[(
        "models/plain.sql",
        "select * from {{ ref('stg_weather') }}",
    )]);
    let compiled = compile_project(&project, &CompileOptions::default()).unwrap();
    assert_eq!(
        compiled.model("plain").unwrap().materialization,
        Materialization::View
    );
}

#[test]
fn test_ref_follows_configured_schema() {
    let (_temp, project) = project_with(&[
        (
            "models/mart_final.sql",
            "{{ config(materialized='table', schema='analytics') }}select * from {{ ref('stg_weather') }}",
        ),
        ("models/report.sql", "select count(*) from {{ ref('mart_final') }}"),
    ]);
    let compiled = compile_project(&project, &CompileOptions::default()).unwrap();

    let mart = compiled.model("mart_final").unwrap();
    assert_eq!(mart.relation, "analytics.mart_final");
    assert_eq!(mart.schema.as_deref(), Some("analytics"));
    assert_eq!(mart.quoted_relation(), "\"analytics\".\"mart_final\"");
    assert!(compiled
        .model("report")
        .unwrap()
        .sql
        .contains("from \"analytics\".\"mart_final\""));
}

#[test]
fn test_unknown_ref_fails_compile() {
    let (_temp, project) = project_with(&[(
        "models/mart_final.sql",
        "select * from {{ ref('stg_city') }}",
    )]);
    let err = compile_project(&project, &CompileOptions::default()).unwrap_err();
    match err {
        ExecError::Render { model, source } => {
            assert_eq!(model, "mart_final");
            assert!(matches!(source, wm_jinja::JinjaError::UnknownModel { .. }));
        }
        other => panic!("expected Render, got {other:?}"),
    }
}

#[test]
fn test_undeclared_source_fails_compile() {
    let (_temp, project) = project_with(&[(
        "models/stg_city.sql",
        "select * from {{ source('raw', 'city') }}",
    )]);
    assert!(matches!(
        compile_project(&project, &CompileOptions::default()),
        Err(ExecError::Render { .. })
    ));
}

#[test]
fn test_cycle_fails_compile() {
    let (_temp, project) = project_with(&[
        ("models/a.sql", "select * from {{ ref('b') }}"),
        ("models/b.sql", "select * from {{ ref('a') }}"),
    ]);
    let err = compile_project(&project, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ExecError::Core(wm_core::CoreError::CircularDependency { .. })
    ));
}

#[test]
fn test_incremental_requires_unique_key() {
    let (_temp, project) = project_with(&[(
        "models/mart_final.sql",
        "{{ config(materialized='incremental') }}select * from {{ ref('stg_weather') }}",
    )]);
    assert!(matches!(
        compile_project(&project, &CompileOptions::default()),
        Err(ExecError::MissingUniqueKey { .. })
    ));
}

#[test]
fn test_is_incremental_tracks_existing_relation() {
    let template = "{{ config(materialized='incremental', unique_key='weather_id') }}\
select * from {{ ref('stg_weather') }}\
{% if is_incremental() %} where weather_id > (select max(weather_id) from {{ this }}){% endif %}";
    let (_temp, project) = project_with(&[("models/mart_final.sql", template)]);

    let first = compile_project(&project, &CompileOptions::default()).unwrap();
    assert!(!first.model("mart_final").unwrap().sql.contains("max(weather_id)"));
    assert_eq!(first.incremental_relations(), vec!["mart_final"]);

    let mut options = CompileOptions {
        existing_relations: HashSet::from(["mart_final".to_string()]),
        ..Default::default()
    };
    let next = compile_project(&project, &options).unwrap();
    assert!(next
        .model("mart_final")
        .unwrap()
        .sql
        .contains("(select max(weather_id) from \"mart_final\")"));

    options.full_refresh = true;
    let refreshed = compile_project(&project, &options).unwrap();
    assert!(!refreshed.model("mart_final").unwrap().sql.contains("max("));
}

#[test]
fn test_select() {
    let (_temp, project) = project_with(&[("models/mart_final.sql", MART)]);
    let compiled = compile_project(&project, &CompileOptions::default()).unwrap();

    assert_eq!(compiled.select(None).unwrap().len(), 3);
    assert_eq!(compiled.select(Some("  ")).unwrap().len(), 3);
    assert_eq!(compiled.select(Some("stg_weather")).unwrap(), vec!["stg_weather"]);
    assert_eq!(compiled.select(Some("+mart_final")).unwrap().len(), 3);
    assert_eq!(
        compiled.select(Some("stg_country+")).unwrap(),
        vec!["stg_country", "mart_final"]
    );
    assert!(compiled.select(Some("nope")).is_err());
}

#[test]
fn test_write_artifacts() {
    let (temp, project) = project_with(&[("models/mart_final.sql", MART)]);
    let compiled = compile_project(&project, &CompileOptions::default()).unwrap();
    let manifest = compiled
        .write_artifacts(&project, &compiled.execution_order)
        .unwrap();

    let sql_path = temp.path().join("target/compiled/mart_final.sql");
    let written = std::fs::read_to_string(&sql_path).unwrap();
    assert_eq!(written.trim_end(), compiled.model("mart_final").unwrap().sql);

    let entry = manifest.model("mart_final").unwrap();
    assert_eq!(entry.source_path, "models/mart_final.sql");
    assert_eq!(entry.compiled_path, "target/compiled/mart_final.sql");
    assert_eq!(entry.checksum.len(), 64);
    assert_eq!(
        manifest.sources.get("raw.country").map(String::as_str),
        Some("raw.country")
    );

    let loaded = Manifest::load(&temp.path().join("target/manifest.json")).unwrap();
    assert_eq!(loaded.execution_order, compiled.execution_order);
}
