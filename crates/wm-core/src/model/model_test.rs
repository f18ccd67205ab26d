use super::*;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_from_file_without_schema() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "stg_country.sql", "select 1 as country_id");

    let model = Model::from_file(path).unwrap();
    assert_eq!(model.name, "stg_country");
    assert!(model.schema.is_none());
    assert!(model.schema_tests().is_empty());
}

#[test]
fn test_from_file_with_schema_tests() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "mart_final.sql", "select 1 as unique_key");
    write(
        temp.path(),
        "mart_final.yml",
        r#"
version: 1
name: mart_final
description: One row per weather observation
columns:
  - name: unique_key
    tests:
      - unique
      - not_null
  - name: weather_id
    tests:
      - not_null
"#,
    );

    let model = Model::from_file(path).unwrap();
    assert_eq!(model.description(), Some("One row per weather observation"));
    let tests = model.schema_tests();
    assert_eq!(tests.len(), 3);
    assert!(tests.iter().all(|t| t.relation == "mart_final"));
    assert!(tests.iter().all(|t| t.origin == TestOrigin::Model));
}

#[test]
fn test_schema_name_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "stg_weather.sql", "select 1");
    write(temp.path(), "stg_weather.yml", "name: stg_country\n");

    let err = Model::from_file(path).unwrap_err();
    assert!(matches!(err, CoreError::SchemaNameMismatch { .. }));
}

#[test]
fn test_schema_rejects_config_key() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "stg_weather.sql", "select 1");
    write(temp.path(), "stg_weather.yml", "config:\n  materialized: table\n");

    let err = Model::from_file(path).unwrap_err();
    assert!(matches!(err, CoreError::SchemaParseError { .. }));
}

#[test]
fn test_empty_sql_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "stg_weather.sql", "  \n");
    assert!(matches!(
        Model::from_file(path),
        Err(CoreError::ModelParseError { .. })
    ));
}

#[test]
fn test_invalid_file_stem() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), "stg-weather.sql", "select 1");
    assert!(matches!(
        Model::from_file(path),
        Err(CoreError::InvalidModelName { .. })
    ));
}

#[test]
fn test_discover_models_recursive_and_sorted() {
    let temp = TempDir::new().unwrap();
    let models = temp.path().join("models");
    write(&models, "staging/stg_weather.sql", "select 1");
    write(&models, "staging/stg_country.sql", "select 1");
    write(&models, "marts/mart_final.sql", "select 1");
    write(&models, "marts/README.md", "not a model");

    let found = discover_models(&[models, temp.path().join("missing")]).unwrap();
    let names: Vec<&str> = found.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["mart_final", "stg_country", "stg_weather"]);
}

#[test]
fn test_unique_key_columns() {
    let config = ModelConfig {
        unique_key: Some("weather_id, country_id ,".to_string()),
        ..Default::default()
    };
    assert_eq!(config.unique_key_columns(), vec!["weather_id", "country_id"]);
    assert!(ModelConfig::default().unique_key_columns().is_empty());
}
