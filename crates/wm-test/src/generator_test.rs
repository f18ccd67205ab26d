use super::*;

fn model_test(test_type: TestType, relation: &str, column: &str) -> SchemaTest {
    SchemaTest {
        test_type,
        column: column.to_string(),
        relation: relation.to_string(),
        origin: TestOrigin::Model,
    }
}

#[test]
fn test_generate_unique_test() {
    let sql = generate_unique_test("mart_final", "unique_key");
    assert!(sql.contains(r#"FROM "mart_final""#));
    assert!(sql.contains(r#"GROUP BY "unique_key""#));
    assert!(sql.contains("HAVING COUNT(*) > 1"));
}

#[test]
fn test_generate_not_null_test() {
    let sql = generate_not_null_test("raw.weather", "CITY");
    assert_eq!(sql, r#"SELECT * FROM "raw"."weather" WHERE "CITY" IS NULL"#);
}

#[test]
fn test_generate_accepted_values_quoted() {
    let values = vec!["Europe".to_string(), "Côte d'Azur".to_string()];
    let sql = generate_accepted_values_test("stg_country", "region", &values, true);
    assert!(sql.contains("NOT IN ('Europe', 'Côte d''Azur')"));
    assert!(sql.contains(r#""region" IS NULL"#));
}

#[test]
fn test_generate_accepted_values_unquoted_numbers() {
    let values = vec!["1".to_string(), "2.5".to_string(), "x'; DROP".to_string()];
    let sql = generate_accepted_values_test("t", "c", &values, false);
    assert!(sql.contains("NOT IN (1, 2.5, 'x''; DROP')"));
}

#[test]
fn test_generate_min_max_value() {
    let sql = generate_min_value_test("raw.weather", "TEMPERATURE", -90.0).unwrap();
    assert!(sql.ends_with(r#"WHERE "TEMPERATURE" < -90"#));

    let sql = generate_max_value_test("raw.weather", "HUMIDITY", 100.0).unwrap();
    assert!(sql.ends_with(r#"WHERE "HUMIDITY" > 100"#));

    assert!(matches!(
        generate_min_value_test("t", "c", f64::NAN),
        Err(TestGenError::InvalidThreshold(_))
    ));
    assert!(generate_max_value_test("t", "c", f64::INFINITY).is_err());
}

#[test]
fn test_invalid_threshold_becomes_failing_query() {
    let generated = GeneratedTest::from_schema_test(&model_test(
        TestType::MaxValue { value: f64::NAN },
        "t",
        "c",
    ));
    assert!(generated.sql.starts_with("SELECT 'ERROR: invalid threshold value"));
}

#[test]
fn test_generate_relationship_test() {
    let sql = generate_relationship_test("stg_weather", "country_name", "stg_country", "country_name");
    assert!(sql.contains(r#"FROM "stg_weather" AS src"#));
    assert!(sql.contains(r#"FROM "stg_country" AS ref_tbl"#));
    assert!(sql.contains(r#"ref_tbl."country_name" = src."country_name""#));
    assert!(sql.contains(r#"src."country_name" IS NOT NULL"#));
}

#[test]
fn test_generated_test_name_and_relation() {
    let generated = GeneratedTest::from_schema_test(&model_test(
        TestType::Unique,
        "mart_final",
        "unique_key",
    ));
    assert_eq!(generated.name, "unique_mart_final__unique_key");
    assert_eq!(generated.relation, "mart_final");
}

#[test]
fn test_resolver_applies_to_model_tests_only() {
    let resolve = |name: &str| format!("analytics.{}", name);

    let model = GeneratedTest::from_schema_test_resolved(
        &model_test(TestType::NotNull, "mart_final", "weather_id"),
        resolve,
    );
    assert_eq!(model.relation, "analytics.mart_final");
    assert!(model.sql.contains(r#"FROM "analytics"."mart_final""#));

    let source = GeneratedTest::from_schema_test_resolved(
        &SchemaTest {
            test_type: TestType::NotNull,
            column: "CITY".into(),
            relation: "raw.weather".into(),
            origin: TestOrigin::Source,
        },
        resolve,
    );
    assert_eq!(source.relation, "raw.weather");
    assert_eq!(source.name, "not_null_raw_weather__CITY");
}

#[test]
fn test_relationship_target_is_resolved() {
    let generated = GeneratedTest::from_schema_test_resolved(
        &model_test(
            TestType::Relationships {
                to: "stg_country".into(),
                field: None,
            },
            "mart_final",
            "country_name",
        ),
        |name| format!("analytics.{}", name),
    );
    assert!(generated
        .sql
        .contains(r#"FROM "analytics"."stg_country" AS ref_tbl"#));
    assert!(generated
        .sql
        .contains(r#"ref_tbl."country_name" = src."country_name""#));
}
