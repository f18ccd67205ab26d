use super::*;

fn parse(yaml: &str) -> Vec<TestDefinition> {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
fn test_simple_tests() {
    let defs = parse("- unique\n- not_null\n");
    assert_eq!(parse_test_definition(&defs[0]), Some(TestType::Unique));
    assert_eq!(parse_test_definition(&defs[1]), Some(TestType::NotNull));
}

#[test]
fn test_temperature_bounds() {
    let defs = parse(
        r#"
- min_value:
    value: -90
- max_value:
    value: 60
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::MinValue { value: -90.0 })
    );
    assert_eq!(
        parse_test_definition(&defs[1]),
        Some(TestType::MaxValue { value: 60.0 })
    );
}

#[test]
fn test_accepted_values_mixed_scalars() {
    let defs = parse(
        r#"
- accepted_values:
    values: [Europe, 7, true]
    quote: true
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::AcceptedValues {
            values: vec!["Europe".into(), "7".into(), "true".into()],
            quote: true,
        })
    );
}

#[test]
fn test_relationships() {
    let defs = parse(
        r#"
- relationships:
    to: stg_country
    field: country_id
"#,
    );
    assert_eq!(
        parse_test_definition(&defs[0]),
        Some(TestType::Relationships {
            to: "stg_country".into(),
            field: Some("country_id".into()),
        })
    );
}

#[test]
fn test_missing_parameters_are_rejected() {
    let defs = parse(
        r#"
- min_value: {}
- accepted_values:
    values: []
- relationships: {}
- regex
"#,
    );
    for def in &defs {
        assert_eq!(parse_test_definition(def), None);
    }
}

#[test]
fn test_expand_column_tests_drops_unknown() {
    let defs = parse("- unique\n- positive\n- not_null\n");
    let tests = expand_column_tests("raw.country", "COUNTRYID", &defs, TestOrigin::Source);
    assert_eq!(tests.len(), 2);
    assert_eq!(tests[0].relation, "raw.country");
    assert_eq!(tests[0].name(), "unique_raw_country__COUNTRYID");
    assert_eq!(tests[1].origin, TestOrigin::Source);
}
