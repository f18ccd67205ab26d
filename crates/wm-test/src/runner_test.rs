use super::*;
use wm_core::model::{SchemaTest, TestOrigin};
use wm_db::DuckDbBackend;

fn generated(test_type: TestType, relation: &str, column: &str) -> GeneratedTest {
    GeneratedTest::from_schema_test(&SchemaTest {
        test_type,
        column: column.to_string(),
        relation: relation.to_string(),
        origin: TestOrigin::Source,
    })
}

async fn weather_db() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE SCHEMA raw;
         CREATE TABLE raw.weather (ID BIGINT, CITY VARCHAR, TEMPERATURE DOUBLE, HUMIDITY INTEGER);
         INSERT INTO raw.weather VALUES
           (1, 'Paris', 20, 60),
           (2, NULL, 22.5, 55),
           (2, 'Vostok', -95, 101);",
    )
    .await
    .unwrap();
    db
}

#[tokio::test]
async fn test_unique_pass_and_fail() {
    let db = weather_db().await;
    let runner = TestRunner::new(&db);

    let ok = runner
        .run_test(&generated(TestType::Unique, "raw.weather", "CITY"))
        .await;
    assert!(ok.passed());

    let dup = runner
        .run_test(&generated(TestType::Unique, "raw.weather", "ID"))
        .await;
    assert_eq!(dup.status, TestStatus::Fail);
    assert_eq!(dup.failure_count, 1);
    assert_eq!(dup.sample_failures, vec!["ID=2, cnt=2"]);
}

#[tokio::test]
async fn test_not_null_fail() {
    let db = weather_db().await;
    let result = TestRunner::new(&db)
        .run_test(&generated(TestType::NotNull, "raw.weather", "CITY"))
        .await;
    assert_eq!(result.status, TestStatus::Fail);
    assert_eq!(result.failure_count, 1);
    assert!(result.sample_failures[0].contains("CITY=NULL"));
}

#[tokio::test]
async fn test_range_checks() {
    let db = weather_db().await;
    let runner = TestRunner::new(&db);

    let min = runner
        .run_test(&generated(
            TestType::MinValue { value: -90.0 },
            "raw.weather",
            "TEMPERATURE",
        ))
        .await;
    assert_eq!(min.failure_count, 1);

    let max = runner
        .run_test(&generated(
            TestType::MaxValue { value: 100.0 },
            "raw.weather",
            "HUMIDITY",
        ))
        .await;
    assert_eq!(max.failure_count, 1);

    let max_ok = runner
        .run_test(&generated(
            TestType::MaxValue { value: 60.0 },
            "raw.weather",
            "TEMPERATURE",
        ))
        .await;
    assert!(max_ok.passed());
}

#[tokio::test]
async fn test_sample_failures_are_capped() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t AS SELECT NULL::INTEGER AS c FROM range(12);")
        .await
        .unwrap();
    let result = TestRunner::new(&db)
        .run_test(&generated(TestType::NotNull, "t", "c"))
        .await;
    assert_eq!(result.failure_count, 12);
    assert_eq!(result.sample_failures.len(), SAMPLE_LIMIT);
}

#[tokio::test]
async fn test_missing_relation_is_an_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = TestRunner::new(&db)
        .run_test(&generated(TestType::NotNull, "raw.nowhere", "c"))
        .await;
    assert_eq!(result.status, TestStatus::Error);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_summary_and_fail_fast() {
    let db = weather_db().await;
    let tests = vec![
        generated(TestType::Unique, "raw.weather", "CITY"),
        generated(TestType::NotNull, "raw.weather", "CITY"),
        generated(TestType::Unique, "raw.weather", "ID"),
    ];

    let mut seen = 0;
    let (results, summary) = TestRunner::new(&db)
        .run_tests(&tests, |_| seen += 1)
        .await;
    assert_eq!(seen, 3);
    assert_eq!(results.len(), 3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 2);
    assert!(!summary.all_passed());

    let (results, summary) = TestRunner::new(&db)
        .fail_fast(true)
        .run_tests(&tests, |_| {})
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(summary.skipped, 1);
}
