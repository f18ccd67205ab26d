//! Test execution

use crate::generator::GeneratedTest;
use std::fmt;
use std::time::{Duration, Instant};
use wm_core::model::TestType;
use wm_db::Database;

/// Failing rows kept per test for display
pub const SAMPLE_LIMIT: usize = 5;

/// Outcome of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass => write!(f, "pass"),
            TestStatus::Fail => write!(f, "fail"),
            TestStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of a single test execution
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,

    /// Relation tested
    pub relation: String,

    pub column: String,

    pub test_type: TestType,

    pub status: TestStatus,

    /// Number of failing rows (0 if passed)
    pub failure_count: usize,

    /// Up to [`SAMPLE_LIMIT`] failing rows as `col=value, ...`
    pub sample_failures: Vec<String>,

    pub duration: Duration,

    /// Error message if the query itself failed
    pub error: Option<String>,
}

impl TestResult {
    fn new(test: &GeneratedTest, status: TestStatus, duration: Duration) -> Self {
        Self {
            name: test.name.clone(),
            relation: test.relation.clone(),
            column: test.column.clone(),
            test_type: test.test_type.clone(),
            status,
            failure_count: 0,
            sample_failures: Vec::new(),
            duration,
            error: None,
        }
    }

    pub fn pass(test: &GeneratedTest, duration: Duration) -> Self {
        Self::new(test, TestStatus::Pass, duration)
    }

    pub fn fail(
        test: &GeneratedTest,
        failure_count: usize,
        sample_failures: Vec<String>,
        duration: Duration,
    ) -> Self {
        Self {
            failure_count,
            sample_failures,
            ..Self::new(test, TestStatus::Fail, duration)
        }
    }

    pub fn error(test: &GeneratedTest, error: String, duration: Duration) -> Self {
        Self {
            error: Some(error),
            ..Self::new(test, TestStatus::Error, duration)
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Pass
    }
}

/// Summary of a test run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// Tests not run because of `fail_fast`
    pub skipped: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult], planned: usize, duration: Duration) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: planned,
            passed: count(TestStatus::Pass),
            failed: count(TestStatus::Fail),
            errors: count(TestStatus::Error),
            skipped: planned.saturating_sub(results.len()),
            duration,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Test runner for executing schema tests
pub struct TestRunner<'a> {
    db: &'a dyn Database,
    fail_fast: bool,
}

impl<'a> TestRunner<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            fail_fast: false,
        }
    }

    /// Stop after the first test that does not pass
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run a single generated test
    pub async fn run_test(&self, test: &GeneratedTest) -> TestResult {
        let start = Instant::now();

        match self.db.query_count(&test.sql).await {
            Ok(0) => TestResult::pass(test, start.elapsed()),
            Ok(count) => {
                let sample_failures = match self.db.query_sample_rows(&test.sql, SAMPLE_LIMIT).await
                {
                    Ok(rows) => rows,
                    Err(e) => {
                        log::warn!("Could not sample failures of {}: {}", test.name, e);
                        Vec::new()
                    }
                };
                TestResult::fail(test, count, sample_failures, start.elapsed())
            }
            Err(e) => TestResult::error(test, e.to_string(), start.elapsed()),
        }
    }

    /// Run tests in order, reporting each result as it completes
    pub async fn run_tests(
        &self,
        tests: &[GeneratedTest],
        mut on_result: impl FnMut(&TestResult),
    ) -> (Vec<TestResult>, TestSummary) {
        let start = Instant::now();
        let mut results = Vec::with_capacity(tests.len());

        for test in tests {
            log::debug!("Running test {}: {}", test.name, test.sql);
            let result = self.run_test(test).await;
            on_result(&result);
            let stop = self.fail_fast && !result.passed();
            results.push(result);
            if stop {
                break;
            }
        }

        let summary = TestSummary::from_results(&results, tests.len(), start.elapsed());
        (results, summary)
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
