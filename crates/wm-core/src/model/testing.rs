//! Data-quality test definitions declared on model and source columns

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parse a test definition into a TestType
///
/// Returns `None` for unknown test names and for parameterized tests that
/// are missing their required parameters.
pub fn parse_test_definition(test_def: &TestDefinition) -> Option<TestType> {
    match test_def {
        TestDefinition::Simple(name) => parse_simple_test(name),
        TestDefinition::Parameterized(map) => {
            let (test_name, params) = map.iter().next()?;
            parse_parameterized_test(test_name, params)
        }
    }
}

fn parse_simple_test(name: &str) -> Option<TestType> {
    match name {
        "unique" => Some(TestType::Unique),
        "not_null" => Some(TestType::NotNull),
        _ => None,
    }
}

fn parse_parameterized_test(test_name: &str, params: &TestParams) -> Option<TestType> {
    match test_name {
        "accepted_values" => parse_accepted_values(params),
        "min_value" => params.value.map(|value| TestType::MinValue { value }),
        "max_value" => params.value.map(|value| TestType::MaxValue { value }),
        "relationships" => params.to.clone().map(|to| TestType::Relationships {
            to,
            field: params.field.clone(),
        }),
        _ => None,
    }
}

fn parse_accepted_values(params: &TestParams) -> Option<TestType> {
    let values: Vec<String> = params
        .values
        .iter()
        .filter_map(|v| match v {
            serde_yaml::Value::String(s) => Some(s.clone()),
            serde_yaml::Value::Number(n) => Some(n.to_string()),
            serde_yaml::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(TestType::AcceptedValues {
        values,
        quote: params.quote,
    })
}

/// Where a schema test was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOrigin {
    /// A column of a model's 1:1 schema file
    Model,
    /// A column of a table in a `kind: sources` file
    Source,
}

/// A single column test bound to the relation it runs against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTest {
    /// Test type (unique, not_null, etc.)
    pub test_type: TestType,

    /// Column name to test
    pub column: String,

    /// Model name, or `schema.table` for source tests
    pub relation: String,

    /// Where the test was declared
    pub origin: TestOrigin,
}

impl SchemaTest {
    /// Stable display name, e.g. `not_null_mart_final__weather_id`
    pub fn name(&self) -> String {
        format!(
            "{}_{}__{}",
            self.test_type,
            self.relation.replace('.', "_"),
            self.column
        )
    }
}

/// Types of schema tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Column values must be unique
    Unique,
    /// Column values must not be null
    NotNull,
    /// Column values must be in the allowed list
    AcceptedValues {
        values: Vec<String>,
        /// Quote every value as a string literal
        #[serde(default)]
        quote: bool,
    },
    /// Column values must be >= value
    MinValue { value: f64 },
    /// Column values must be <= value
    MaxValue { value: f64 },
    /// Every non-null value must exist in `to.field`
    Relationships {
        /// Referenced model name or `schema.table`
        to: String,
        /// Referenced column (defaults to the tested column)
        #[serde(default)]
        field: Option<String>,
    },
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Unique => write!(f, "unique"),
            TestType::NotNull => write!(f, "not_null"),
            TestType::AcceptedValues { .. } => write!(f, "accepted_values"),
            TestType::MinValue { .. } => write!(f, "min_value"),
            TestType::MaxValue { .. } => write!(f, "max_value"),
            TestType::Relationships { .. } => write!(f, "relationships"),
        }
    }
}

/// A test entry in YAML: either a bare name or a single-key map of parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestDefinition {
    /// `- unique`
    Simple(String),
    /// `- accepted_values: { values: [...] }`
    Parameterized(HashMap<String, TestParams>),
}

/// Parameters for parameterized tests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestParams {
    #[serde(default)]
    pub values: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub quote: bool,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

/// Expand a column's test list into bound schema tests, dropping unknown ones.
pub fn expand_column_tests(
    relation: &str,
    column: &str,
    tests: &[TestDefinition],
    origin: TestOrigin,
) -> Vec<SchemaTest> {
    tests
        .iter()
        .filter_map(|def| match parse_test_definition(def) {
            Some(test_type) => Some(SchemaTest {
                test_type,
                column: column.to_string(),
                relation: relation.to_string(),
                origin,
            }),
            None => {
                log::warn!(
                    "Ignoring unrecognised test {:?} on {}.{}",
                    def,
                    relation,
                    column
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "testing_test.rs"]
mod tests;
