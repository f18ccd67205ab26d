//! wm-test - Data-quality tests for Weathermart
//!
//! Turns the column tests declared on models and sources into SQL that
//! returns offending rows, and runs them. A test passes when its query
//! returns nothing.

pub mod generator;
pub mod runner;

pub use generator::{GeneratedTest, TestGenError, TestGenResult};
pub use runner::{TestResult, TestRunner, TestStatus, TestSummary};
