//! wm-exec - Compilation and materialization for Weathermart
//!
//! Renders model templates into SQL, orders them by their `ref()`
//! dependencies and materializes them as views, tables or incremental
//! tables. Also loads seeds and audits the weather mart.

pub mod audit;
pub mod compile;
pub mod error;
pub mod execute;
pub mod run_results;
pub mod seed;

pub use audit::audit_project;
pub use compile::{compile_project, CompileOptions, CompiledModel, CompiledProject};
pub use error::{ExecError, ExecResult};
pub use execute::{compile_for_run, materialize, run_models, run_project, RunOptions};
pub use run_results::{ModelRunResult, RunResults, RunStatus};
pub use seed::{load_seeds, select_seeds, SeedResult};
