//! wm-jinja - Jinja templating layer for Weathermart
//!
//! Model templates are rendered with minijinja. The environment provides
//! `config()`, `var()`, `ref()`, `source()` and `surrogate_key()`, plus the
//! per-model `this` variable and `is_incremental()` function.

pub mod environment;
pub mod error;
pub mod functions;

pub use environment::{JinjaEnvironment, ModelContext, RenderedModel};
pub use error::{JinjaError, JinjaResult};
pub use functions::{yaml_to_json, IncrementalState, Relations};
