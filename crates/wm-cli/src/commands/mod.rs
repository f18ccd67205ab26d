//! CLI command implementations

pub(crate) mod audit;
pub(crate) mod clean;
pub(crate) mod common;
pub(crate) mod compile;
pub(crate) mod ls;
pub(crate) mod run;
pub(crate) mod seed;
