//! Transform pipeline engine
//!
//! Executes ordered pipelines of table operations: filter, mutate,
//! select, sort, groupBy, ungroup, summarize, join, notify.
//!
//! # Execution contract
//!
//! - Operations run strictly left to right, each consuming the previous
//!   step's table.
//! - The first failure aborts the run; the partial result is discarded
//!   and the error surfaces as the run's error string.
//! - Registry entries published by `notify` before the failure survive.
//! - Empty tables flow through every operation without error.

mod aggregate;
mod errors;
mod op;
mod parse;
mod runner;

pub use aggregate::Aggregate;
pub use errors::{TransformError, TransformResult};
pub use op::{Pipeline, Transform, GROUP_COLUMN, JOIN_COLUMN};
pub use parse::TRANSFORM_MARKER;
pub use runner::{RunResult, Runner};
