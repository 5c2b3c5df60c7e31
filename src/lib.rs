//! tabula - an in-memory tabular transform engine
//!
//! Evaluates row-level scalar expressions and executes ordered pipelines
//! of table operations (filter, mutate, sort, select, group, ungroup,
//! summarize, join) with explicit three-valued missing semantics.
//!
//! Execution is single-threaded and synchronous; the only state shared
//! across runs is the [`PipelineManager`] registry, which callers reset
//! between independent run cycles.

pub mod expr;
pub mod manager;
pub mod observe;
pub mod transform;
pub mod value;

pub use expr::{BinaryOp, Expr, ExprError, UnaryOp, EXPR_MARKER};
pub use manager::PipelineManager;
pub use transform::{
    Aggregate, Pipeline, RunResult, Runner, Transform, TransformError, GROUP_COLUMN, JOIN_COLUMN,
    TRANSFORM_MARKER,
};
pub use value::{Row, Table, Value};
