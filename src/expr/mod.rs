//! Expression engine
//!
//! Typed AST over scalar expressions, evaluated once per row with
//! three-valued missing semantics.
//!
//! # Evaluation contract
//!
//! `Expr::evaluate(row, row_index)` is total over the grammar for
//! well-typed input; ill-typed input (arithmetic on text, comparison of
//! differing types) fails with an [`ExprError`] that the pipeline engine
//! converts into a run abort. Conversion failures never error; they yield
//! `Missing`.

mod ast;
mod errors;
mod eval;
mod serial;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use errors::{ExprError, ExprResult};
pub use serial::EXPR_MARKER;
