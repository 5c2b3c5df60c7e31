//! Value model shared by the expression and transform engines
//!
//! Defines the scalar `Value` sum type with its missing-value sentinel,
//! and the ordered `Row`/`Table` containers that pipelines operate on.

mod table;
mod value;

pub use table::{Row, Table};
pub use value::Value;
