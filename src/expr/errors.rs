//! Expression engine error types
//!
//! Every variant aborts the enclosing pipeline run and surfaces as the
//! run's error string. Conversion failures (unparsable text, invalid
//! dates) are deliberately NOT errors; they degrade to `Missing`.

use thiserror::Error;

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while constructing, deserializing, or evaluating
/// expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// An operand's runtime type does not satisfy the operation,
    /// e.g. arithmetic on text.
    #[error("type error: {0}")]
    TypeError(String),

    /// A comparison between values of differing runtime types.
    #[error("type mismatch: cannot compare {left} with {right}")]
    TypeMismatch {
        /// Type name of the left operand
        left: &'static str,
        /// Type name of the right operand
        right: &'static str,
    },

    /// Reference to a column absent from the current row.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A serialized expression that does not encode a valid node.
    #[error("malformed expression: {0}")]
    MalformedExpression(String),
}
