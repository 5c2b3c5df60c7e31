//! Pipeline engine error types
//!
//! Any of these aborts the current run: the partial result is discarded
//! and the message becomes the run's error string. Registry entries
//! published by `notify` earlier in the same run are retained.

use thiserror::Error;

use crate::expr::ExprError;

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Errors raised while decoding or executing pipeline operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// An operation names a column absent from the current table.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A join or lookup names a table never published via notify.
    #[error("no table registered under name: {0}")]
    UnknownRegistryName(String),

    /// A serialized operation array that does not encode a valid transform.
    #[error("malformed transform: {0}")]
    MalformedTransform(String),

    /// An expression failed during evaluation or deserialization.
    #[error(transparent)]
    Expr(#[from] ExprError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TransformError::UnknownRegistryName("earnings".into());
        assert_eq!(err.to_string(), "no table registered under name: earnings");

        let err = TransformError::UnknownColumn("blue".into());
        assert_eq!(err.to_string(), "unknown column: blue");
    }

    #[test]
    fn test_expr_error_converts() {
        let expr_err = ExprError::UnknownColumn("red".into());
        let err: TransformError = expr_err.into();
        assert_eq!(err.to_string(), "unknown column: red");
    }
}
