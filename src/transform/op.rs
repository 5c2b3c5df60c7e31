//! Transform operation descriptors
//!
//! A pipeline is an immutable, ordered list of operations. Operations are
//! purely descriptive; all runtime state lives in the runner and the
//! pipeline manager.

use crate::expr::Expr;

use super::aggregate::Aggregate;

/// Column added by `groupBy` holding the 0-based group index.
pub const GROUP_COLUMN: &str = "_group_";

/// Column emitted by `join` holding the shared key value.
pub const JOIN_COLUMN: &str = "_join_";

/// One table-level operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Keep rows whose predicate is truthy; missing drops the row.
    Filter(Expr),
    /// Set or overwrite a column for every row.
    Mutate {
        /// Target column name
        column: String,
        /// Expression evaluated per row
        value: Expr,
    },
    /// Project onto exactly the named columns, in the given order.
    Select(Vec<String>),
    /// Stable multi-key sort, left-to-right key priority.
    Sort {
        /// Sort key columns
        columns: Vec<String>,
        /// Applies uniformly to all keys
        descending: bool,
    },
    /// Assign `_group_` by rank of first appearance of the column's value.
    GroupBy(String),
    /// Remove `_group_`; a no-op when no grouping is present.
    Ungroup,
    /// One scalar per group for each `(aggregate, column)` pair.
    Summarize(Vec<(Aggregate, String)>),
    /// Equijoin of two previously published tables.
    Join {
        /// Registry name of the left table
        left_name: String,
        /// Key column in the left table
        left_column: String,
        /// Registry name of the right table
        right_name: String,
        /// Key column in the right table
        right_column: String,
    },
    /// Publish the current table under a name; passes the table through.
    Notify(String),
}

impl Transform {
    /// The wire name used in serialized operation arrays.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Filter(_) => "filter",
            Transform::Mutate { .. } => "mutate",
            Transform::Select(_) => "select",
            Transform::Sort { .. } => "sort",
            Transform::GroupBy(_) => "groupBy",
            Transform::Ungroup => "ungroup",
            Transform::Summarize(_) => "summarize",
            Transform::Join { .. } => "join",
            Transform::Notify(_) => "notify",
        }
    }
}

/// An ordered pipeline of transforms. Immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    ops: Vec<Transform>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline from operations.
    pub fn from_ops(ops: Vec<Transform>) -> Self {
        Self { ops }
    }

    /// Appends an operation (builder style).
    pub fn then(mut self, op: Transform) -> Self {
        self.ops.push(op);
        self
    }

    /// The operations, in execution order.
    pub fn ops(&self) -> &[Transform] {
        &self.ops
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the pipeline has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn test_builder() {
        let pipeline = Pipeline::new()
            .then(Transform::Filter(Expr::column("alive")))
            .then(Transform::Notify("survivors".into()));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.ops()[0].name(), "filter");
        assert_eq!(pipeline.ops()[1].name(), "notify");
    }

    #[test]
    fn test_op_names() {
        assert_eq!(Transform::Ungroup.name(), "ungroup");
        assert_eq!(Transform::GroupBy("x".into()).name(), "groupBy");
        assert_eq!(Transform::Select(vec![]).name(), "select");
    }
}
