//! Pipeline execution
//!
//! Operations execute strictly left to right, each consuming the table
//! produced by the previous step. The input table is the external
//! data-producing source, already materialized by the caller. On the
//! first failure execution stops: the partial result is discarded, the
//! error is recorded on the manager, and tables already published by
//! `notify` in the same run stay registered.

use std::cmp::Ordering;

use crate::manager::PipelineManager;
use crate::observe::{Logger, Severity};
use crate::value::{Row, Table, Value};

use super::errors::{TransformError, TransformResult};
use super::op::{Pipeline, Transform, GROUP_COLUMN, JOIN_COLUMN};

/// Outcome of one pipeline run.
///
/// `error` is empty on success. A failed run carries an empty table;
/// `Missing` cells are `Value::Missing`, never `null` or NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// The final table; empty when the run failed
    pub table: Table,
    /// Descriptive error message; empty on success
    pub error: String,
}

impl RunResult {
    /// Returns true if the run completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// Executes pipelines against a manager.
pub struct Runner;

impl Runner {
    /// Runs a pipeline over the source table.
    ///
    /// Records the outcome on the manager; sequential runs share the
    /// manager's registry until [`PipelineManager::reset`] is called.
    pub fn run(input: Table, pipeline: &Pipeline, manager: &mut PipelineManager) -> RunResult {
        let op_count = pipeline.len().to_string();
        Logger::log(
            Severity::Trace,
            "pipeline_run_started",
            &[("operations", op_count.as_str())],
        );

        let mut table = input;
        for op in pipeline.ops() {
            match Self::apply(op, table, manager) {
                Ok(next) => table = next,
                Err(err) => {
                    let message = err.to_string();
                    Logger::log_stderr(
                        Severity::Error,
                        "pipeline_run_failed",
                        &[("operation", op.name()), ("error", message.as_str())],
                    );
                    manager.record_failure(message.clone());
                    return RunResult {
                        table: Table::new(),
                        error: message,
                    };
                }
            }
        }

        let row_count = table.len().to_string();
        Logger::log(
            Severity::Info,
            "pipeline_run_completed",
            &[("rows", row_count.as_str())],
        );
        manager.record_success(&table);
        RunResult {
            table,
            error: String::new(),
        }
    }

    /// Applies one operation to the current table.
    fn apply(
        op: &Transform,
        table: Table,
        manager: &mut PipelineManager,
    ) -> TransformResult<Table> {
        match op {
            Transform::Filter(predicate) => {
                let mut kept = Vec::new();
                for (index, row) in table.into_rows().into_iter().enumerate() {
                    if predicate.evaluate(&row, index)?.is_truthy() {
                        kept.push(row);
                    }
                }
                Ok(Table::from_rows(kept))
            }
            Transform::Mutate { column, value } => {
                let mut rows = table.into_rows();
                for (index, row) in rows.iter_mut().enumerate() {
                    let result = value.evaluate(row, index)?;
                    row.set(column.clone(), result);
                }
                Ok(Table::from_rows(rows))
            }
            Transform::Select(columns) => Self::select(table, columns),
            Transform::Sort {
                columns,
                descending,
            } => Self::sort(table, columns, *descending),
            Transform::GroupBy(column) => Self::group_by(table, column),
            Transform::Ungroup => {
                let mut rows = table.into_rows();
                for row in &mut rows {
                    row.remove(GROUP_COLUMN);
                }
                Ok(Table::from_rows(rows))
            }
            Transform::Summarize(pairs) => Self::summarize(table, pairs),
            Transform::Join {
                left_name,
                left_column,
                right_name,
                right_column,
            } => Self::join(manager, left_name, left_column, right_name, right_column),
            Transform::Notify(name) => {
                manager.register(name.clone(), table.clone());
                Ok(table)
            }
        }
    }

    fn select(table: Table, columns: &[String]) -> TransformResult<Table> {
        // A zero-row table has no column metadata to validate against.
        if !table.is_empty() {
            for column in columns {
                if !table.has_column(column) {
                    return Err(TransformError::UnknownColumn(column.clone()));
                }
            }
        }
        let rows = table
            .into_rows()
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row.get(column).cloned().unwrap_or(Value::Missing);
                        (column.clone(), value)
                    })
                    .collect::<Row>()
            })
            .collect();
        Ok(rows)
    }

    fn sort(table: Table, columns: &[String], descending: bool) -> TransformResult<Table> {
        if !table.is_empty() {
            for column in columns {
                if !table.has_column(column) {
                    return Err(TransformError::UnknownColumn(column.clone()));
                }
            }
        }
        let mut rows = table.into_rows();
        rows.sort_by(|a, b| {
            let mut ordering = Ordering::Equal;
            for column in columns {
                ordering = compare_cells(a.get(column), b.get(column));
                if ordering != Ordering::Equal {
                    break;
                }
            }
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(Table::from_rows(rows))
    }

    fn group_by(table: Table, column: &str) -> TransformResult<Table> {
        if !table.is_empty() && !table.has_column(column) {
            return Err(TransformError::UnknownColumn(column.to_string()));
        }
        // Rank of first appearance, in row order. Structural equality so
        // missing cells form their own single group.
        let mut seen: Vec<Value> = Vec::new();
        let mut rows = table.into_rows();
        for row in &mut rows {
            let value = row.get(column).cloned().unwrap_or(Value::Missing);
            let rank = match seen.iter().position(|v| *v == value) {
                Some(rank) => rank,
                None => {
                    seen.push(value);
                    seen.len() - 1
                }
            };
            row.set(GROUP_COLUMN, Value::number(rank as f64));
        }
        Ok(Table::from_rows(rows))
    }

    fn summarize(table: Table, pairs: &[(super::Aggregate, String)]) -> TransformResult<Table> {
        if table.is_empty() {
            return Ok(Table::new());
        }
        for (_, column) in pairs {
            if !table.has_column(column) {
                return Err(TransformError::UnknownColumn(column.clone()));
            }
        }

        let grouped = table.has_column(GROUP_COLUMN);
        // Buckets in first-appearance order of the group value; one
        // overall bucket when ungrouped.
        let mut buckets: Vec<(Value, Vec<&Row>)> = Vec::new();
        for row in table.rows() {
            let key = if grouped {
                row.get(GROUP_COLUMN).cloned().unwrap_or(Value::Missing)
            } else {
                Value::Missing
            };
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, rows)) => rows.push(row),
                None => buckets.push((key, vec![row])),
            }
        }

        let mut out = Table::new();
        for (key, rows) in buckets {
            let mut result = Row::new();
            if grouped {
                result.set(GROUP_COLUMN, key);
            }
            for (agg, column) in pairs {
                let values: Vec<Value> = rows
                    .iter()
                    .map(|row| row.get(column).cloned().unwrap_or(Value::Missing))
                    .collect();
                let name = format!("{}_{}", column, agg.name());
                result.set(name, agg.apply(&values)?);
            }
            out.push(result);
        }
        Ok(out)
    }

    fn join(
        manager: &PipelineManager,
        left_name: &str,
        left_column: &str,
        right_name: &str,
        right_column: &str,
    ) -> TransformResult<Table> {
        let left = manager.lookup(left_name)?;
        let right = manager.lookup(right_name)?;

        let mut out = Table::new();
        for left_row in left.rows() {
            let key = match left_row.get(left_column) {
                Some(value) => value,
                None => continue,
            };
            for right_row in right.rows() {
                // Missing never matches; differing key types do not match.
                let matched = right_row
                    .get(right_column)
                    .and_then(|value| key.strict_equals(value))
                    .unwrap_or(false);
                if !matched {
                    continue;
                }
                let mut row = Row::new();
                row.set(JOIN_COLUMN, key.clone());
                for (name, value) in left_row.iter() {
                    if name != left_column {
                        row.set(format!("left_{name}"), value.clone());
                    }
                }
                for (name, value) in right_row.iter() {
                    if name != right_column {
                        row.set(format!("right_{name}"), value.clone());
                    }
                }
                out.push(row);
            }
        }
        Ok(out)
    }
}

/// Comparison used by `sort`: missing sorts below every concrete value,
/// same-typed values use their natural ordering, and mixed-type cells
/// fall back to a fixed type rank so the ordering stays total.
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Missing);
    let b = b.unwrap_or(&Value::Missing);
    match a.strict_cmp(b) {
        Some(ordering) => ordering,
        None => a.sort_rank().cmp(&b.sort_rank()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Expr, UnaryOp};
    use crate::transform::Aggregate;

    fn table(rows: &[&[(&str, Value)]]) -> Table {
        rows.iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect::<Row>()
            })
            .collect()
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn run_one(input: Table, op: Transform) -> RunResult {
        let mut manager = PipelineManager::new();
        Runner::run(input, &Pipeline::from_ops(vec![op]), &mut manager)
    }

    #[test]
    fn test_filter_keeps_truthy_drops_missing() {
        let input = table(&[
            &[("x", num(1.0))],
            &[("x", num(0.0))],
            &[("x", Value::Missing)],
            &[("x", num(2.0))],
        ]);
        let result = run_one(input, Transform::Filter(Expr::column("x")));
        assert!(result.is_success());
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.rows()[1].get("x"), Some(&num(2.0)));
    }

    #[test]
    fn test_filter_empty_table_is_noop() {
        let result = run_one(Table::new(), Transform::Filter(Expr::column("x")));
        assert!(result.is_success());
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_mutate_adds_and_overwrites() {
        let input = table(&[&[("x", num(2.0))], &[("x", num(3.0))]]);
        let op = Transform::Mutate {
            column: "y".into(),
            value: Expr::binary(BinaryOp::Multiply, Expr::column("x"), Expr::number(10.0)),
        };
        let result = run_one(input, op);
        assert!(result.is_success());
        assert_eq!(result.table.rows()[0].get("y"), Some(&num(20.0)));
        assert_eq!(result.table.rows()[1].get("y"), Some(&num(30.0)));
    }

    #[test]
    fn test_mutate_rownum_reflects_current_position() {
        let input = table(&[&[("x", num(9.0))], &[("x", num(8.0))]]);
        let op = Transform::Mutate {
            column: "n".into(),
            value: Expr::RowNum,
        };
        let result = run_one(input, op);
        assert_eq!(result.table.rows()[0].get("n"), Some(&num(1.0)));
        assert_eq!(result.table.rows()[1].get("n"), Some(&num(2.0)));
    }

    #[test]
    fn test_select_projects_in_order() {
        let input = table(&[&[("a", num(1.0)), ("b", num(2.0)), ("c", num(3.0))]]);
        let result = run_one(input, Transform::Select(vec!["c".into(), "a".into()]));
        assert!(result.is_success());
        let names: Vec<_> = result.table.rows()[0].column_names().cloned().collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn test_select_unknown_column_fails() {
        let input = table(&[&[("a", num(1.0))]]);
        let result = run_one(input, Transform::Select(vec!["z".into()]));
        assert!(!result.is_success());
        assert_eq!(result.error, "unknown column: z");
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_select_on_empty_table_succeeds() {
        let result = run_one(Table::new(), Transform::Select(vec!["z".into()]));
        assert!(result.is_success());
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_sort_missing_first_and_stable() {
        let input = table(&[
            &[("x", num(2.0)), ("tag", Value::Text("a".into()))],
            &[("x", Value::Missing), ("tag", Value::Text("b".into()))],
            &[("x", num(1.0)), ("tag", Value::Text("c".into()))],
            &[("x", num(2.0)), ("tag", Value::Text("d".into()))],
        ]);
        let result = run_one(
            input,
            Transform::Sort {
                columns: vec!["x".into()],
                descending: false,
            },
        );
        let tags: Vec<_> = result
            .table
            .rows()
            .iter()
            .map(|row| row.get("tag").cloned().unwrap())
            .collect();
        // Missing sorts first; equal keys keep original order (a before d).
        assert_eq!(
            tags,
            vec![
                Value::Text("b".into()),
                Value::Text("c".into()),
                Value::Text("a".into()),
                Value::Text("d".into()),
            ]
        );
    }

    #[test]
    fn test_sort_descending_multi_key() {
        let input = table(&[
            &[("a", num(1.0)), ("b", num(1.0))],
            &[("a", num(1.0)), ("b", num(2.0))],
            &[("a", num(2.0)), ("b", num(0.0))],
        ]);
        let result = run_one(
            input,
            Transform::Sort {
                columns: vec!["a".into(), "b".into()],
                descending: true,
            },
        );
        let pairs: Vec<_> = result
            .table
            .rows()
            .iter()
            .map(|row| {
                (
                    row.get("a").cloned().unwrap(),
                    row.get("b").cloned().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![(num(2.0), num(0.0)), (num(1.0), num(2.0)), (num(1.0), num(1.0))]
        );
    }

    #[test]
    fn test_group_by_rank_of_first_appearance() {
        let input = table(&[
            &[("k", Value::Text("A".into()))],
            &[("k", Value::Text("A".into()))],
            &[("k", Value::Text("B".into()))],
            &[("k", Value::Text("C".into()))],
            &[("k", Value::Text("C".into()))],
            &[("k", Value::Text("C".into()))],
        ]);
        let result = run_one(input, Transform::GroupBy("k".into()));
        let groups: Vec<_> = result
            .table
            .rows()
            .iter()
            .map(|row| row.get(GROUP_COLUMN).cloned().unwrap())
            .collect();
        assert_eq!(
            groups,
            vec![num(0.0), num(0.0), num(1.0), num(2.0), num(2.0), num(2.0)]
        );
        // The grouping column itself remains.
        assert!(result.table.has_column("k"));
    }

    #[test]
    fn test_group_by_missing_forms_its_own_group() {
        let input = table(&[
            &[("k", Value::Missing)],
            &[("k", num(1.0))],
            &[("k", Value::Missing)],
        ]);
        let result = run_one(input, Transform::GroupBy("k".into()));
        let groups: Vec<_> = result
            .table
            .rows()
            .iter()
            .map(|row| row.get(GROUP_COLUMN).cloned().unwrap())
            .collect();
        assert_eq!(groups, vec![num(0.0), num(1.0), num(0.0)]);
    }

    #[test]
    fn test_ungroup_removes_group_column_and_is_idempotent() {
        let input = table(&[&[("k", num(1.0))]]);
        let grouped = run_one(input, Transform::GroupBy("k".into())).table;
        let result = run_one(grouped, Transform::Ungroup);
        assert!(result.is_success());
        assert!(!result.table.has_column(GROUP_COLUMN));

        // No grouping present: still a no-op, not an error.
        let again = run_one(result.table.clone(), Transform::Ungroup);
        assert!(again.is_success());
        assert_eq!(again.table, result.table);
    }

    #[test]
    fn test_summarize_ungrouped_single_row() {
        let input = table(&[&[("x", num(1.0))], &[("x", num(3.0))]]);
        let result = run_one(
            input,
            Transform::Summarize(vec![
                (Aggregate::Mean, "x".into()),
                (Aggregate::Count, "x".into()),
            ]),
        );
        assert!(result.is_success());
        assert_eq!(result.table.len(), 1);
        let row = &result.table.rows()[0];
        assert_eq!(row.get("x_mean"), Some(&num(2.0)));
        assert_eq!(row.get("x_count"), Some(&num(2.0)));
    }

    #[test]
    fn test_summarize_grouped_one_row_per_group() {
        let input = table(&[
            &[("k", Value::Text("A".into())), ("x", num(1.0))],
            &[("k", Value::Text("B".into())), ("x", num(10.0))],
            &[("k", Value::Text("A".into())), ("x", num(3.0))],
        ]);
        let grouped = run_one(input, Transform::GroupBy("k".into())).table;
        let result = run_one(
            grouped,
            Transform::Summarize(vec![(Aggregate::Sum, "x".into())]),
        );
        assert!(result.is_success());
        assert_eq!(result.table.len(), 2);
        let rows = result.table.rows();
        assert_eq!(rows[0].get(GROUP_COLUMN), Some(&num(0.0)));
        assert_eq!(rows[0].get("x_sum"), Some(&num(4.0)));
        assert_eq!(rows[1].get(GROUP_COLUMN), Some(&num(1.0)));
        assert_eq!(rows[1].get("x_sum"), Some(&num(10.0)));
    }

    #[test]
    fn test_summarize_empty_table_yields_empty_result() {
        let result = run_one(
            Table::new(),
            Transform::Summarize(vec![(Aggregate::Count, "x".into())]),
        );
        assert!(result.is_success());
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_notify_publishes_and_passes_through() {
        let input = table(&[&[("x", num(1.0))]]);
        let mut manager = PipelineManager::new();
        let pipeline = Pipeline::from_ops(vec![Transform::Notify("snapshot".into())]);
        let result = Runner::run(input.clone(), &pipeline, &mut manager);
        assert!(result.is_success());
        assert_eq!(result.table, input);
        assert_eq!(manager.lookup("snapshot").unwrap(), &input);
    }

    #[test]
    fn test_join_prefixes_non_key_columns() {
        let mut manager = PipelineManager::new();
        manager.register(
            "left",
            table(&[&[("k", num(1.0)), ("a", num(5.0))], &[("k", num(2.0)), ("a", num(6.0))]]),
        );
        manager.register(
            "right",
            table(&[&[("k", num(1.0)), ("b", num(7.0))]]),
        );
        let pipeline = Pipeline::from_ops(vec![Transform::Join {
            left_name: "left".into(),
            left_column: "k".into(),
            right_name: "right".into(),
            right_column: "k".into(),
        }]);
        let result = Runner::run(Table::new(), &pipeline, &mut manager);
        assert!(result.is_success());
        assert_eq!(result.table.len(), 1);
        let row = &result.table.rows()[0];
        assert_eq!(row.get(JOIN_COLUMN), Some(&num(1.0)));
        assert_eq!(row.get("left_a"), Some(&num(5.0)));
        assert_eq!(row.get("right_b"), Some(&num(7.0)));
        // Key columns are consumed into _join_.
        assert!(!row.contains("k"));
        assert!(!row.contains("left_k"));
    }

    #[test]
    fn test_join_missing_keys_never_match() {
        let mut manager = PipelineManager::new();
        manager.register("left", table(&[&[("k", Value::Missing)]]));
        manager.register("right", table(&[&[("k", Value::Missing)]]));
        let pipeline = Pipeline::from_ops(vec![Transform::Join {
            left_name: "left".into(),
            left_column: "k".into(),
            right_name: "right".into(),
            right_column: "k".into(),
        }]);
        let result = Runner::run(Table::new(), &pipeline, &mut manager);
        assert!(result.is_success());
        assert!(result.table.is_empty());
    }

    #[test]
    fn test_join_unregistered_name_fails() {
        let mut manager = PipelineManager::new();
        let pipeline = Pipeline::from_ops(vec![Transform::Join {
            left_name: "ghost".into(),
            left_column: "k".into(),
            right_name: "ghost".into(),
            right_column: "k".into(),
        }]);
        let result = Runner::run(Table::new(), &pipeline, &mut manager);
        assert!(!result.is_success());
        assert_eq!(result.error, "no table registered under name: ghost");
    }

    #[test]
    fn test_failed_run_keeps_earlier_notify() {
        let input = table(&[&[("x", num(1.0))]]);
        let mut manager = PipelineManager::new();
        let pipeline = Pipeline::from_ops(vec![
            Transform::Notify("partial".into()),
            Transform::Select(vec!["nope".into()]),
        ]);
        let result = Runner::run(input.clone(), &pipeline, &mut manager);
        assert!(!result.is_success());
        assert_eq!(manager.last_error(), result.error);
        // The registry entry written before the failure survives.
        assert_eq!(manager.lookup("partial").unwrap(), &input);
    }

    #[test]
    fn test_expression_type_error_aborts_run() {
        let input = table(&[&[("t", Value::Text("abc".into()))]]);
        let op = Transform::Mutate {
            column: "bad".into(),
            value: Expr::binary(BinaryOp::Add, Expr::column("t"), Expr::number(1.0)),
        };
        let result = run_one(input, op);
        assert!(!result.is_success());
        assert!(result.error.contains("type error"));
    }

    #[test]
    fn test_conversion_failure_is_not_an_error() {
        let input = table(&[&[("t", Value::Text("abc".into()))]]);
        let op = Transform::Mutate {
            column: "when".into(),
            value: Expr::unary(UnaryOp::ToDatetime, Expr::column("t")),
        };
        let result = run_one(input, op);
        assert!(result.is_success());
        assert_eq!(result.error, "");
        assert_eq!(result.table.rows()[0].get("when"), Some(&Value::Missing));
    }
}
