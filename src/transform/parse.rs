//! Operation-array pipeline format
//!
//! The block editor emits a pipeline as a JSON array of operation arrays,
//! each `[MARKER, name, ...operands]` with `MARKER = "@transform"`.
//! Expression operands are nested `"@expr"` arrays. The decode/encode
//! pair round-trips losslessly.
//!
//! Shapes:
//! ```text
//! ["@transform", "filter", expr]
//! ["@transform", "mutate", column, expr]
//! ["@transform", "select", [columns...]]
//! ["@transform", "sort", [columns...], descending]
//! ["@transform", "groupBy", column]
//! ["@transform", "ungroup"]
//! ["@transform", "summarize", [aggregate, column]...]
//! ["@transform", "join", leftName, leftColumn, rightName, rightColumn]
//! ["@transform", "notify", name]
//! ```

use serde_json::{json, Value as Json};

use crate::expr::Expr;

use super::aggregate::Aggregate;
use super::errors::{TransformError, TransformResult};
use super::op::{Pipeline, Transform};

/// Fixed first element marking "this array encodes a transform".
pub const TRANSFORM_MARKER: &str = "@transform";

impl Transform {
    /// Serializes this operation to its array form.
    pub fn to_json(&self) -> Json {
        match self {
            Transform::Filter(expr) => json!([TRANSFORM_MARKER, "filter", expr.to_json()]),
            Transform::Mutate { column, value } => {
                json!([TRANSFORM_MARKER, "mutate", column, value.to_json()])
            }
            Transform::Select(columns) => json!([TRANSFORM_MARKER, "select", columns]),
            Transform::Sort {
                columns,
                descending,
            } => json!([TRANSFORM_MARKER, "sort", columns, descending]),
            Transform::GroupBy(column) => json!([TRANSFORM_MARKER, "groupBy", column]),
            Transform::Ungroup => json!([TRANSFORM_MARKER, "ungroup"]),
            Transform::Summarize(pairs) => {
                let mut items = vec![json!(TRANSFORM_MARKER), json!("summarize")];
                for (agg, column) in pairs {
                    items.push(json!([agg.name(), column]));
                }
                Json::Array(items)
            }
            Transform::Join {
                left_name,
                left_column,
                right_name,
                right_column,
            } => json!([
                TRANSFORM_MARKER,
                "join",
                left_name,
                left_column,
                right_name,
                right_column
            ]),
            Transform::Notify(name) => json!([TRANSFORM_MARKER, "notify", name]),
        }
    }

    /// Reconstructs an operation from its array form.
    pub fn from_json(json: &Json) -> TransformResult<Self> {
        let items = json
            .as_array()
            .ok_or_else(|| malformed("operation must be an array", json))?;
        let marker = items.first().and_then(Json::as_str);
        if marker != Some(TRANSFORM_MARKER) {
            return Err(malformed(
                "operation array must start with \"@transform\"",
                json,
            ));
        }
        let name = items
            .get(1)
            .and_then(Json::as_str)
            .ok_or_else(|| malformed("operation name must be a string", json))?;
        let args = &items[2..];

        match name {
            "filter" => Ok(Transform::Filter(expr_arg(name, args, 0)?)),
            "mutate" => Ok(Transform::Mutate {
                column: text_arg(name, args, 0)?,
                value: expr_arg(name, args, 1)?,
            }),
            "select" => Ok(Transform::Select(columns_arg(name, args, 0)?)),
            "sort" => {
                let columns = columns_arg(name, args, 0)?;
                let descending = args
                    .get(1)
                    .and_then(Json::as_bool)
                    .ok_or_else(|| arity(name, "a boolean direction flag"))?;
                Ok(Transform::Sort {
                    columns,
                    descending,
                })
            }
            "groupBy" => Ok(Transform::GroupBy(text_arg(name, args, 0)?)),
            "ungroup" => Ok(Transform::Ungroup),
            "summarize" => {
                let mut pairs = Vec::with_capacity(args.len());
                for item in args {
                    pairs.push(summarize_pair(item)?);
                }
                Ok(Transform::Summarize(pairs))
            }
            "join" => Ok(Transform::Join {
                left_name: text_arg(name, args, 0)?,
                left_column: text_arg(name, args, 1)?,
                right_name: text_arg(name, args, 2)?,
                right_column: text_arg(name, args, 3)?,
            }),
            "notify" => Ok(Transform::Notify(text_arg(name, args, 0)?)),
            other => Err(TransformError::MalformedTransform(format!(
                "unknown operation: {other:?}"
            ))),
        }
    }
}

impl Pipeline {
    /// Serializes the pipeline to an array of operation arrays.
    pub fn to_json(&self) -> Json {
        Json::Array(self.ops().iter().map(Transform::to_json).collect())
    }

    /// Reconstructs a pipeline from an array of operation arrays.
    pub fn from_json(json: &Json) -> TransformResult<Self> {
        let items = json
            .as_array()
            .ok_or_else(|| malformed("pipeline must be an array of operations", json))?;
        let ops = items
            .iter()
            .map(Transform::from_json)
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Pipeline::from_ops(ops))
    }
}

fn summarize_pair(item: &Json) -> TransformResult<(Aggregate, String)> {
    let pair = item
        .as_array()
        .ok_or_else(|| malformed("summarize operand must be [aggregate, column]", item))?;
    let (name, column) = match (
        pair.first().and_then(Json::as_str),
        pair.get(1).and_then(Json::as_str),
    ) {
        (Some(name), Some(column)) if pair.len() == 2 => (name, column),
        _ => {
            return Err(malformed(
                "summarize operand must be [aggregate, column]",
                item,
            ))
        }
    };
    let agg = Aggregate::from_name(name).ok_or_else(|| {
        TransformError::MalformedTransform(format!("unknown aggregate: {name:?}"))
    })?;
    Ok((agg, column.to_string()))
}

fn malformed(reason: &str, json: &Json) -> TransformError {
    TransformError::MalformedTransform(format!("{reason}: {json}"))
}

fn arity(name: &str, expected: &str) -> TransformError {
    TransformError::MalformedTransform(format!("{name} expects {expected}"))
}

fn text_arg(name: &str, args: &[Json], index: usize) -> TransformResult<String> {
    args.get(index)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| arity(name, "a string operand"))
}

fn expr_arg(name: &str, args: &[Json], index: usize) -> TransformResult<Expr> {
    match args.get(index) {
        Some(value) => Ok(Expr::from_json(value)?),
        None => Err(arity(name, "an expression operand")),
    }
}

fn columns_arg(name: &str, args: &[Json], index: usize) -> TransformResult<Vec<String>> {
    let list = args
        .get(index)
        .and_then(Json::as_array)
        .ok_or_else(|| arity(name, "a column-name list"))?;
    list.iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| arity(name, "a column-name list"))
        })
        .collect()
}
