//! Expression serialization
//!
//! Wire format: a nested JSON array `[MARKER, kind, ...children]` where
//! `MARKER` is the fixed `"@expr"` tag, `kind` is the variant's wire name,
//! and children are either nested expression arrays or literal scalars.
//! Datetime literals travel as canonical RFC 3339 text at full precision,
//! down to nanoseconds when present. The round trip is lossless:
//! `to_json(from_json(x)) == x` for canonical input, and the
//! reconstructed tree evaluates identically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value as Json};

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::errors::{ExprError, ExprResult};

/// Fixed first element marking "this array encodes an expression".
pub const EXPR_MARKER: &str = "@expr";

impl Expr {
    /// Serializes this expression to the array-of-arrays form.
    pub fn to_json(&self) -> Json {
        match self {
            Expr::Column(name) => json!([EXPR_MARKER, "column", name]),
            Expr::Number(n) => json!([EXPR_MARKER, "number", n]),
            Expr::Text(s) => json!([EXPR_MARKER, "text", s]),
            Expr::Logical(b) => json!([EXPR_MARKER, "logical", b]),
            Expr::Datetime(d) => {
                json!([EXPR_MARKER, "datetime", format_datetime(d)])
            }
            Expr::RowNum => json!([EXPR_MARKER, "rownum"]),
            Expr::Exponential(rate) => json!([EXPR_MARKER, "exponential", rate]),
            Expr::Normal(mean, std_dev) => json!([EXPR_MARKER, "normal", mean, std_dev]),
            Expr::Uniform(low, high) => json!([EXPR_MARKER, "uniform", low, high]),
            Expr::Unary(op, a) => json!([EXPR_MARKER, op.name(), a.to_json()]),
            Expr::Binary(op, a, b) => {
                json!([EXPR_MARKER, op.name(), a.to_json(), b.to_json()])
            }
            Expr::IfElse(c, t, e) => {
                json!([EXPR_MARKER, "ifElse", c.to_json(), t.to_json(), e.to_json()])
            }
        }
    }

    /// Reconstructs an expression from the array-of-arrays form.
    pub fn from_json(json: &Json) -> ExprResult<Self> {
        let items = json
            .as_array()
            .ok_or_else(|| malformed("expression must be an array", json))?;
        let marker = items.first().and_then(Json::as_str);
        if marker != Some(EXPR_MARKER) {
            return Err(malformed("expression array must start with \"@expr\"", json));
        }
        let kind = items
            .get(1)
            .and_then(Json::as_str)
            .ok_or_else(|| malformed("expression kind must be a string", json))?;
        let args = &items[2..];

        match kind {
            "column" => Ok(Expr::Column(text_arg(kind, args, 0)?)),
            "number" => Ok(Expr::Number(number_arg(kind, args, 0)?)),
            "text" => Ok(Expr::Text(text_arg(kind, args, 0)?)),
            "logical" => match args.first().and_then(Json::as_bool) {
                Some(b) => Ok(Expr::Logical(b)),
                None => Err(arity(kind, "a boolean literal")),
            },
            "datetime" => {
                let raw = text_arg(kind, args, 0)?;
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| {
                    ExprError::MalformedExpression(format!(
                        "datetime literal is not RFC 3339: {raw:?}"
                    ))
                })?;
                Ok(Expr::Datetime(parsed.with_timezone(&Utc)))
            }
            "rownum" => Ok(Expr::RowNum),
            "exponential" => Ok(Expr::Exponential(number_arg(kind, args, 0)?)),
            "normal" => Ok(Expr::Normal(
                number_arg(kind, args, 0)?,
                number_arg(kind, args, 1)?,
            )),
            "uniform" => Ok(Expr::Uniform(
                number_arg(kind, args, 0)?,
                number_arg(kind, args, 1)?,
            )),
            "ifElse" => Ok(Expr::if_else(
                child(kind, args, 0)?,
                child(kind, args, 1)?,
                child(kind, args, 2)?,
            )),
            other => {
                if let Some(op) = UnaryOp::from_name(other) {
                    return Ok(Expr::unary(op, child(other, args, 0)?));
                }
                if let Some(op) = BinaryOp::from_name(other) {
                    return Ok(Expr::binary(op, child(other, args, 0)?, child(other, args, 1)?));
                }
                Err(ExprError::MalformedExpression(format!(
                    "unknown expression kind: {other:?}"
                )))
            }
        }
    }
}

/// Canonical datetime text for the wire format. `AutoSi` keeps the full
/// stored precision (milli/micro/nanoseconds as needed), so no instant is
/// truncated on the way out.
pub(crate) fn format_datetime(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn malformed(reason: &str, json: &Json) -> ExprError {
    ExprError::MalformedExpression(format!("{reason}: {json}"))
}

fn arity(kind: &str, expected: &str) -> ExprError {
    ExprError::MalformedExpression(format!("{kind} expects {expected}"))
}

fn child(kind: &str, args: &[Json], index: usize) -> ExprResult<Expr> {
    match args.get(index) {
        Some(value) => Expr::from_json(value),
        None => Err(arity(kind, "a child expression")),
    }
}

fn text_arg(kind: &str, args: &[Json], index: usize) -> ExprResult<String> {
    args.get(index)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| arity(kind, "a text literal"))
}

fn number_arg(kind: &str, args: &[Json], index: usize) -> ExprResult<f64> {
    args.get(index)
        .and_then(Json::as_f64)
        .ok_or_else(|| arity(kind, "a numeric literal"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn round_trip(expr: Expr) {
        let json = expr.to_json();
        let back = Expr::from_json(&json).unwrap();
        assert_eq!(back, expr);
        assert_eq!(back.to_json(), json);
    }

    #[test]
    fn test_leaf_round_trips() {
        round_trip(Expr::column("red"));
        round_trip(Expr::number(3.25));
        round_trip(Expr::text("hello"));
        round_trip(Expr::logical(true));
        round_trip(Expr::RowNum);
        round_trip(Expr::Datetime(
            Utc.with_ymd_and_hms(2020, 3, 1, 13, 45, 50).unwrap(),
        ));
    }

    #[test]
    fn test_datetime_keeps_subsecond_precision() {
        // Nanosecond-precision input must survive a decode/encode cycle
        // byte for byte.
        let json = json!(["@expr", "datetime", "2020-01-01T00:00:00.123456789Z"]);
        let expr = Expr::from_json(&json).unwrap();
        assert_eq!(expr.to_json(), json);

        let micros = json!(["@expr", "datetime", "2020-01-01T00:00:00.123456Z"]);
        assert_eq!(Expr::from_json(&micros).unwrap().to_json(), micros);
    }

    #[test]
    fn test_generator_round_trips() {
        round_trip(Expr::Exponential(0.5));
        round_trip(Expr::Normal(0.0, 1.0));
        round_trip(Expr::Uniform(-1.0, 1.0));
    }

    #[test]
    fn test_nested_round_trip() {
        round_trip(Expr::if_else(
            Expr::binary(
                BinaryOp::And,
                Expr::unary(UnaryOp::IsNumber, Expr::column("x")),
                Expr::binary(BinaryOp::Greater, Expr::column("x"), Expr::number(0.0)),
            ),
            Expr::unary(UnaryOp::ToText, Expr::column("x")),
            Expr::text("none"),
        ));
    }

    #[test]
    fn test_wire_shape() {
        let expr = Expr::binary(BinaryOp::Add, Expr::column("x"), Expr::number(1.0));
        assert_eq!(
            expr.to_json(),
            json!(["@expr", "add", ["@expr", "column", "x"], ["@expr", "number", 1.0]])
        );
    }

    #[test]
    fn test_rejects_missing_marker() {
        let err = Expr::from_json(&json!(["add", 1, 2])).unwrap_err();
        assert!(matches!(err, ExprError::MalformedExpression(_)));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let err = Expr::from_json(&json!(["@expr", "frobnicate"])).unwrap_err();
        assert!(err.to_string().contains("unknown expression kind"));
    }

    #[test]
    fn test_rejects_non_expression_child() {
        let err = Expr::from_json(&json!(["@expr", "not", 17])).unwrap_err();
        assert!(matches!(err, ExprError::MalformedExpression(_)));
    }

    #[test]
    fn test_rejects_bad_datetime_literal() {
        let err = Expr::from_json(&json!(["@expr", "datetime", "not-a-date"])).unwrap_err();
        assert!(err.to_string().contains("RFC 3339"));
    }

    #[test]
    fn test_rejects_missing_arity() {
        assert!(Expr::from_json(&json!(["@expr", "normal", 1.0])).is_err());
        assert!(Expr::from_json(&json!(["@expr", "ifElse", ["@expr", "logical", true]])).is_err());
    }
}
