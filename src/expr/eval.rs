//! Row-wise expression evaluation
//!
//! `Expr::evaluate` is total over the grammar for well-typed input and
//! never panics; ill-typed input returns an `ExprError` that the pipeline
//! engine turns into a run abort.
//!
//! Missing-value rules:
//! - arithmetic, comparison, conversion, and datetime extraction return
//!   `Missing` when any operand is missing;
//! - `and`/`or` short-circuit on truthiness and return whichever operand
//!   value decided the result (no boolean coercion);
//! - `isMissing` is the one predicate that always returns a definite
//!   logical.
//!
//! Every arithmetic result passes through `Value::number`, so division by
//! zero and overflow degrade to `Missing` instead of surfacing IEEE
//! specials.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use rand::Rng;

use crate::value::{Row, Value};

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::errors::{ExprError, ExprResult};

impl Expr {
    /// Evaluates this expression against one row.
    ///
    /// `row_index` is the 0-based position of the row in the table at the
    /// time of the enclosing operation; `rownum` exposes it 1-based.
    pub fn evaluate(&self, row: &Row, row_index: usize) -> ExprResult<Value> {
        match self {
            Expr::Column(name) => row
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnknownColumn(name.clone())),
            Expr::Number(n) => Ok(Value::number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Logical(b) => Ok(Value::Logical(*b)),
            Expr::Datetime(d) => Ok(Value::Datetime(*d)),
            Expr::RowNum => Ok(Value::number(row_index as f64 + 1.0)),
            Expr::Exponential(rate) => Ok(sample_exponential(*rate)),
            Expr::Normal(mean, std_dev) => Ok(sample_normal(*mean, *std_dev)),
            Expr::Uniform(low, high) => Ok(sample_uniform(*low, *high)),
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(row, row_index)?;
                eval_unary(*op, value)
            }
            Expr::Binary(op, left, right) => eval_binary(*op, left, right, row, row_index),
            Expr::IfElse(cond, then, otherwise) => {
                match cond.evaluate(row, row_index)? {
                    Value::Missing => Ok(Value::Missing),
                    c if c.is_truthy() => then.evaluate(row, row_index),
                    _ => otherwise.evaluate(row, row_index),
                }
            }
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> ExprResult<Value> {
    // isMissing is total; everything else propagates missing.
    if let UnaryOp::IsMissing = op {
        return Ok(Value::Logical(value.is_missing()));
    }
    if value.is_missing() {
        return Ok(Value::Missing);
    }

    match op {
        UnaryOp::Negate => match value {
            Value::Number(n) => Ok(Value::number(-n)),
            other => Err(ExprError::TypeError(format!(
                "negate expects a number, got {}",
                other.type_name()
            ))),
        },
        UnaryOp::Not => Ok(Value::Logical(!value.is_truthy())),
        UnaryOp::IsNumber => Ok(Value::Logical(matches!(value, Value::Number(_)))),
        UnaryOp::IsText => Ok(Value::Logical(matches!(value, Value::Text(_)))),
        UnaryOp::IsLogical => Ok(Value::Logical(matches!(value, Value::Logical(_)))),
        UnaryOp::IsDatetime => Ok(Value::Logical(matches!(value, Value::Datetime(_)))),
        UnaryOp::IsMissing => unreachable!("handled above"),
        UnaryOp::ToNumber => Ok(to_number(value)),
        UnaryOp::ToText => Ok(Value::Text(value.to_string())),
        UnaryOp::ToLogical => Ok(Value::Logical(value.is_truthy())),
        UnaryOp::ToDatetime => Ok(to_datetime(value)),
        UnaryOp::ToYear
        | UnaryOp::ToMonth
        | UnaryOp::ToDay
        | UnaryOp::ToWeekday
        | UnaryOp::ToHours
        | UnaryOp::ToMinutes
        | UnaryOp::ToSeconds => extract_datetime_field(op, value),
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    row: &Row,
    row_index: usize,
) -> ExprResult<Value> {
    // Short-circuit logicals return operand values untouched; callers rely
    // on the truthy-passthrough semantics.
    match op {
        BinaryOp::And => {
            let l = left.evaluate(row, row_index)?;
            if !l.is_truthy() {
                return Ok(l);
            }
            return right.evaluate(row, row_index);
        }
        BinaryOp::Or => {
            let l = left.evaluate(row, row_index)?;
            if l.is_truthy() {
                return Ok(l);
            }
            return right.evaluate(row, row_index);
        }
        _ => {}
    }

    let l = left.evaluate(row, row_index)?;
    let r = right.evaluate(row, row_index)?;
    if l.is_missing() || r.is_missing() {
        return Ok(Value::Missing);
    }

    if op.is_arithmetic() {
        let (a, b) = match (&l, &r) {
            (Value::Number(a), Value::Number(b)) => (*a, *b),
            _ => {
                return Err(ExprError::TypeError(format!(
                    "{} expects numbers, got {} and {}",
                    op.name(),
                    l.type_name(),
                    r.type_name()
                )))
            }
        };
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::Remainder => a % b,
            BinaryOp::Power => a.powf(b),
            _ => unreachable!("arithmetic op"),
        };
        return Ok(Value::number(result));
    }

    // Comparison: both operands must share a runtime type.
    let ordering = l.strict_cmp(&r).ok_or(ExprError::TypeMismatch {
        left: l.type_name(),
        right: r.type_name(),
    })?;
    let outcome = match op {
        BinaryOp::Equal => ordering.is_eq(),
        BinaryOp::NotEqual => !ordering.is_eq(),
        BinaryOp::Greater => ordering.is_gt(),
        BinaryOp::GreaterEqual => ordering.is_ge(),
        BinaryOp::Less => ordering.is_lt(),
        BinaryOp::LessEqual => ordering.is_le(),
        _ => unreachable!("comparison op"),
    };
    Ok(Value::Logical(outcome))
}

fn to_number(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::number(n),
        Value::Logical(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        Value::Datetime(d) => Value::number(d.timestamp_millis() as f64),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => Value::number(n),
            Err(_) => Value::Missing,
        },
        Value::Missing => Value::Missing,
    }
}

fn to_datetime(value: Value) -> Value {
    match value {
        Value::Datetime(d) => Value::Datetime(d),
        Value::Text(s) => match parse_datetime_text(&s) {
            Some(d) => Value::Datetime(d),
            None => Value::Missing,
        },
        Value::Number(n) => match Utc.timestamp_millis_opt(n as i64).single() {
            Some(d) => Value::Datetime(d),
            None => Value::Missing,
        },
        // No sensible instant for a bare logical.
        Value::Logical(_) | Value::Missing => Value::Missing,
    }
}

/// Parses datetime text: RFC 3339 first, then a few common layouts.
/// Naive layouts are read as UTC. Unparsable text is `None`, not an error.
fn parse_datetime_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Field extraction requires an existing datetime; this is a type check,
/// not a conversion.
fn extract_datetime_field(op: UnaryOp, value: Value) -> ExprResult<Value> {
    let d = match value {
        Value::Datetime(d) => d,
        other => {
            return Err(ExprError::TypeError(format!(
                "{} expects a datetime, got {}",
                op.name(),
                other.type_name()
            )))
        }
    };
    let n = match op {
        UnaryOp::ToYear => f64::from(d.year()),
        UnaryOp::ToMonth => f64::from(d.month()),
        UnaryOp::ToDay => f64::from(d.day()),
        // ISO numbering: 1=Monday .. 7=Sunday.
        UnaryOp::ToWeekday => f64::from(d.weekday().number_from_monday()),
        UnaryOp::ToHours => f64::from(d.hour()),
        UnaryOp::ToMinutes => f64::from(d.minute()),
        UnaryOp::ToSeconds => f64::from(d.second()),
        _ => unreachable!("datetime field op"),
    };
    Ok(Value::number(n))
}

// Random variates draw from process-level randomness: a fresh sample per
// evaluation call, never cached or reused across rows.

fn sample_uniform(low: f64, high: f64) -> Value {
    if !(low.is_finite() && high.is_finite()) || low >= high {
        return Value::Missing;
    }
    Value::number(rand::thread_rng().gen_range(low..high))
}

fn sample_normal(mean: f64, std_dev: f64) -> Value {
    if !(mean.is_finite() && std_dev.is_finite()) || std_dev < 0.0 {
        return Value::Missing;
    }
    // Box-Muller transform.
    let mut rng = rand::thread_rng();
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    Value::number(mean + std_dev * z)
}

fn sample_exponential(rate: f64) -> Value {
    if !rate.is_finite() || rate <= 0.0 {
        return Value::Missing;
    }
    // Inverse CDF.
    let u: f64 = rand::thread_rng().gen_range(f64::MIN_POSITIVE..1.0);
    Value::number(-u.ln() / rate)
}
