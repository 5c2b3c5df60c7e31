//! Scalar value type with explicit missing-value semantics
//!
//! Every cell in a table and every expression result is a `Value`.
//! `Missing` is a first-class sentinel, distinct from `null` and from
//! IEEE NaN: non-finite numeric results collapse to `Missing` before they
//! can be stored, so a `Number` at rest is always finite.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single scalar cell value.
///
/// Structural equality (`PartialEq`) treats `Missing == Missing`; it is used
/// for grouping, literals, and tests. The engine's comparison semantics go
/// through [`Value::strict_equals`] / [`Value::strict_cmp`], where `Missing`
/// never equals anything, itself included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    /// Absence of data. Never JSON `null`.
    Missing,
    /// A finite 64-bit float.
    Number(f64),
    /// UTF-8 text.
    Text(String),
    /// Boolean.
    Logical(bool),
    /// An instant in time (UTC).
    Datetime(DateTime<Utc>),
}

impl Value {
    /// Builds a `Number`, collapsing non-finite input to `Missing`.
    ///
    /// All arithmetic in the expression engine funnels through this so that
    /// overflow, division by zero, and domain errors degrade to `Missing`
    /// instead of propagating IEEE special values.
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Missing
        }
    }

    /// Returns true if this is the missing sentinel.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Truthiness used by `filter`, `not`, `and`/`or`, and `ifElse`.
    ///
    /// `Missing` is falsy; a number is truthy unless zero; text is truthy
    /// unless empty; a datetime is always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Missing => false,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Logical(b) => *b,
            Value::Datetime(_) => true,
        }
    }

    /// Returns the runtime type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Logical(_) => "logical",
            Value::Datetime(_) => "datetime",
        }
    }

    /// Strict equality: `None` if either side is missing, `Some(eq)` when
    /// both sides share a runtime type, `None` otherwise.
    ///
    /// Callers that must reject mixed-type comparison (the comparison
    /// operators) check type names separately; the join uses this directly
    /// so that mismatched key types simply do not match.
    pub fn strict_equals(&self, other: &Value) -> Option<bool> {
        self.strict_cmp(other).map(|ord| ord == Ordering::Equal)
    }

    /// Strict ordering between two values of the same runtime type.
    ///
    /// `None` when either side is missing or the types differ. Datetimes
    /// compare by instant; logicals order `false < true`.
    pub fn strict_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Logical(a), Value::Logical(b)) => Some(a.cmp(b)),
            (Value::Datetime(a), Value::Datetime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Rank used to keep sorts total when a column holds mixed types.
    ///
    /// Missing sorts below every concrete value.
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Logical(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
            Value::Datetime(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, ""),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Logical(b) => write!(f, "{}", b),
            Value::Datetime(d) => {
                write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_number_constructor_filters_non_finite() {
        assert_eq!(Value::number(1.5), Value::Number(1.5));
        assert_eq!(Value::number(f64::INFINITY), Value::Missing);
        assert_eq!(Value::number(f64::NEG_INFINITY), Value::Missing);
        assert_eq!(Value::number(f64::NAN), Value::Missing);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Missing.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-2.0).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
        assert!(!Value::Logical(false).is_truthy());
        assert!(Value::Logical(true).is_truthy());
        assert!(Value::Datetime(Utc.timestamp_opt(0, 0).unwrap()).is_truthy());
    }

    #[test]
    fn test_strict_equality_missing_never_matches() {
        assert_eq!(Value::Missing.strict_equals(&Value::Missing), None);
        assert_eq!(Value::Missing.strict_equals(&Value::Number(1.0)), None);
        assert_eq!(
            Value::Number(1.0).strict_equals(&Value::Number(1.0)),
            Some(true)
        );
    }

    #[test]
    fn test_strict_cmp_rejects_mixed_types() {
        assert_eq!(Value::Number(1.0).strict_cmp(&Value::Text("1".into())), None);
        assert_eq!(
            Value::Logical(false).strict_cmp(&Value::Logical(true)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_datetime_compares_by_instant() {
        let a = Value::Datetime(Utc.timestamp_opt(100, 0).unwrap());
        let b = Value::Datetime(Utc.timestamp_opt(200, 0).unwrap());
        assert_eq!(a.strict_cmp(&b), Some(Ordering::Less));
        assert_eq!(a.strict_equals(&a.clone()), Some(true));
    }

    #[test]
    fn test_serde_missing_is_tagged_not_null() {
        let json = serde_json::to_value(Value::Missing).unwrap();
        assert_eq!(json, serde_json::json!({"type": "missing"}));
        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::Missing);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Missing.type_name(), "missing");
        assert_eq!(Value::Number(0.0).type_name(), "number");
        assert_eq!(Value::Text(String::new()).type_name(), "text");
        assert_eq!(Value::Logical(true).type_name(), "logical");
    }
}
