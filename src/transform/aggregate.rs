//! Summarize aggregate functions
//!
//! `count` counts every row, missing cells included. All other
//! aggregates skip missing cells and yield `Missing` when no values
//! remain. Statistical aggregates use the sample (n-1) formulas.

use crate::expr::ExprError;
use crate::value::Value;

use super::errors::{TransformError, TransformResult};

/// An aggregate function applied per group by `summarize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Row count, missing cells included
    Count,
    /// Sum of present numeric values
    Sum,
    /// Arithmetic mean
    Mean,
    /// Median (midpoint average for even counts)
    Median,
    /// Minimum of present values of one comparable type
    Min,
    /// Maximum of present values of one comparable type
    Max,
    /// Sample variance (n-1 denominator)
    Variance,
    /// Sample standard deviation
    StdDev,
}

impl Aggregate {
    /// The wire name; also the suffix of the emitted result column.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Variance => "variance",
            Aggregate::StdDev => "stdDev",
        }
    }

    /// Parses a wire name back into the aggregate.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "count" => Aggregate::Count,
            "sum" => Aggregate::Sum,
            "mean" => Aggregate::Mean,
            "median" => Aggregate::Median,
            "min" => Aggregate::Min,
            "max" => Aggregate::Max,
            "variance" => Aggregate::Variance,
            "stdDev" => Aggregate::StdDev,
            _ => return None,
        })
    }

    /// Applies the aggregate to one group's column values.
    pub fn apply(&self, values: &[Value]) -> TransformResult<Value> {
        if let Aggregate::Count = self {
            return Ok(Value::number(values.len() as f64));
        }

        let present: Vec<&Value> = values.iter().filter(|v| !v.is_missing()).collect();
        if present.is_empty() {
            return Ok(Value::Missing);
        }

        match self {
            Aggregate::Min | Aggregate::Max => self.extremum(&present),
            _ => {
                let numbers = numeric(self.name(), &present)?;
                Ok(match self {
                    Aggregate::Sum => Value::number(numbers.iter().sum()),
                    Aggregate::Mean => Value::number(mean(&numbers)),
                    Aggregate::Median => Value::number(median(numbers)),
                    Aggregate::Variance => variance(&numbers),
                    Aggregate::StdDev => match variance(&numbers) {
                        Value::Number(v) => Value::number(v.sqrt()),
                        other => other,
                    },
                    _ => unreachable!("numeric aggregate"),
                })
            }
        }
    }

    /// Min/max over any single strictly comparable type.
    fn extremum(&self, present: &[&Value]) -> TransformResult<Value> {
        let mut best = present[0];
        for value in &present[1..] {
            let ordering = value.strict_cmp(best).ok_or(ExprError::TypeMismatch {
                left: value.type_name(),
                right: best.type_name(),
            })?;
            let replace = match self {
                Aggregate::Min => ordering.is_lt(),
                Aggregate::Max => ordering.is_gt(),
                _ => unreachable!("extremum aggregate"),
            };
            if replace {
                best = value;
            }
        }
        Ok(best.clone())
    }
}

fn numeric(agg: &str, present: &[&Value]) -> TransformResult<Vec<f64>> {
    present
        .iter()
        .map(|value| match value {
            Value::Number(n) => Ok(*n),
            other => Err(TransformError::Expr(ExprError::TypeError(format!(
                "{} requires numbers, got {}",
                agg,
                other.type_name()
            )))),
        })
        .collect()
}

fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

fn median(mut numbers: Vec<f64>) -> f64 {
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 1 {
        numbers[mid]
    } else {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    }
}

/// Sample variance; `Missing` for a single observation (n-1 would be 0).
fn variance(numbers: &[f64]) -> Value {
    if numbers.len() < 2 {
        return Value::Missing;
    }
    let m = mean(numbers);
    let sum_sq: f64 = numbers.iter().map(|n| (n - m) * (n - m)).sum();
    Value::number(sum_sq / (numbers.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|n| Value::Number(*n)).collect()
    }

    fn expect_number(value: Value) -> f64 {
        match value {
            Value::Number(n) => n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_names_round_trip() {
        for agg in [
            Aggregate::Count,
            Aggregate::Sum,
            Aggregate::Mean,
            Aggregate::Median,
            Aggregate::Min,
            Aggregate::Max,
            Aggregate::Variance,
            Aggregate::StdDev,
        ] {
            assert_eq!(Aggregate::from_name(agg.name()), Some(agg));
        }
        assert_eq!(Aggregate::from_name("mode"), None);
    }

    #[test]
    fn test_count_includes_missing() {
        let values = vec![Value::Number(1.0), Value::Missing, Value::Number(2.0)];
        assert_eq!(Aggregate::Count.apply(&values).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn test_sum_and_mean_skip_missing() {
        let values = vec![Value::Number(1.0), Value::Missing, Value::Number(3.0)];
        assert_eq!(Aggregate::Sum.apply(&values).unwrap(), Value::Number(4.0));
        assert_eq!(Aggregate::Mean.apply(&values).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_all_missing_yields_missing() {
        let values = vec![Value::Missing, Value::Missing];
        for agg in [Aggregate::Sum, Aggregate::Mean, Aggregate::Min, Aggregate::Variance] {
            assert_eq!(agg.apply(&values).unwrap(), Value::Missing);
        }
        assert_eq!(Aggregate::Count.apply(&values).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(
            expect_number(Aggregate::Median.apply(&nums(&[5.0, 1.0, 3.0])).unwrap()),
            3.0
        );
        assert_eq!(
            expect_number(Aggregate::Median.apply(&nums(&[4.0, 1.0, 3.0, 2.0])).unwrap()),
            2.5
        );
    }

    #[test]
    fn test_min_max_numbers() {
        let values = nums(&[3.0, -1.0, 7.0]);
        assert_eq!(Aggregate::Min.apply(&values).unwrap(), Value::Number(-1.0));
        assert_eq!(Aggregate::Max.apply(&values).unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_min_max_text() {
        let values = vec![Value::Text("pear".into()), Value::Text("apple".into())];
        assert_eq!(Aggregate::Min.apply(&values).unwrap(), Value::Text("apple".into()));
        assert_eq!(Aggregate::Max.apply(&values).unwrap(), Value::Text("pear".into()));
    }

    #[test]
    fn test_min_rejects_mixed_types() {
        let values = vec![Value::Number(1.0), Value::Text("x".into())];
        assert!(Aggregate::Min.apply(&values).is_err());
    }

    #[test]
    fn test_sum_rejects_text() {
        let values = vec![Value::Text("x".into())];
        assert!(Aggregate::Sum.apply(&values).is_err());
    }

    #[test]
    fn test_sample_variance_and_std_dev() {
        // Sample variance of {2, 4, 4, 4, 5, 5, 7, 9} is 32/7.
        let values = nums(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let var = expect_number(Aggregate::Variance.apply(&values).unwrap());
        assert!((var - 32.0 / 7.0).abs() < 1e-12);

        let std = expect_number(Aggregate::StdDev.apply(&values).unwrap());
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_variance_of_single_value_is_missing() {
        assert_eq!(Aggregate::Variance.apply(&nums(&[5.0])).unwrap(), Value::Missing);
        assert_eq!(Aggregate::StdDev.apply(&nums(&[5.0])).unwrap(), Value::Missing);
    }
}
