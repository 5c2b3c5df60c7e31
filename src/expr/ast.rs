//! Expression AST
//!
//! A single tagged union over every node kind, instead of a class
//! hierarchy: leaves carry their literal, unary/binary/ternary nodes box
//! their children exclusively (a tree, no sharing). Structural equality is
//! derived; dispatch happens by pattern matching in `evaluate`, the
//! serializer, and nowhere else.

use chrono::{DateTime, Utc};

/// Unary operators: negation, logical not, type predicates, type
/// conversions, and datetime field extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (numbers only)
    Negate,
    /// Logical negation via truthiness
    Not,
    /// True if the operand is a number
    IsNumber,
    /// True if the operand is text
    IsText,
    /// True if the operand is a logical
    IsLogical,
    /// True if the operand is a datetime
    IsDatetime,
    /// True if the operand is the missing sentinel; the only predicate
    /// that sees `Missing` as information instead of propagating it
    IsMissing,
    /// Convert to number (logical→0/1, datetime→epoch ms, text→parse)
    ToNumber,
    /// Convert to text
    ToText,
    /// Convert to logical via truthiness
    ToLogical,
    /// Convert to datetime (text/number parse; failure yields missing)
    ToDatetime,
    /// Calendar year of a datetime
    ToYear,
    /// Month of a datetime, 1-12
    ToMonth,
    /// Day of month of a datetime
    ToDay,
    /// ISO weekday of a datetime, 1=Monday through 7=Sunday
    ToWeekday,
    /// Hour of a datetime, 0-23
    ToHours,
    /// Minute of a datetime, 0-59
    ToMinutes,
    /// Second of a datetime, 0-59
    ToSeconds,
}

impl UnaryOp {
    /// The wire name used in serialized expressions.
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "negate",
            UnaryOp::Not => "not",
            UnaryOp::IsNumber => "isNumber",
            UnaryOp::IsText => "isText",
            UnaryOp::IsLogical => "isLogical",
            UnaryOp::IsDatetime => "isDatetime",
            UnaryOp::IsMissing => "isMissing",
            UnaryOp::ToNumber => "toNumber",
            UnaryOp::ToText => "toText",
            UnaryOp::ToLogical => "toLogical",
            UnaryOp::ToDatetime => "toDatetime",
            UnaryOp::ToYear => "toYear",
            UnaryOp::ToMonth => "toMonth",
            UnaryOp::ToDay => "toDay",
            UnaryOp::ToWeekday => "toWeekday",
            UnaryOp::ToHours => "toHours",
            UnaryOp::ToMinutes => "toMinutes",
            UnaryOp::ToSeconds => "toSeconds",
        }
    }

    /// Parses a wire name back into the operator.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "negate" => UnaryOp::Negate,
            "not" => UnaryOp::Not,
            "isNumber" => UnaryOp::IsNumber,
            "isText" => UnaryOp::IsText,
            "isLogical" => UnaryOp::IsLogical,
            "isDatetime" => UnaryOp::IsDatetime,
            "isMissing" => UnaryOp::IsMissing,
            "toNumber" => UnaryOp::ToNumber,
            "toText" => UnaryOp::ToText,
            "toLogical" => UnaryOp::ToLogical,
            "toDatetime" => UnaryOp::ToDatetime,
            "toYear" => UnaryOp::ToYear,
            "toMonth" => UnaryOp::ToMonth,
            "toDay" => UnaryOp::ToDay,
            "toWeekday" => UnaryOp::ToWeekday,
            "toHours" => UnaryOp::ToHours,
            "toMinutes" => UnaryOp::ToMinutes,
            "toSeconds" => UnaryOp::ToSeconds,
            _ => return None,
        })
    }
}

/// Binary operators: arithmetic, comparison, short-circuit logical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    /// Short-circuit; returns an operand value, not necessarily a logical
    And,
    /// Short-circuit; returns an operand value, not necessarily a logical
    Or,
}

impl BinaryOp {
    /// The wire name used in serialized expressions.
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Remainder => "remainder",
            BinaryOp::Power => "power",
            BinaryOp::Equal => "equal",
            BinaryOp::NotEqual => "notEqual",
            BinaryOp::Greater => "greater",
            BinaryOp::GreaterEqual => "greaterEqual",
            BinaryOp::Less => "less",
            BinaryOp::LessEqual => "lessEqual",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// Parses a wire name back into the operator.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "add" => BinaryOp::Add,
            "subtract" => BinaryOp::Subtract,
            "multiply" => BinaryOp::Multiply,
            "divide" => BinaryOp::Divide,
            "remainder" => BinaryOp::Remainder,
            "power" => BinaryOp::Power,
            "equal" => BinaryOp::Equal,
            "notEqual" => BinaryOp::NotEqual,
            "greater" => BinaryOp::Greater,
            "greaterEqual" => BinaryOp::GreaterEqual,
            "less" => BinaryOp::Less,
            "lessEqual" => BinaryOp::LessEqual,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Returns true for the six arithmetic operators.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Remainder
                | BinaryOp::Power
        )
    }

    /// Returns true for the six comparison operators.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
        )
    }
}

/// A scalar expression, evaluated once per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a column of the current row
    Column(String),
    /// Number literal
    Number(f64),
    /// Text literal
    Text(String),
    /// Logical literal
    Logical(bool),
    /// Datetime literal
    Datetime(DateTime<Utc>),
    /// The current 1-based row number
    RowNum,
    /// Exponential variate with the given rate; fresh sample per call
    Exponential(f64),
    /// Normal variate with mean and standard deviation
    Normal(f64, f64),
    /// Uniform variate in `[low, high)`. The interval must be non-empty
    /// with finite bounds; `low >= high` evaluates to missing.
    Uniform(f64, f64),
    /// Unary operation
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Conditional: evaluates exactly one branch by the condition's
    /// truthiness; a missing condition yields missing
    IfElse(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Number literal.
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    /// Text literal.
    pub fn text(s: impl Into<String>) -> Self {
        Expr::Text(s.into())
    }

    /// Logical literal.
    pub fn logical(b: bool) -> Self {
        Expr::Logical(b)
    }

    /// Unary node.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    /// Binary node.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// Conditional node.
    pub fn if_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::IfElse(Box::new(cond), Box::new(then), Box::new(otherwise))
    }

    /// Returns true if any node in the tree is a random variate, i.e. the
    /// expression is not referentially transparent.
    pub fn is_random(&self) -> bool {
        match self {
            Expr::Exponential(_) | Expr::Normal(_, _) | Expr::Uniform(_, _) => true,
            Expr::Unary(_, a) => a.is_random(),
            Expr::Binary(_, a, b) => a.is_random() || b.is_random(),
            Expr::IfElse(c, t, e) => c.is_random() || t.is_random() || e.is_random(),
            _ => false,
        }
    }
}
