//! Predicate expressions.
//!
//! Expressions are resolved against a table schema before execution:
//! columns become positions and placeholders become literals. Evaluation
//! follows SQL three-valued logic, so a comparison involving NULL yields
//! NULL and a row passes a filter only if the predicate is TRUE.

use std::cmp::Ordering;

use trellis_common::types::Value;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    fn test(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::NotEq => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
        }
    }
}

/// A resolved scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    /// Column at a position of the stored row.
    Column(usize),
    /// Constant.
    Literal(Value),
    /// Binary comparison.
    Compare {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        left: Box<ScalarExpr>,
        /// Right operand.
        right: Box<ScalarExpr>,
    },
    /// Logical AND.
    And(Box<ScalarExpr>, Box<ScalarExpr>),
    /// Logical OR.
    Or(Box<ScalarExpr>, Box<ScalarExpr>),
    /// Logical NOT.
    Not(Box<ScalarExpr>),
    /// `IS NULL`, or `IS NOT NULL` when negated.
    IsNull {
        /// Operand.
        expr: Box<ScalarExpr>,
        /// True for `IS NOT NULL`.
        negated: bool,
    },
}

impl ScalarExpr {
    /// Evaluates the expression against a stored row.
    pub fn eval(&self, row: &[Value]) -> Value {
        match self {
            ScalarExpr::Column(i) => row.get(*i).cloned().unwrap_or(Value::Null),
            ScalarExpr::Literal(v) => v.clone(),
            ScalarExpr::Compare { op, left, right } => left
                .eval(row)
                .sql_cmp(&right.eval(row))
                .map_or(Value::Null, |ord| Value::Boolean(op.test(ord))),
            ScalarExpr::And(l, r) => match (truth(&l.eval(row)), truth(&r.eval(row))) {
                (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
                (Some(true), Some(true)) => Value::Boolean(true),
                _ => Value::Null,
            },
            ScalarExpr::Or(l, r) => match (truth(&l.eval(row)), truth(&r.eval(row))) {
                (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
                (Some(false), Some(false)) => Value::Boolean(false),
                _ => Value::Null,
            },
            ScalarExpr::Not(e) => truth(&e.eval(row)).map_or(Value::Null, |b| Value::Boolean(!b)),
            ScalarExpr::IsNull { expr, negated } => {
                Value::Boolean(expr.eval(row).is_null() != *negated)
            }
        }
    }

    /// Returns true if the expression evaluates to TRUE.
    pub fn matches(&self, row: &[Value]) -> bool {
        truth(&self.eval(row)) == Some(true)
    }
}

/// Truth value of a boolean or NULL; other values count as unknown.
fn truth(value: &Value) -> Option<bool> {
    value.as_bool()
}
