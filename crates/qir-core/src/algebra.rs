//! Payload semantics of the algebraic operators.
//!
//! Operands arriving here are value variants (the evaluator rejects
//! everything else). The semantics follow the source dialect: `/` is
//! true division, `%` takes the divisor's sign, `and`/`or` select an
//! operand by truthiness, and booleans participate in arithmetic as
//! 0/1.

use crate::error::EvalError;
use crate::expression::{BinaryOp, Expression};

enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(value: &Expression) -> Option<Num> {
    match value {
        Expression::Boolean(b) => Some(Num::Int(i64::from(*b))),
        Expression::Number(n) => Some(Num::Int(*n)),
        Expression::Double(d) => Some(Num::Float(*d)),
        _ => None,
    }
}

fn type_error(op: BinaryOp, left: &Expression, right: &Expression) -> EvalError {
    EvalError::Type(format!(
        "unsupported operands for {}: {} and {}",
        op.name(),
        left.variant_name(),
        right.variant_name()
    ))
}

/// Truthiness of a value variant.
pub(crate) fn truthy(value: &Expression) -> Result<bool, EvalError> {
    match value {
        Expression::Null => Ok(false),
        Expression::Boolean(b) => Ok(*b),
        Expression::Number(n) => Ok(*n != 0),
        Expression::Double(d) => Ok(*d != 0.0),
        Expression::String(s) => Ok(!s.is_empty()),
        other => Err(EvalError::Type(format!(
            "no truth value for {}",
            other.variant_name()
        ))),
    }
}

pub(crate) fn apply_not(value: &Expression) -> Result<Expression, EvalError> {
    Ok(Expression::Boolean(!truthy(value)?))
}

/// Sign-of-divisor modulo on integers.
fn int_mod(x: i64, y: i64) -> i64 {
    let r = x % y;
    if r != 0 && (r < 0) != (y < 0) { r + y } else { r }
}

/// Sign-of-divisor modulo on floats.
fn float_mod(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

fn numeric_eq(left: &Num, right: &Num) -> bool {
    match (left, right) {
        (Num::Int(x), Num::Int(y)) => x == y,
        (Num::Float(x), Num::Float(y)) => x == y,
        (Num::Int(x), Num::Float(y)) | (Num::Float(y), Num::Int(x)) => (*x as f64) == *y,
    }
}

fn numeric_cmp(left: &Num, right: &Num) -> std::cmp::Ordering {
    match (left, right) {
        (Num::Int(x), Num::Int(y)) => x.cmp(y),
        (Num::Int(x), Num::Float(y)) => (*x as f64).total_cmp(y),
        (Num::Float(x), Num::Int(y)) => x.total_cmp(&(*y as f64)),
        (Num::Float(x), Num::Float(y)) => x.total_cmp(y),
    }
}

pub(crate) fn apply_binary(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
) -> Result<Expression, EvalError> {
    use BinaryOp::*;

    match op {
        And => return Ok(if truthy(left)? { right.clone() } else { left.clone() }),
        Or => return Ok(if truthy(left)? { left.clone() } else { right.clone() }),
        Equal => return Ok(Expression::Boolean(values_equal(left, right))),
        _ => {}
    }

    // String concatenation is the one non-numeric arithmetic case.
    if let (Plus, Expression::String(x), Expression::String(y)) = (op, left, right) {
        return Ok(Expression::String(format!("{x}{y}")));
    }

    if let (Expression::String(x), Expression::String(y)) = (left, right) {
        let ordering = x.cmp(y);
        if let Some(result) = comparison(op, ordering) {
            return Ok(result);
        }
        return Err(type_error(op, left, right));
    }

    let (Some(x), Some(y)) = (as_num(left), as_num(right)) else {
        return Err(type_error(op, left, right));
    };

    if let Some(result) = comparison(op, numeric_cmp(&x, &y)) {
        return Ok(result);
    }

    match op {
        Plus => arith(op, x, y, i64::checked_add, |a, b| a + b),
        Minus => arith(op, x, y, i64::checked_sub, |a, b| a - b),
        Star => arith(op, x, y, i64::checked_mul, |a, b| a * b),
        Div => {
            let (a, b) = (to_f64(&x), to_f64(&y));
            if b == 0.0 {
                return Err(EvalError::Type("division by zero".to_owned()));
            }
            Ok(Expression::Double(a / b))
        }
        Mod => match (x, y) {
            (_, Num::Int(0)) => Err(EvalError::Type("modulo by zero".to_owned())),
            (Num::Int(a), Num::Int(b)) => Ok(Expression::Number(int_mod(a, b))),
            (a, b) => {
                let b = to_f64(&b);
                if b == 0.0 {
                    return Err(EvalError::Type("modulo by zero".to_owned()));
                }
                Ok(Expression::Double(float_mod(to_f64(&a), b)))
            }
        },
        Power => match (x, y) {
            (Num::Int(a), Num::Int(b)) if b >= 0 => {
                let exponent = u32::try_from(b)
                    .map_err(|_| EvalError::Type("exponent too large".to_owned()))?;
                a.checked_pow(exponent)
                    .map(Expression::Number)
                    .ok_or_else(|| EvalError::Type("integer overflow".to_owned()))
            }
            (a, b) => Ok(Expression::Double(to_f64(&a).powf(to_f64(&b)))),
        },
        And | Or | Equal | LowerOrEqual | LowerThan | GreaterOrEqual | GreaterThan => {
            unreachable!("handled above")
        }
    }
}

fn to_f64(value: &Num) -> f64 {
    match value {
        Num::Int(x) => *x as f64,
        Num::Float(x) => *x,
    }
}

fn arith(
    op: BinaryOp,
    x: Num,
    y: Num,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Expression, EvalError> {
    match (x, y) {
        (Num::Int(a), Num::Int(b)) => int_op(a, b)
            .map(Expression::Number)
            .ok_or_else(|| EvalError::Type(format!("integer overflow in {}", op.name()))),
        (a, b) => Ok(Expression::Double(float_op(to_f64(&a), to_f64(&b)))),
    }
}

fn comparison(op: BinaryOp, ordering: std::cmp::Ordering) -> Option<Expression> {
    use std::cmp::Ordering::*;
    let result = match op {
        BinaryOp::LowerThan => ordering == Less,
        BinaryOp::LowerOrEqual => ordering != Greater,
        BinaryOp::GreaterThan => ordering == Greater,
        BinaryOp::GreaterOrEqual => ordering != Less,
        _ => return None,
    };
    Some(Expression::Boolean(result))
}

/// Equality across value payloads: numerics compare by value (booleans
/// count as 0/1), strings by content, `Null` only to itself, anything
/// mismatched is unequal.
fn values_equal(left: &Expression, right: &Expression) -> bool {
    match (left, right) {
        (Expression::Null, Expression::Null) => true,
        (Expression::String(x), Expression::String(y)) => x == y,
        _ => match (as_num(left), as_num(right)) {
            (Some(x), Some(y)) => numeric_eq(&x, &y),
            _ => false,
        },
    }
}
