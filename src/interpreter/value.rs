use std::fmt::Display;

use serde::Serialize;

use crate::ast::{self, InfixOperator, Literal};

use super::RuntimeErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Real(f64),
}

impl Value {
    pub fn as_f64(self) -> f64 {
        match self {
            Value::Integer(n) => n as f64,
            Value::Real(n) => n,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Value::Integer(n) => n == 0,
            Value::Real(n) => n == 0.0,
        }
    }

    pub fn binary(self, op: InfixOperator, rhs: Value) -> Result<Value, RuntimeErrorKind> {
        match op {
            InfixOperator::Plus => arithmetic(self, op, rhs, i64::checked_add, |a, b| a + b),
            InfixOperator::Minus => arithmetic(self, op, rhs, i64::checked_sub, |a, b| a - b),
            InfixOperator::Multiply => arithmetic(self, op, rhs, i64::checked_mul, |a, b| a * b),
            InfixOperator::FloatDivide => {
                if rhs.is_zero() {
                    return Err(RuntimeErrorKind::DivisionByZero);
                }
                finite(op, self.as_f64() / rhs.as_f64())
            }
            InfixOperator::IntegerDivide => {
                if rhs.is_zero() {
                    return Err(RuntimeErrorKind::DivisionByZero);
                }
                match (self, rhs) {
                    (Value::Integer(a), Value::Integer(b)) => floor_div(a, b)
                        .map(Value::Integer)
                        .ok_or_else(|| RuntimeErrorKind::Overflow(op.to_string())),
                    (a, b) => {
                        let quotient = (a.as_f64() / b.as_f64()).floor();
                        if quotient.is_finite()
                            && quotient >= i64::MIN as f64
                            && quotient < i64::MAX as f64
                        {
                            Ok(Value::Integer(quotient as i64))
                        } else {
                            Err(RuntimeErrorKind::Overflow(op.to_string()))
                        }
                    }
                }
            }
        }
    }

    pub fn negate(self) -> Result<Value, RuntimeErrorKind> {
        match self {
            Value::Integer(n) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| RuntimeErrorKind::Overflow("-".to_string())),
            Value::Real(n) => Ok(Value::Real(-n)),
        }
    }
}

fn arithmetic(
    lhs: Value,
    op: InfixOperator,
    rhs: Value,
    integer: fn(i64, i64) -> Option<i64>,
    real: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeErrorKind> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => integer(a, b)
            .map(Value::Integer)
            .ok_or_else(|| RuntimeErrorKind::Overflow(op.to_string())),
        (a, b) => finite(op, real(a.as_f64(), b.as_f64())),
    }
}

fn finite(op: InfixOperator, n: f64) -> Result<Value, RuntimeErrorKind> {
    if n.is_finite() {
        Ok(Value::Real(n))
    } else {
        Err(RuntimeErrorKind::Overflow(op.to_string()))
    }
}

// Rounds toward negative infinity, unlike `/` on i64.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient.checked_sub(1)
    } else {
        Some(quotient)
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Integer(n) => Value::Integer(n),
            Literal::Real(n) => Value::Real(n),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(n) => ast::format_real(f, *n),
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::Integer(10), InfixOperator::IntegerDivide, Value::Integer(4), Value::Integer(2))]
    #[case(Value::Integer(-7), InfixOperator::IntegerDivide, Value::Integer(2), Value::Integer(-4))]
    #[case(Value::Integer(7), InfixOperator::IntegerDivide, Value::Integer(-2), Value::Integer(-4))]
    #[case(Value::Integer(-8), InfixOperator::IntegerDivide, Value::Integer(-2), Value::Integer(4))]
    #[case(Value::Real(7.5), InfixOperator::IntegerDivide, Value::Integer(2), Value::Integer(3))]
    #[case(Value::Integer(10), InfixOperator::FloatDivide, Value::Integer(4), Value::Real(2.5))]
    #[case(Value::Integer(2), InfixOperator::Plus, Value::Real(0.5), Value::Real(2.5))]
    #[case(Value::Integer(2), InfixOperator::Minus, Value::Integer(5), Value::Integer(-3))]
    #[case(Value::Real(1.5), InfixOperator::Multiply, Value::Integer(2), Value::Real(3.0))]
    fn test_binary(
        #[case] lhs: Value,
        #[case] op: InfixOperator,
        #[case] rhs: Value,
        #[case] expected: Value,
    ) {
        assert_eq!(lhs.binary(op, rhs), Ok(expected));
    }

    #[rstest]
    #[case(InfixOperator::FloatDivide, Value::Integer(0))]
    #[case(InfixOperator::FloatDivide, Value::Real(0.0))]
    #[case(InfixOperator::IntegerDivide, Value::Integer(0))]
    #[case(InfixOperator::IntegerDivide, Value::Real(0.0))]
    fn test_division_by_zero(#[case] op: InfixOperator, #[case] rhs: Value) {
        assert_eq!(
            Value::Integer(1).binary(op, rhs),
            Err(RuntimeErrorKind::DivisionByZero)
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            Value::Integer(i64::MAX).binary(InfixOperator::Plus, Value::Integer(1)),
            Err(RuntimeErrorKind::Overflow("+".to_string()))
        );
        assert_eq!(
            Value::Integer(i64::MIN).binary(InfixOperator::IntegerDivide, Value::Integer(-1)),
            Err(RuntimeErrorKind::Overflow("DIV".to_string()))
        );
        assert_eq!(
            Value::Integer(i64::MIN).negate(),
            Err(RuntimeErrorKind::Overflow("-".to_string()))
        );
    }

    #[test]
    fn test_real_overflow() {
        assert_eq!(
            Value::Real(f64::MAX).binary(InfixOperator::Multiply, Value::Real(f64::MAX)),
            Err(RuntimeErrorKind::Overflow("*".to_string()))
        );
        assert_eq!(
            Value::Real(f64::MAX).binary(InfixOperator::FloatDivide, Value::Real(0.5)),
            Err(RuntimeErrorKind::Overflow("/".to_string()))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Integer(25).to_string(), "25");
        assert_eq!(Value::Real(3.0).to_string(), "3.0");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
    }
}
