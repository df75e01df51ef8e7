// Formula evaluator - reduces a parsed expression to a number

use super::parser::{Expr, Op};

/// Evaluate an expression tree. Division by zero and non-finite results are errors.
pub fn evaluate(expr: &Expr) -> Result<f64, String> {
    let value = match expr {
        Expr::Number(n) => *n,
        Expr::Neg(inner) => -evaluate(inner)?,
        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left)?;
            let right_val = evaluate(right)?;

            match op {
                Op::Add => left_val + right_val,
                Op::Sub => left_val - right_val,
                Op::Mul => left_val * right_val,
                Op::Div => {
                    if right_val == 0.0 {
                        return Err("Division by zero".to_string());
                    }
                    left_val / right_val
                }
                Op::Pow => left_val.powf(right_val),
            }
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Result is not a finite number: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;

    fn eval_str(s: &str) -> Result<f64, String> {
        evaluate(&parse(s)?)
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval_str("3+4*2"), Ok(11.0));
        assert_eq!(eval_str("(3+4)*2"), Ok(14.0));
        assert_eq!(eval_str("10/4"), Ok(2.5));
        assert_eq!(eval_str("10-4-3"), Ok(3.0));
        assert_eq!(eval_str("8/2/2"), Ok(2.0));
    }

    #[test]
    fn test_power() {
        assert_eq!(eval_str("2^3"), Ok(8.0));
        assert_eq!(eval_str("2^3^2"), Ok(512.0));
        assert_eq!(eval_str("-2^2"), Ok(-4.0));
        assert_eq!(eval_str("(-2)^2"), Ok(4.0));
        assert_eq!(eval_str("2^-1"), Ok(0.5));
        assert_eq!(eval_str("2*3^2"), Ok(18.0));
    }

    #[test]
    fn test_unary() {
        assert_eq!(eval_str("-3+5"), Ok(2.0));
        assert_eq!(eval_str("3--5"), Ok(8.0));
        assert_eq!(eval_str("3*-2"), Ok(-6.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(eval_str("1/0").is_err());
        assert!(eval_str("0/0").is_err());
        assert!(eval_str("5/(2-2)").is_err());
    }

    #[test]
    fn test_overflow_is_error() {
        assert!(eval_str("10^400").is_err());
    }

    #[test]
    fn test_nan_from_fractional_power_of_negative() {
        assert!(eval_str("(-8)^0.5").is_err());
    }
}
