//! Expression evaluation.
//!
//! Names resolve against a per-evaluation local map first (the reference
//! placeholders a formula substitutes in), then against the [`Bindings`]
//! table. Function calls may only target registered functions.

use std::collections::HashMap;
use thiserror::Error;

use super::bindings::{Binding, Bindings};
use super::parser::{BinaryOp, Expr, UnaryOp, parse};
use super::value::Value;

/// Failure while parsing or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("{0} is a function, not a value")]
    NotAValue(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Type mismatch: {0}")]
    Type(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{name}: {message}")]
    Function { name: String, message: String },
}

/// Parse and evaluate `input`.
pub fn evaluate(
    input: &str,
    locals: &HashMap<String, Value>,
    bindings: &Bindings,
) -> Result<Value, EvalError> {
    let expr = parse(input)?;
    eval_expr(&expr, locals, bindings)
}

/// Evaluate `input` with no local names, only the bindings table.
pub fn evaluate_literal(input: &str, bindings: &Bindings) -> Result<Value, EvalError> {
    evaluate(input, &HashMap::new(), bindings)
}

pub fn eval_expr(
    expr: &Expr,
    locals: &HashMap<String, Value>,
    bindings: &Bindings,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Name(name) => {
            if let Some(v) = locals.get(name) {
                return Ok(v.clone());
            }
            match bindings.get(name) {
                Some(Binding::Value(v)) => Ok(v.clone()),
                Some(Binding::Function(_)) => Err(EvalError::NotAValue(name.clone())),
                None => Err(EvalError::UnknownName(name.clone())),
            }
        }
        Expr::Call(name, args) => {
            let func = match bindings.get(name) {
                Some(Binding::Function(f)) => f.clone(),
                Some(Binding::Value(_)) => return Err(EvalError::NotCallable(name.clone())),
                None => return Err(EvalError::UnknownName(name.clone())),
            };
            let values = args
                .iter()
                .map(|a| eval_expr(a, locals, bindings))
                .collect::<Result<Vec<_>, _>>()?;
            func(&values)
        }
        Expr::List(items) => Ok(Value::List(
            items
                .iter()
                .map(|a| eval_expr(a, locals, bindings))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, locals, bindings)?;
            let n = number_operand(&v)?;
            Ok(Value::Number(match op {
                UnaryOp::Neg => -n,
                UnaryOp::Plus => n,
            }))
        }
        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, locals, bindings)?;
            let r = eval_expr(rhs, locals, bindings)?;
            binary(*op, &l, &r)
        }
    }
}

fn number_operand(v: &Value) -> Result<f64, EvalError> {
    v.as_number()
        .ok_or_else(|| EvalError::Type(format!("expected a number, got {}", v.type_name())))
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    if let (BinaryOp::Add, Value::Text(a), Value::Text(b)) = (op, l, r) {
        return Ok(Value::Text(format!("{}{}", a, b)));
    }

    match op {
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare(op, l, r)
        }
        _ => {
            let a = number_operand(l)?;
            let b = number_operand(r)?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => a / b,
                BinaryOp::Rem if b == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Rem => a % b,
                BinaryOp::Pow => a.powf(b),
                _ => unreachable!("comparison handled above"),
            };
            Ok(Value::Number(n))
        }
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    use std::cmp::Ordering;

    let ordering = match (l, r) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ if matches!(op, BinaryOp::Eq | BinaryOp::Ne) => None,
            _ => {
                return Err(EvalError::Type(format!(
                    "cannot order {} and {}",
                    l.type_name(),
                    r.type_name()
                )));
            }
        },
    };

    let result = match op {
        BinaryOp::Eq => ordering == Some(Ordering::Equal),
        BinaryOp::Ne => ordering != Some(Ordering::Equal),
        BinaryOp::Lt => ordering == Some(Ordering::Less),
        BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Gt => ordering == Some(Ordering::Greater),
        BinaryOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        _ => unreachable!("only comparisons reach compare"),
    };
    Ok(Value::Number(if result { 1.0 } else { 0.0 }))
}
