//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Names are registered ALL CAPS; lookup falls back to case-insensitive,
//!   so `sum(A1:A5)` and `SUM(A1:A5)` both work.
//! - Aggregates flatten range arguments and skip empty and text cells.
//! - If you add a builtin, add it to `BUILTINS`; `register_builtins` takes
//!   everything from that table.

use crate::engine::{Bindings, EvalError, Value};
use chrono::Local;
use rand::Rng;

pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    pub func: fn(&[Value]) -> Result<Value, EvalError>,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "SUM",
        description: "Sum of numeric values",
        func: sum,
    },
    Builtin {
        name: "AVG",
        description: "Average of numeric values",
        func: avg,
    },
    Builtin {
        name: "MEAN",
        description: "Average of numeric values",
        func: avg,
    },
    Builtin {
        name: "MIN",
        description: "Minimum numeric value",
        func: min,
    },
    Builtin {
        name: "MAX",
        description: "Maximum numeric value",
        func: max,
    },
    Builtin {
        name: "COUNT",
        description: "Count of non-empty values",
        func: count,
    },
    Builtin {
        name: "ABS",
        description: "Absolute value",
        func: abs,
    },
    Builtin {
        name: "ROUND",
        description: "Round to a number of decimal places (default 0)",
        func: round,
    },
    Builtin {
        name: "FLOOR",
        description: "Round down to an integer",
        func: floor,
    },
    Builtin {
        name: "CEIL",
        description: "Round up to an integer",
        func: ceil,
    },
    Builtin {
        name: "SQRT",
        description: "Square root",
        func: sqrt,
    },
    Builtin {
        name: "POW",
        description: "Raise a base to an exponent",
        func: pow,
    },
    Builtin {
        name: "IF",
        description: "IF(cond, then, else?) picks a value by truthiness",
        func: if_,
    },
    Builtin {
        name: "LEN",
        description: "Length of text or number of list items",
        func: len,
    },
    Builtin {
        name: "CONCAT",
        description: "Join values as text",
        func: concat,
    },
    Builtin {
        name: "UPPER",
        description: "Uppercase text",
        func: upper,
    },
    Builtin {
        name: "LOWER",
        description: "Lowercase text",
        func: lower,
    },
    Builtin {
        name: "RAND",
        description: "Random float in [0, 1)",
        func: rand_float,
    },
    Builtin {
        name: "RANDINT",
        description: "Random integer in [min, max] inclusive",
        func: rand_int,
    },
    Builtin {
        name: "NOW",
        description: "Current local date and time as text",
        func: now,
    },
    Builtin {
        name: "TODAY",
        description: "Current local date as text",
        func: today,
    },
];

/// One-line description of a builtin function.
pub fn describe(name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(name))
        .map(|b| b.description)
}

/// Register every builtin function and constant into `bindings`.
pub fn register_builtins(bindings: &mut Bindings) {
    for b in BUILTINS {
        let func = b.func;
        bindings.insert_fn(b.name, move |args: &[Value]| func(args));
    }
    bindings.insert_value("PI", Value::Number(std::f64::consts::PI));
    bindings.insert_value("E", Value::Number(std::f64::consts::E));
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(EvalError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn number_arg(name: &str, v: &Value) -> Result<f64, EvalError> {
    v.as_number().ok_or_else(|| EvalError::Function {
        name: name.to_string(),
        message: format!("expected a number, got {}", v.type_name()),
    })
}

/// Flatten lists and collect the numbers; errors anywhere poison the result.
fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    fn walk(name: &str, v: &Value, out: &mut Vec<f64>) -> Result<(), EvalError> {
        match v {
            Value::Number(n) => out.push(*n),
            Value::List(items) => {
                for item in items {
                    walk(name, item, out)?;
                }
            }
            Value::Error(expr) => {
                return Err(EvalError::Function {
                    name: name.to_string(),
                    message: format!("error in input #ERR({})", expr),
                });
            }
            Value::Empty | Value::Text(_) => {}
        }
        Ok(())
    }

    let mut out = Vec::new();
    for arg in args {
        walk(name, arg, &mut out)?;
    }
    Ok(out)
}

fn sum(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(numbers("SUM", args)?.iter().sum()))
}

fn avg(args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("AVG", args)?;
    if ns.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(ns.iter().sum::<f64>() / ns.len() as f64))
}

fn min(args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("MIN", args)?;
    Ok(Value::Number(
        ns.into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

fn max(args: &[Value]) -> Result<Value, EvalError> {
    let ns = numbers("MAX", args)?;
    Ok(Value::Number(
        ns.into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

fn count(args: &[Value]) -> Result<Value, EvalError> {
    fn walk(v: &Value) -> usize {
        match v {
            Value::Empty => 0,
            Value::List(items) => items.iter().map(walk).sum(),
            _ => 1,
        }
    }
    Ok(Value::Number(args.iter().map(walk).sum::<usize>() as f64))
}

fn abs(args: &[Value]) -> Result<Value, EvalError> {
    arity("ABS", args, 1, 1)?;
    Ok(Value::Number(number_arg("ABS", &args[0])?.abs()))
}

fn round(args: &[Value]) -> Result<Value, EvalError> {
    arity("ROUND", args, 1, 2)?;
    let n = number_arg("ROUND", &args[0])?;
    let places = match args.get(1) {
        Some(v) => number_arg("ROUND", v)?,
        None => 0.0,
    };
    if !(0.0..=12.0).contains(&places) {
        return Err(EvalError::Function {
            name: "ROUND".to_string(),
            message: "decimals must be between 0 and 12".to_string(),
        });
    }
    let factor = 10f64.powi(places as i32);
    Ok(Value::Number((n * factor).round() / factor))
}

fn floor(args: &[Value]) -> Result<Value, EvalError> {
    arity("FLOOR", args, 1, 1)?;
    Ok(Value::Number(number_arg("FLOOR", &args[0])?.floor()))
}

fn ceil(args: &[Value]) -> Result<Value, EvalError> {
    arity("CEIL", args, 1, 1)?;
    Ok(Value::Number(number_arg("CEIL", &args[0])?.ceil()))
}

fn sqrt(args: &[Value]) -> Result<Value, EvalError> {
    arity("SQRT", args, 1, 1)?;
    Ok(Value::Number(number_arg("SQRT", &args[0])?.sqrt()))
}

fn pow(args: &[Value]) -> Result<Value, EvalError> {
    arity("POW", args, 2, 2)?;
    let base = number_arg("POW", &args[0])?;
    let exp = number_arg("POW", &args[1])?;
    Ok(Value::Number(base.powf(exp)))
}

fn if_(args: &[Value]) -> Result<Value, EvalError> {
    arity("IF", args, 2, 3)?;
    if args[0].is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Number(0.0)))
    }
}

fn len(args: &[Value]) -> Result<Value, EvalError> {
    arity("LEN", args, 1, 1)?;
    let n = match &args[0] {
        Value::List(items) => items.len(),
        Value::Empty => 0,
        other => other.to_string().chars().count(),
    };
    Ok(Value::Number(n as f64))
}

fn concat(args: &[Value]) -> Result<Value, EvalError> {
    fn walk(v: &Value, out: &mut String) {
        match v {
            Value::List(items) => items.iter().for_each(|i| walk(i, out)),
            other => out.push_str(&other.to_string()),
        }
    }
    let mut out = String::new();
    args.iter().for_each(|a| walk(a, &mut out));
    Ok(Value::Text(out))
}

fn upper(args: &[Value]) -> Result<Value, EvalError> {
    arity("UPPER", args, 1, 1)?;
    Ok(Value::Text(args[0].to_string().to_uppercase()))
}

fn lower(args: &[Value]) -> Result<Value, EvalError> {
    arity("LOWER", args, 1, 1)?;
    Ok(Value::Text(args[0].to_string().to_lowercase()))
}

fn rand_float(args: &[Value]) -> Result<Value, EvalError> {
    arity("RAND", args, 0, 0)?;
    Ok(Value::Number(rand::thread_rng().gen_range(0.0..1.0)))
}

fn rand_int(args: &[Value]) -> Result<Value, EvalError> {
    arity("RANDINT", args, 2, 2)?;
    let lo = number_arg("RANDINT", &args[0])?.ceil() as i64;
    let hi = number_arg("RANDINT", &args[1])?.floor() as i64;
    if lo > hi {
        return Err(EvalError::Function {
            name: "RANDINT".to_string(),
            message: "min must be <= max".to_string(),
        });
    }
    Ok(Value::Number(rand::thread_rng().gen_range(lo..=hi) as f64))
}

fn now(args: &[Value]) -> Result<Value, EvalError> {
    arity("NOW", args, 0, 0)?;
    Ok(Value::Text(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()))
}

fn today(args: &[Value]) -> Result<Value, EvalError> {
    arity("TODAY", args, 0, 0)?;
    Ok(Value::Text(Local::now().format("%Y-%m-%d").to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::evaluate_literal;

    fn eval(input: &str) -> Value {
        evaluate_literal(input, &Bindings::with_builtins()).unwrap()
    }

    fn list(ns: &[f64]) -> Value {
        Value::List(ns.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn test_aggregates_skip_text_and_empty() {
        let range = Value::List(vec![
            Value::Number(1.0),
            Value::Empty,
            Value::text("x"),
            Value::Number(4.0),
        ]);
        assert_eq!(sum(&[range.clone()]), Ok(Value::Number(5.0)));
        assert_eq!(avg(&[range.clone()]), Ok(Value::Number(2.5)));
        assert_eq!(min(&[range.clone()]), Ok(Value::Number(1.0)));
        assert_eq!(max(&[range.clone()]), Ok(Value::Number(4.0)));
        assert_eq!(count(&[range]), Ok(Value::Number(3.0)));
    }

    #[test]
    fn test_aggregates_mix_scalars_and_lists() {
        assert_eq!(sum(&[list(&[1.0, 2.0]), Value::Number(3.0)]), Ok(Value::Number(6.0)));
        assert_eq!(max(&[]), Ok(Value::Number(0.0)));
    }

    #[test]
    fn test_aggregate_rejects_error_inputs() {
        let range = Value::List(vec![Value::Number(1.0), Value::Error("x/0".into())]);
        assert!(sum(&[range]).is_err());
    }

    #[test]
    fn test_scalar_functions() {
        assert_eq!(eval("ABS(-3)"), Value::Number(3.0));
        assert_eq!(eval("round(2.346, 2)"), Value::Number(2.35));
        assert_eq!(eval("ROUND(2.5)"), Value::Number(3.0));
        assert_eq!(eval("pow(2, 10)"), Value::Number(1024.0));
        assert_eq!(eval("IF(1 > 2, 'a', 'b')"), Value::text("b"));
        assert_eq!(eval("LEN('hello')"), Value::Number(5.0));
        assert_eq!(eval("CONCAT('a', 1, [2, 3])"), Value::text("a123"));
        assert_eq!(eval("upper('x')"), Value::text("X"));
    }

    #[test]
    fn test_arity_errors() {
        let err = evaluate_literal("ABS(1, 2)", &Bindings::with_builtins()).unwrap_err();
        assert!(matches!(err, EvalError::Arity { got: 2, .. }));
    }

    #[test]
    fn test_rand_returns_value_in_range() {
        for _ in 0..100 {
            let Value::Number(n) = eval("RAND()") else {
                panic!("expected number");
            };
            assert!((0.0..1.0).contains(&n));
        }
    }

    #[test]
    fn test_randint_returns_value_in_range() {
        for _ in 0..100 {
            let Value::Number(n) = eval("RANDINT(1, 6)") else {
                panic!("expected number");
            };
            assert!((1.0..=6.0).contains(&n));
            assert_eq!(n.fract(), 0.0);
        }
    }

    #[test]
    fn test_today_is_a_date() {
        let Value::Text(s) = eval("TODAY()") else {
            panic!("expected text");
        };
        assert_eq!(s.len(), 10);
        assert_eq!(s.as_bytes()[4], b'-');
    }
}
