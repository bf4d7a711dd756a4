//! Market data as a formula function.
//!
//! No quote provider ships with decel: callers plug one in through
//! [`QuoteSource`] and [`register_quotes`] exposes it to formulas as
//! `TICK(ticker, period, interval)`.

use decel_engine::engine::{Bindings, EvalError, Value};
use std::sync::Arc;

pub const DEFAULT_PERIOD: &str = "3mo";
pub const DEFAULT_INTERVAL: &str = "1h";

/// A provider of the latest price for a ticker.
pub trait QuoteSource: Send + Sync {
    fn quote(&self, ticker: &str, period: &str, interval: &str) -> Result<f64, String>;
}

/// Bind `TICK` to `source`. Period and interval are optional.
pub fn register_quotes(bindings: &mut Bindings, source: Arc<dyn QuoteSource>) {
    bindings.insert_fn("TICK", move |args: &[Value]| {
        if args.is_empty() || args.len() > 3 {
            return Err(EvalError::Arity {
                name: "TICK".to_string(),
                expected: "1 to 3".to_string(),
                got: args.len(),
            });
        }
        let text_arg = |index: usize, default: &str| -> Result<String, EvalError> {
            match args.get(index) {
                None | Some(Value::Empty) => Ok(default.to_string()),
                Some(Value::Text(s)) => Ok(s.clone()),
                Some(other) => Err(EvalError::Type(format!(
                    "TICK expects text arguments, got {}",
                    other.type_name()
                ))),
            }
        };
        let ticker = text_arg(0, "")?;
        let period = text_arg(1, DEFAULT_PERIOD)?;
        let interval = text_arg(2, DEFAULT_INTERVAL)?;

        source
            .quote(&ticker, &period, &interval)
            .map(Value::Number)
            .map_err(|message| EvalError::Function {
                name: "TICK".to_string(),
                message,
            })
    });
}
