//! Named values and functions visible to formula evaluation.
//!
//! A `Bindings` table is built once when a document is opened (builtins plus
//! whatever the script loader supplies) and passed to every evaluation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::eval::EvalError;
use super::value::Value;

/// A callable exposed to formulas.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync>;

#[derive(Clone)]
pub enum Binding {
    Value(Value),
    Function(NativeFn),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Binding::Function(_) => f.write_str("Function(..)"),
        }
    }
}

#[derive(Clone, Default)]
pub struct Bindings {
    entries: HashMap<String, Binding>,
}

impl Bindings {
    /// An empty table (no builtins).
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the built-in functions and constants.
    pub fn with_builtins() -> Self {
        let mut bindings = Self::new();
        crate::builtins::register_builtins(&mut bindings);
        bindings
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), Binding::Value(value));
    }

    pub fn insert_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Binding::Function(Arc::new(f)));
    }

    /// Look up a name: exact match first, then case-insensitive.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Layer `other` over this table; its entries win on conflict.
    pub fn merge(&mut self, other: Bindings) {
        self.entries.extend(other.entries);
    }

    /// Sorted binding names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Callable names with their builtin description, sorted. Functions
    /// with no builtin of that name (script functions) have `None`.
    pub fn functions(&self) -> Vec<(&str, Option<&'static str>)> {
        self.names()
            .into_iter()
            .filter(|name| matches!(self.entries.get(*name), Some(Binding::Function(_))))
            .map(|name| (name, crate::builtins::describe(name)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings")
            .field("names", &self.names())
            .finish()
    }
}
