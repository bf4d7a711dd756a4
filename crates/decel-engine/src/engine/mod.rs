//! Spreadsheet engine API.
//!
//! - [`col_to_index`], [`index_to_col`] - bijective column letter codec
//! - [`CellRef`] - cell coordinates and A1 names
//! - [`Reference`], [`scan_references`] - reference tokens in formula text
//! - [`Formula`], [`ChildFormula`], [`CellFormula`] - formulas and their fill copies
//! - [`evaluate`], [`Bindings`] - the sandboxed expression language
//! - [`DependencyGraph`] - recomputation ordering for one propagation pass

mod bindings;
mod cell_ref;
mod column;
mod eval;
mod formula;
mod graph;
mod lexer;
mod parser;
mod reference;
mod value;

pub use bindings::{Binding, Bindings, NativeFn};
pub use cell_ref::CellRef;
pub use column::{col_to_index, index_to_col};
pub use eval::{EvalError, evaluate, evaluate_literal};
pub use formula::{CellFormula, CellSource, ChildFormula, Formula};
pub use graph::{DependencyGraph, Propagation};
pub use parser::{BinaryOp, Expr, UnaryOp, parse};
pub use reference::{
    Axis, RefPattern, Reference, ReferenceDecodeError, Resolved, contains_reference,
    scan_references,
};
pub use value::{Value, format_number};
