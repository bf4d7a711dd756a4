//! decel-core - the spreadsheet grid, recomputation and persistence.

pub mod error;
pub mod market;
pub mod script;
pub mod storage;
pub mod table;

pub use error::{DecelError, Result};
pub use script::ScriptLoader;
pub use table::{PropagationReport, Table};

pub use decel_engine::engine::{Bindings, CellFormula, CellRef, Value};
