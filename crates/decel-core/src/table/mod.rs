//! The grid of cells and its recomputation logic.

mod eval;
mod io;
mod ops;
mod state;

pub use eval::PropagationReport;
pub use state::Table;
