//! Cell coordinates and A1-style names.
//!
//! ```ignore
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.row, 2);  // 0-indexed
//! assert_eq!(cell.col, 1);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::column::{col_to_index, index_to_col};

/// A cell position, 0-indexed on both axes. Orders row-major.
#[derive(
    Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$").expect("A1 regex must compile")
    })
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell name such as `A1` or `AA10`. Returns `None` if invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name.trim())?;
        let col = col_to_index(&caps["letters"])?;
        let row = caps["numbers"].parse::<usize>().ok()?.checked_sub(1)?;
        Some(CellRef::new(row, col))
    }

    /// Column letters for this cell (`B3` -> `B`).
    pub fn col_letters(&self) -> String {
        index_to_col(self.col)
    }

    /// Iterate the inclusive rectangle spanned by two corners, row-major.
    /// The corners may be given in any order.
    pub fn rect(a: CellRef, b: CellRef) -> impl Iterator<Item = CellRef> {
        let (r1, r2) = (a.row.min(b.row), a.row.max(b.row));
        let (c1, c2) = (a.col.min(b.col), a.col.max(b.col));
        (r1..=r2).flat_map(move |row| (c1..=c2).map(move |col| CellRef::new(row, col)))
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::from_str(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Widened so the last row index still has a 1-based number.
        write!(f, "{}{}", index_to_col(self.col), self.row as u128 + 1)
    }
}
