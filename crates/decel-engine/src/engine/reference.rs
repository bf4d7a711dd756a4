//! Reference tokens inside formula text.
//!
//! A token is a single cell (`B3`, `$B3`, `B$3`, `$B$3`) or a range of two
//! cells joined by `:`. Each axis carries its own lock flag. A locked axis
//! always resolves to its literal coordinate; an unlocked axis is shifted by
//! the distance between the evaluation anchor and the formula's origin.
//!
//! References inside string literals, glued to identifier characters, or
//! directly followed by `(` (function names such as `LOG10`) are ignored.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;
use thiserror::Error;

use super::cell_ref::CellRef;
use super::column::{col_to_index, index_to_col};

/// A token matched the reference grammar but could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error deciphering token: {token}")]
pub struct ReferenceDecodeError {
    pub token: String,
}

impl ReferenceDecodeError {
    fn new(token: &str) -> Self {
        ReferenceDecodeError {
            token: token.to_string(),
        }
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$?[A-Z]+\$?[0-9]+(?::\$?[A-Z]+\$?[0-9]+)?")
            .expect("reference token regex must compile")
    })
}

fn cell_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<col_lock>\$?)(?<col>[A-Z]+)(?<row_lock>\$?)(?<row>[0-9]+)$")
            .expect("cell token regex must compile")
    })
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Byte ranges covered by quoted string literals (quotes included).
fn string_literal_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut open: Option<(usize, u8)> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        match open {
            Some((start, quote)) => {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == quote {
                    spans.push(start..i + 1);
                    open = None;
                }
            }
            None if b == b'"' || b == b'\'' => open = Some((i, b)),
            None => {}
        }
    }
    if let Some((start, _)) = open {
        spans.push(start..bytes.len());
    }
    spans
}

/// Find every reference token in `text`, in text order.
pub fn scan_references(text: &str) -> Vec<(Range<usize>, &str)> {
    let bytes = text.as_bytes();
    let strings = string_literal_spans(text);

    token_re()
        .find_iter(text)
        .filter(|m| {
            let glued_before = m.start() > 0 && is_ident_byte(bytes[m.start() - 1]);
            let glued_after = bytes
                .get(m.end())
                .is_some_and(|&b| is_ident_byte(b) || b == b'(');
            let quoted = strings
                .iter()
                .any(|s| s.start <= m.start() && m.start() < s.end);
            !glued_before && !glued_after && !quoted
        })
        .map(|m| (m.range(), m.as_str()))
        .collect()
}

/// True if `text` contains at least one reference token.
pub fn contains_reference(text: &str) -> bool {
    !scan_references(text).is_empty()
}

/// One axis of a single-cell reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Axis {
    /// Literal coordinate from the token text, 0-indexed.
    pub index: usize,
    pub locked: bool,
}

impl Axis {
    fn resolve(&self, origin: usize, anchor: usize) -> Option<usize> {
        if self.locked {
            return Some(self.index);
        }
        let shifted = anchor as i128 + (self.index as i128 - origin as i128);
        usize::try_from(shifted).ok()
    }

    fn marker(&self) -> &'static str {
        if self.locked { "$" } else { "" }
    }
}

/// A decoded single-cell token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefPattern {
    pub row: Axis,
    pub col: Axis,
}

impl RefPattern {
    pub fn parse(token: &str) -> Result<RefPattern, ReferenceDecodeError> {
        let caps = cell_re()
            .captures(token)
            .ok_or_else(|| ReferenceDecodeError::new(token))?;
        let col = col_to_index(&caps["col"]).ok_or_else(|| ReferenceDecodeError::new(token))?;
        // Text rows are 1-indexed.
        let row = caps["row"]
            .parse::<usize>()
            .ok()
            .and_then(|r| r.checked_sub(1))
            .ok_or_else(|| ReferenceDecodeError::new(token))?;

        Ok(RefPattern {
            row: Axis {
                index: row,
                locked: !caps["row_lock"].is_empty(),
            },
            col: Axis {
                index: col,
                locked: !caps["col_lock"].is_empty(),
            },
        })
    }

    /// Resolve against a formula declared at `origin`, evaluated at `anchor`.
    /// Returns `None` when a relative shift would leave the grid.
    pub fn resolve(&self, origin: CellRef, anchor: CellRef) -> Option<CellRef> {
        Some(CellRef::new(
            self.row.resolve(origin.row, anchor.row)?,
            self.col.resolve(origin.col, anchor.col)?,
        ))
    }

    /// Write `cell` back as token text using this pattern's lock markers.
    pub fn render(&self, cell: CellRef) -> String {
        format!(
            "{}{}{}{}",
            self.col.marker(),
            index_to_col(cell.col),
            self.row.marker(),
            cell.row as u128 + 1
        )
    }
}

/// A decoded reference token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reference {
    Cell(RefPattern),
    Range(RefPattern, RefPattern),
}

/// A reference resolved for a particular anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    Cell(CellRef),
    Range(CellRef, CellRef),
}

impl Reference {
    pub fn parse(token: &str) -> Result<Reference, ReferenceDecodeError> {
        match token.split_once(':') {
            Some((start, end)) => Ok(Reference::Range(
                RefPattern::parse(start)?,
                RefPattern::parse(end)?,
            )),
            None => Ok(Reference::Cell(RefPattern::parse(token)?)),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Reference::Range(..))
    }

    pub fn resolve(&self, origin: CellRef, anchor: CellRef) -> Option<Resolved> {
        match self {
            Reference::Cell(p) => Some(Resolved::Cell(p.resolve(origin, anchor)?)),
            Reference::Range(a, b) => Some(Resolved::Range(
                a.resolve(origin, anchor)?,
                b.resolve(origin, anchor)?,
            )),
        }
    }

    /// Token text for this reference as seen from `anchor`; `#REF!` if it
    /// falls off the grid.
    pub fn render(&self, origin: CellRef, anchor: CellRef) -> String {
        match (self, self.resolve(origin, anchor)) {
            (Reference::Cell(p), Some(Resolved::Cell(c))) => p.render(c),
            (Reference::Range(pa, pb), Some(Resolved::Range(a, b))) => {
                format!("{}:{}", pa.render(a), pb.render(b))
            }
            _ => "#REF!".to_string(),
        }
    }
}

impl Resolved {
    /// Every covered cell, row-major, with both axes sorted.
    pub fn cells(&self) -> Vec<CellRef> {
        match *self {
            Resolved::Cell(c) => vec![c],
            Resolved::Range(a, b) => CellRef::rect(a, b).collect(),
        }
    }
}
