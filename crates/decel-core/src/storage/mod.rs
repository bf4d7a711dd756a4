//! On-disk representation of a table.
//!
//! A saved table is one JSON object with two fields: `csv`, the stored
//! value of every cell in the bounding rectangle, and `formulae`, the root
//! formulas with the cells they were filled into.

mod csv;
mod document;

pub(crate) use csv::looks_numeric;
pub use csv::{parse_field, read_payload, write_display, write_payload};
pub use document::{
    DocumentRecord, FormulaRecord, decode_document, encode_document, parse_document,
    write_document,
};
