//! The JSON envelope of a saved table.

use super::csv::{read_payload, write_payload};
use crate::error::{DecelError, Result};
use crate::table::Table;
use decel_engine::engine::{Bindings, CellFormula, CellRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

/// A saved table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub csv: String,
    /// Root formulas keyed by the A1 name of their origin.
    #[serde(default)]
    pub formulae: BTreeMap<String, FormulaRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaRecord {
    /// `[row, col]` of the formula's origin.
    pub location: [usize; 2],
    pub formula: String,
    /// Comma-separated A1 names of the cells filled from this formula.
    #[serde(default)]
    pub children: String,
}

impl FormulaRecord {
    /// The root's cell. It must be addressable by an A1 name.
    fn origin(&self) -> Result<CellRef> {
        let cell = CellRef::new(self.location[0], self.location[1]);
        if CellRef::from_str(&cell.to_string()) != Some(cell) {
            return Err(DecelError::InvalidDocument(format!(
                "location [{}, {}] is out of range",
                self.location[0], self.location[1]
            )));
        }
        Ok(cell)
    }

    fn child_cells(&self) -> Result<Vec<CellRef>> {
        self.children
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                CellRef::from_str(name).ok_or_else(|| {
                    DecelError::InvalidDocument(format!("bad child cell '{}'", name))
                })
            })
            .collect()
    }
}

pub fn parse_document(content: &str) -> Result<DocumentRecord> {
    Ok(serde_json::from_str(content)?)
}

pub fn write_document(record: &DocumentRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Capture `table` as a record.
///
/// Each root formula is written once with its children listed against it.
/// A child whose root no longer sits at its origin is written as a root of
/// its own, using the text it displays.
pub fn encode_document(table: &Table) -> Result<DocumentRecord> {
    let mut formulae: BTreeMap<String, FormulaRecord> = BTreeMap::new();
    let mut children: BTreeMap<CellRef, Vec<CellRef>> = BTreeMap::new();

    for cell in table.cells() {
        let Some(formula) = table.get_formula(cell) else {
            continue;
        };
        match formula {
            CellFormula::Root(root) => {
                formulae.insert(
                    cell.to_string(),
                    FormulaRecord {
                        location: [cell.row, cell.col],
                        formula: root.text().to_string(),
                        children: String::new(),
                    },
                );
            }
            CellFormula::Child(child) => {
                let origin = child.root().origin();
                let attached = matches!(
                    table.get_formula(origin),
                    Some(CellFormula::Root(r)) if Rc::ptr_eq(r, child.root())
                );
                if attached {
                    children.entry(origin).or_default().push(cell);
                } else {
                    log::debug!("{}: root at {} was replaced, saving as root", cell, origin);
                    formulae.insert(
                        cell.to_string(),
                        FormulaRecord {
                            location: [cell.row, cell.col],
                            formula: child.display_text().to_string(),
                            children: String::new(),
                        },
                    );
                }
            }
        }
    }

    for (origin, cells) in children {
        if let Some(record) = formulae.get_mut(&origin.to_string()) {
            record.children = cells
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",");
        }
    }

    Ok(DocumentRecord {
        csv: write_payload(table)?,
        formulae,
    })
}

/// Rebuild a table from `record`, evaluating formulas against `bindings`.
///
/// Any undecodable formula or child cell fails the whole decode.
pub fn decode_document(record: &DocumentRecord, bindings: Bindings) -> Result<Table> {
    let mut table = Table::with_bindings(bindings);
    for (cell, value) in read_payload(&record.csv)? {
        table.values.insert(cell, value);
    }

    for (name, entry) in &record.formulae {
        let origin = entry.origin()?;
        if CellRef::from_str(name) != Some(origin) {
            log::warn!("formula '{}' is stored at {}, using its location", name, origin);
        }
        table.set_formula(origin, &entry.formula)?;
        let root = Rc::clone(
            table
                .get_formula(origin)
                .ok_or_else(|| DecelError::InvalidDocument(format!("lost formula at {}", origin)))?
                .root(),
        );
        for child in entry.child_cells()? {
            table.attach_child_formula(child, root.make_child(child));
        }
    }

    table.force_refresh();
    table.modified = false;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decel_engine::engine::Value;

    fn cell(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    fn sample() -> Table {
        let mut table = Table::new();
        for row in 0..3 {
            table.set_value(CellRef::new(row, 0), Value::Number((row + 1) as f64));
        }
        table.set_value(cell("D1"), Value::text("label"));
        table.set_formula(cell("B1"), "A1 * 2").unwrap();
        table.fill(cell("B1"), cell("B2"), cell("B3"));
        table.set_formula(cell("C1"), "SUM($B$1:B1)").unwrap();
        table.propagate();
        table
    }

    #[test]
    fn test_encode_groups_children_under_root() {
        let record = encode_document(&sample()).unwrap();
        assert_eq!(record.formulae.len(), 2);

        let b1 = &record.formulae["B1"];
        assert_eq!(b1.location, [0, 1]);
        assert_eq!(b1.formula, "A1 * 2");
        assert_eq!(b1.children, "B2,B3");
        assert_eq!(record.formulae["C1"].children, "");
        assert!(record.csv.starts_with("1,2,2,label\n"));
    }

    #[test]
    fn test_json_field_names() {
        let json = write_document(&encode_document(&sample()).unwrap()).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(raw["csv"].is_string());
        assert_eq!(raw["formulae"]["B1"]["location"], serde_json::json!([0, 1]));
        assert_eq!(raw["formulae"]["B1"]["children"], "B2,B3");
    }

    #[test]
    fn test_decode_restores_values_and_formulas() {
        let original = sample();
        let record = encode_document(&original).unwrap();
        let restored = decode_document(&record, Bindings::with_builtins()).unwrap();

        for name in ["A1", "A3", "B1", "B3", "C1", "D1"] {
            assert_eq!(
                restored.get_value(cell(name)),
                original.get_value(cell(name)),
                "{}",
                name
            );
        }
        assert!(restored.get_formula(cell("B3")).unwrap().is_child());
        assert_eq!(restored.formula_text(cell("B3")), "A3 * 2");
        assert!(!restored.is_modified());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let record = encode_document(&sample()).unwrap();
        let restored = decode_document(&record, Bindings::with_builtins()).unwrap();
        assert_eq!(encode_document(&restored).unwrap(), record);
    }

    #[test]
    fn test_orphaned_child_is_saved_as_root() {
        let mut table = sample();
        table.set_value(cell("B1"), Value::Number(0.0));
        let record = encode_document(&table).unwrap();

        assert!(!record.formulae.contains_key("B1"));
        assert_eq!(record.formulae["B3"].formula, "A3 * 2");
        assert_eq!(record.formulae["B3"].location, [2, 1]);
    }

    #[test]
    fn test_decode_rejects_bad_child() {
        let mut record = encode_document(&sample()).unwrap();
        record.formulae.get_mut("B1").unwrap().children = "B2,nope".into();
        assert!(matches!(
            decode_document(&record, Bindings::with_builtins()),
            Err(DecelError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_reference() {
        let record = DocumentRecord {
            csv: String::new(),
            formulae: BTreeMap::from([(
                "A1".to_string(),
                FormulaRecord {
                    location: [0, 0],
                    formula: "B0 + 1".into(),
                    children: String::new(),
                },
            )]),
        };
        assert!(matches!(
            decode_document(&record, Bindings::with_builtins()),
            Err(DecelError::Reference(_))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_location() {
        let json = format!(
            r#"{{"csv": "", "formulae": {{"A1": {{"location": [{}, 0], "formula": "1"}}}}}}"#,
            usize::MAX
        );
        let record = parse_document(&json).unwrap();
        assert!(matches!(
            decode_document(&record, Bindings::with_builtins()),
            Err(DecelError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_children_field_defaults() {
        let record =
            parse_document(r#"{"csv": "2", "formulae": {"B1": {"location": [0, 1], "formula": "A1 + 1"}}}"#)
                .unwrap();
        let table = decode_document(&record, Bindings::with_builtins()).unwrap();
        assert_eq!(table.get_value(cell("B1")), Value::Number(3.0));
    }
}
