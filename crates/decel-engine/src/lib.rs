//! decel_engine - formula translation, evaluation and dependency ordering.

pub(crate) mod builtins;
pub mod engine;

#[cfg(test)]
mod tests {
    use crate::engine::*;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Minimal grid: literals only, formulas evaluated on read.
    #[derive(Default)]
    struct MapSource {
        literals: HashMap<CellRef, Value>,
        formulas: HashMap<CellRef, CellFormula>,
        bindings: Bindings,
    }

    impl CellSource for MapSource {
        fn value(&self, cell: CellRef) -> Value {
            if let Some(f) = self.formulas.get(&cell) {
                return f.value(self, &self.bindings);
            }
            self.literals.get(&cell).cloned().unwrap_or_default()
        }
    }

    fn cell(name: &str) -> CellRef {
        CellRef::from_str(name).unwrap()
    }

    #[test]
    fn test_from_str_single_letter_columns() {
        assert_eq!(cell("A1"), CellRef::new(0, 0));
        assert_eq!(cell("B1"), CellRef::new(0, 1));
        assert_eq!(cell("Z1"), CellRef::new(0, 25));
    }

    #[test]
    fn test_from_str_multi_letter_columns() {
        assert_eq!(cell("AA1").col, 26);
        assert_eq!(cell("AB1").col, 27);
        assert_eq!(cell("AZ1").col, 51);
        assert_eq!(cell("BA1").col, 52);
    }

    #[test]
    fn test_from_str_invalid_inputs() {
        assert!(CellRef::from_str("").is_none());
        assert!(CellRef::from_str("123").is_none());
        assert!(CellRef::from_str("ABC").is_none());
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("1A").is_none());
        assert!(CellRef::from_str("A 1").is_none());
    }

    #[test]
    fn test_display_round_trips() {
        for name in ["A1", "Z9", "AA10", "ZZ100", "AAA1"] {
            assert_eq!(cell(name).to_string(), name);
        }
    }

    #[test]
    fn test_filled_column_reads_neighbours() {
        let mut src = MapSource {
            bindings: Bindings::with_builtins(),
            ..Default::default()
        };
        for row in 0..4 {
            src.literals
                .insert(CellRef::new(row, 0), Value::Number(row as f64 + 1.0));
        }
        // B1 = A1 * 10, filled down to B4
        let root = Rc::new(Formula::new(cell("B1"), "A1 * 10").unwrap());
        src.formulas.insert(cell("B1"), CellFormula::Root(root.clone()));
        for row in 1..4 {
            let anchor = CellRef::new(row, 1);
            src.formulas
                .insert(anchor, CellFormula::Child(root.make_child(anchor)));
        }

        assert_eq!(src.value(cell("B3")), Value::Number(30.0));
        assert_eq!(src.formulas[&cell("B4")].display_text(), "A4 * 10");

        // C1 = SUM($B$1:B1), filled down: running total
        let total = Rc::new(Formula::new(cell("C1"), "SUM($B$1:B1)").unwrap());
        src.formulas.insert(cell("C1"), CellFormula::Root(total.clone()));
        let c4 = cell("C4");
        src.formulas
            .insert(c4, CellFormula::Child(total.make_child(c4)));
        assert_eq!(src.value(c4), Value::Number(100.0));
        assert_eq!(src.formulas[&c4].display_text(), "SUM($B$1:B4)");
    }

    #[test]
    fn test_locked_tokens_identical_in_every_child() {
        let root = Rc::new(Formula::new(cell("C3"), "$A$1 + B2 + $A2 + A$2").unwrap());
        for (row, col) in [(0, 5), (7, 2), (3, 9)] {
            let child = root.make_child(CellRef::new(row + 2, col));
            let text = child.display_text();
            assert!(text.starts_with("$A$1 + "), "{text}");
        }
        let child = root.make_child(cell("D5"));
        assert_eq!(child.display_text(), "$A$1 + C4 + $A4 + B$2");
    }
}
