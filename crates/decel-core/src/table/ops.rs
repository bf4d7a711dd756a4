use super::Table;
use crate::error::Result;
use crate::storage::looks_numeric;
use decel_engine::engine::{
    CellFormula, CellRef, ChildFormula, Formula, Value, contains_reference, evaluate_literal,
};
use std::rc::Rc;

impl Table {
    /// Store a literal value, replacing any formula at `cell`.
    pub fn set_value(&mut self, cell: CellRef, value: Value) {
        self.release_dependencies(cell);
        self.formulas.remove(&cell);
        if value.is_empty() {
            self.values.remove(&cell);
        } else {
            self.values.insert(cell, value);
        }
        self.mark_changed(cell);
    }

    /// Install a root formula at `cell` and evaluate it immediately.
    ///
    /// Fails without touching the grid if a reference token cannot be decoded.
    pub fn set_formula(&mut self, cell: CellRef, text: &str) -> Result<()> {
        let formula = Formula::new(cell, text)?;
        self.install_formula(cell, CellFormula::Root(Rc::new(formula)));
        Ok(())
    }

    /// Install a filled copy of a root formula at `cell`.
    pub fn attach_child_formula(&mut self, cell: CellRef, child: ChildFormula) {
        let child = if child.anchor() == cell {
            child
        } else {
            log::debug!(
                "re-anchoring child of {} from {} to {}",
                child.root().origin(),
                child.anchor(),
                cell
            );
            child.root().make_child(cell)
        };
        self.install_formula(cell, CellFormula::Child(child));
    }

    /// Interpret user input for `cell`.
    ///
    /// Text with a leading `=` or containing a cell reference becomes a
    /// formula. Otherwise it is evaluated as a literal expression, and kept
    /// as raw text if that fails.
    pub fn set_text_value(&mut self, cell: CellRef, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.clear_cell(cell);
            return;
        }

        let explicit = trimmed.strip_prefix('=').map(str::trim);
        if explicit.is_some() || contains_reference(trimmed) {
            let source = explicit.unwrap_or(trimmed);
            match self.set_formula(cell, source) {
                Ok(()) => return,
                Err(e) => log::debug!("{}: storing '{}' as text: {}", cell, trimmed, e),
            }
            self.set_value(cell, Value::text(trimmed));
            return;
        }

        let value = match evaluate_literal(trimmed, &self.bindings) {
            Ok(Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(n) if looks_numeric(s.trim()) => Value::Number(n),
                _ => Value::Text(s),
            },
            // A list literal has no CSV form of its own; keep what was typed.
            Ok(Value::List(_)) | Ok(Value::Error(_)) | Ok(Value::Empty) | Err(_) => {
                Value::text(trimmed)
            }
            Ok(value) => value,
        };
        self.set_value(cell, value);
    }

    /// Remove any literal or formula at `cell`.
    pub fn clear_cell(&mut self, cell: CellRef) {
        self.set_value(cell, Value::Empty);
    }

    /// Copy `source` over the inclusive rectangle `start..=end`.
    ///
    /// A formula source is filled as children of its root, so references
    /// shift relative to each target. A literal source is copied as is.
    /// Returns the number of cells written.
    pub fn fill(&mut self, source: CellRef, start: CellRef, end: CellRef) -> usize {
        let targets: Vec<CellRef> = CellRef::rect(start, end)
            .filter(|cell| *cell != source)
            .collect();

        match self.formulas.get(&source).map(|f| Rc::clone(f.root())) {
            Some(root) => {
                for &target in &targets {
                    if target == root.origin() {
                        self.install_formula(target, CellFormula::Root(Rc::clone(&root)));
                    } else {
                        self.install_formula(target, CellFormula::Child(root.make_child(target)));
                    }
                }
            }
            None => {
                let value = self.stored_value(source);
                for &target in &targets {
                    self.set_value(target, value.clone());
                }
            }
        }
        targets.len()
    }

    fn install_formula(&mut self, cell: CellRef, formula: CellFormula) {
        self.release_dependencies(cell);
        self.register_dependencies(cell, formula.dependent_coordinates());
        self.formulas.insert(cell, formula);
        let value = self.get_value(cell);
        self.values.insert(cell, value);
        self.mark_changed(cell);
    }
}
