use super::Table;
use decel_engine::engine::{CellFormula, CellRef, CellSource, DependencyGraph, Propagation, Value};

/// Outcome of one [`Table::propagate`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PropagationReport {
    /// Formula cells recomputed, in the order they were evaluated.
    pub recomputed: Vec<CellRef>,
    /// Formula cells left holding a circular reference error.
    pub cyclic: Vec<CellRef>,
}

pub(crate) fn circular_error(cell: CellRef) -> Value {
    Value::Error(format!("circular reference at {}", cell))
}

/// Reads made by a formula while it evaluates.
///
/// Other formula cells answer with their stored value, which
/// [`Table::propagate`] refreshes in dependency order, so one evaluation
/// never recurses into another. Reading a cell that is itself being
/// evaluated is a circular reference.
impl CellSource for Table {
    fn value(&self, cell: CellRef) -> Value {
        if self.evaluating.borrow().contains(&cell) {
            return circular_error(cell);
        }
        self.stored_value(cell)
    }
}

impl Table {
    /// Current value of `cell`.
    ///
    /// A formula cell is evaluated on read against the stored values of the
    /// cells it references. A formula that reads itself yields a circular
    /// reference error.
    pub fn get_value(&self, cell: CellRef) -> Value {
        let Some(formula) = self.formulas.get(&cell) else {
            return self.stored_value(cell);
        };

        let entered = self.evaluating.borrow_mut().insert(cell);
        if !entered {
            return circular_error(cell);
        }
        let value = formula.value(self, &self.bindings);
        self.evaluating.borrow_mut().remove(&cell);
        value
    }

    /// The value last stored for `cell`, without evaluating anything.
    pub fn stored_value(&self, cell: CellRef) -> Value {
        self.values.get(&cell).cloned().unwrap_or_default()
    }

    /// Values of the inclusive rectangle between two corners, row-major.
    pub fn get_range(&self, start: CellRef, end: CellRef) -> Vec<Value> {
        CellSource::range(self, start, end)
    }

    pub fn get_formula(&self, cell: CellRef) -> Option<&CellFormula> {
        self.formulas.get(&cell)
    }

    /// What a user would see when editing `cell`: the formula text as it
    /// reads from this cell, or the literal value.
    pub fn formula_text(&self, cell: CellRef) -> String {
        match self.formulas.get(&cell) {
            Some(formula) => formula.display_text().to_string(),
            None => self.stored_value(cell).to_string(),
        }
    }

    /// Recompute every formula downstream of the cells changed since the
    /// last pass, each exactly once, in dependency order.
    pub fn propagate(&mut self) -> PropagationReport {
        let changed = std::mem::take(&mut self.changed);
        if changed.is_empty() {
            return PropagationReport::default();
        }

        let mut graph = DependencyGraph::new();
        for cell in changed {
            graph.mark_changed(cell, |c| self.dependents_of(c));
        }
        let Propagation { order, cyclic } = graph.order();

        let mut report = PropagationReport::default();
        for cell in order {
            if !self.formulas.contains_key(&cell) {
                continue;
            }
            let value = self.get_value(cell);
            self.values.insert(cell, value);
            report.recomputed.push(cell);
        }
        for cell in cyclic {
            if !self.formulas.contains_key(&cell) {
                continue;
            }
            self.values.insert(cell, circular_error(cell));
            report.cyclic.push(cell);
        }
        graph.shake();

        log::debug!(
            "propagated {} cells ({} circular)",
            report.recomputed.len(),
            report.cyclic.len()
        );
        report
    }

    /// Schedule every formula cell and propagate.
    pub fn force_refresh(&mut self) -> PropagationReport {
        let cells: Vec<CellRef> = self.formulas.keys().copied().collect();
        self.changed.extend(cells);
        self.propagate()
    }
}
