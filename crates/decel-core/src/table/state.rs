use decel_engine::engine::{Bindings, CellFormula, CellRef, Value};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A sparse grid of literal values and formula-backed cells.
///
/// A cell holds at most one of a literal or a formula. Formula cells also
/// keep their last computed value so the grid can be exported without
/// evaluating anything.
pub struct Table {
    /// Literal values and the stored results of formula cells.
    pub(crate) values: HashMap<CellRef, Value>,
    pub(crate) formulas: HashMap<CellRef, CellFormula>,
    /// Reverse dependency map: cell -> cells whose formulas read it
    pub(crate) dependents: HashMap<CellRef, HashSet<CellRef>>,
    /// Forward map: formula cell -> cells it reads
    pub(crate) precedents: HashMap<CellRef, Vec<CellRef>>,
    /// Cells changed since the last propagation pass
    pub(crate) changed: BTreeSet<CellRef>,
    pub(crate) bindings: Bindings,
    pub(crate) filename: Option<PathBuf>,
    pub(crate) modified: bool,
    /// Formula cells currently being evaluated, for re-entrancy detection
    pub(crate) evaluating: RefCell<HashSet<CellRef>>,
}

impl Table {
    /// Create an empty table with the builtin function library.
    pub fn new() -> Self {
        Self::with_bindings(Bindings::with_builtins())
    }

    /// Create an empty table evaluating formulas against `bindings`.
    pub fn with_bindings(bindings: Bindings) -> Self {
        Table {
            values: HashMap::new(),
            formulas: HashMap::new(),
            dependents: HashMap::new(),
            precedents: HashMap::new(),
            changed: BTreeSet::new(),
            bindings,
            filename: None,
            modified: false,
            evaluating: RefCell::new(HashSet::new()),
        }
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Replace the function library. Every formula is scheduled for
    /// recomputation on the next [`Table::propagate`].
    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.bindings = bindings;
        self.changed.extend(self.formulas.keys().copied());
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn has_filename(&self) -> bool {
        self.filename.is_some()
    }

    pub fn set_filename(&mut self, path: impl Into<PathBuf>) {
        self.filename = Some(path.into());
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.formulas.is_empty()
    }

    /// Inclusive `(max_row, max_col)` over every occupied cell, or `None`
    /// for an empty table.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.occupied().fold(None, |acc, cell| match acc {
            None => Some((cell.row, cell.col)),
            Some((r, c)) => Some((r.max(cell.row), c.max(cell.col))),
        })
    }

    /// Occupied cells in row-major order.
    pub fn cells(&self) -> Vec<CellRef> {
        let set: BTreeSet<CellRef> = self.occupied().collect();
        set.into_iter().collect()
    }

    pub fn is_formula(&self, cell: CellRef) -> bool {
        self.formulas.contains_key(&cell)
    }

    /// Cells whose formulas read `cell` directly.
    pub fn dependents_of(&self, cell: CellRef) -> Vec<CellRef> {
        let mut out: Vec<CellRef> = self
            .dependents
            .get(&cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// Cells read by the formula at `cell`.
    pub fn precedents_of(&self, cell: CellRef) -> Vec<CellRef> {
        self.precedents.get(&cell).cloned().unwrap_or_default()
    }

    /// Cells changed since the last propagation pass.
    pub fn pending_changes(&self) -> Vec<CellRef> {
        self.changed.iter().copied().collect()
    }

    fn occupied(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.values.keys().copied().chain(
            self.formulas
                .keys()
                .copied()
                .filter(|cell| !self.values.contains_key(cell)),
        )
    }

    pub(crate) fn mark_changed(&mut self, cell: CellRef) {
        self.changed.insert(cell);
        self.modified = true;
    }

    /// Record that `cell` reads every cell in `sources`.
    pub(crate) fn register_dependencies(&mut self, cell: CellRef, sources: Vec<CellRef>) {
        for source in &sources {
            self.dependents.entry(*source).or_default().insert(cell);
        }
        self.precedents.insert(cell, sources);
    }

    /// Drop every edge registered for the formula at `cell`.
    pub(crate) fn release_dependencies(&mut self, cell: CellRef) {
        let Some(sources) = self.precedents.remove(&cell) else {
            return;
        };
        for source in sources {
            if let Some(set) = self.dependents.get_mut(&source) {
                set.remove(&cell);
                if set.is_empty() {
                    self.dependents.remove(&source);
                }
            }
        }
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("cells", &self.len())
            .field("formulas", &self.formulas.len())
            .field("filename", &self.filename)
            .field("modified", &self.modified)
            .finish()
    }
}
