//! Root and child formulas.
//!
//! A root [`Formula`] owns its text and the decoded reference tokens. A
//! [`ChildFormula`] is produced by fill/paste: it sits at a different cell
//! but shares the root's tokens, resolving them for its own anchor.
//! [`CellFormula`] is what a grid stores per cell and is the single dispatch
//! point over the two.

use std::cell::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use super::bindings::Bindings;
use super::cell_ref::CellRef;
use super::eval::evaluate;
use super::reference::{Reference, ReferenceDecodeError, Resolved, scan_references};
use super::value::Value;

/// Read access to cell values, implemented by the grid.
pub trait CellSource {
    fn value(&self, cell: CellRef) -> Value;

    /// Values of the inclusive rectangle, row-major, axes sorted.
    fn range(&self, start: CellRef, end: CellRef) -> Vec<Value> {
        CellRef::rect(start, end).map(|c| self.value(c)).collect()
    }
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    reference: Reference,
}

fn placeholder(index: usize) -> String {
    format!("__r{}", index)
}

#[derive(Debug)]
pub struct Formula {
    origin: CellRef,
    text: String,
    /// Unique tokens, longest text first.
    tokens: Vec<Token>,
    /// `text` with every token replaced by its placeholder.
    template: String,
}

impl Formula {
    /// Decode `text` as a formula declared at `origin`.
    pub fn new(origin: CellRef, text: &str) -> Result<Formula, ReferenceDecodeError> {
        let spans = scan_references(text);

        let mut tokens: Vec<Token> = Vec::new();
        for (_, token) in &spans {
            if tokens.iter().any(|t| t.text == *token) {
                continue;
            }
            tokens.push(Token {
                text: token.to_string(),
                reference: Reference::parse(token)?,
            });
        }
        // Longest first so a short token never claims part of a longer one.
        tokens.sort_by(|a, b| b.text.len().cmp(&a.text.len()));

        let slots: HashMap<&str, usize> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.text.as_str(), i))
            .collect();
        let template = rewrite(text, &spans, |token| match slots.get(token) {
            Some(&index) => placeholder(index),
            None => token.to_string(),
        });

        Ok(Formula {
            origin,
            text: text.to_string(),
            tokens,
            template,
        })
    }

    pub fn origin(&self) -> CellRef {
        self.origin
    }

    /// The raw formula text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Roots always display their own text verbatim.
    pub fn display_text(&self) -> &str {
        &self.text
    }

    /// Formula text with references replaced by evaluation placeholders.
    pub fn substituted_text(&self) -> &str {
        &self.template
    }

    /// Token texts, longest first.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|t| t.text.as_str())
    }

    pub fn is_range_token(&self, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.text == token && t.reference.is_range())
    }

    /// Every cell this formula reads when evaluated at `anchor`, sorted.
    pub fn dependent_coordinates(&self, anchor: CellRef) -> Vec<CellRef> {
        let mut cells = BTreeSet::new();
        for token in &self.tokens {
            if let Some(resolved) = token.reference.resolve(self.origin, anchor) {
                cells.extend(resolved.cells());
            }
        }
        cells.into_iter().collect()
    }

    /// Evaluate at `anchor`. Failures come back as [`Value::Error`].
    pub fn value_at(&self, anchor: CellRef, source: &dyn CellSource, bindings: &Bindings) -> Value {
        let mut locals = HashMap::with_capacity(self.tokens.len());
        for (index, token) in self.tokens.iter().enumerate() {
            let value = match token.reference.resolve(self.origin, anchor) {
                Some(Resolved::Cell(cell)) => source.value(cell),
                Some(Resolved::Range(start, end)) => Value::List(source.range(start, end)),
                None => return Value::Error(self.text_at(anchor)),
            };
            locals.insert(placeholder(index), value);
        }

        match evaluate(&self.template, &locals, bindings) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("formula '{}' at {} failed: {}", self.text, anchor, e);
                Value::Error(self.template.clone())
            }
        }
    }

    /// Formula text with each token rewritten for `anchor`, lock markers kept.
    pub fn text_at(&self, anchor: CellRef) -> String {
        if anchor == self.origin {
            return self.text.clone();
        }
        let spans = scan_references(&self.text);
        rewrite(&self.text, &spans, |token| {
            self.tokens
                .iter()
                .find(|t| t.text == token)
                .map(|t| t.reference.render(self.origin, anchor))
                .unwrap_or_else(|| token.to_string())
        })
    }

    pub fn make_child(self: &Rc<Self>, anchor: CellRef) -> ChildFormula {
        ChildFormula {
            root: Rc::clone(self),
            anchor,
            display: OnceCell::new(),
        }
    }
}

/// Replace each scanned span in one pass.
fn rewrite<F>(text: &str, spans: &[(std::ops::Range<usize>, &str)], mut replace: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (range, token) in spans {
        out.push_str(&text[last..range.start]);
        out.push_str(&replace(token));
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}

/// A formula filled from a root to another cell.
#[derive(Debug, Clone)]
pub struct ChildFormula {
    root: Rc<Formula>,
    anchor: CellRef,
    display: OnceCell<String>,
}

impl ChildFormula {
    pub fn root(&self) -> &Rc<Formula> {
        &self.root
    }

    pub fn anchor(&self) -> CellRef {
        self.anchor
    }

    pub fn value(&self, source: &dyn CellSource, bindings: &Bindings) -> Value {
        self.root.value_at(self.anchor, source, bindings)
    }

    pub fn dependent_coordinates(&self) -> Vec<CellRef> {
        self.root.dependent_coordinates(self.anchor)
    }

    /// The root's text as seen from this child's cell; computed once.
    pub fn display_text(&self) -> &str {
        self.display.get_or_init(|| self.root.text_at(self.anchor))
    }
}

/// The formula occupying a grid cell.
#[derive(Debug, Clone)]
pub enum CellFormula {
    Root(Rc<Formula>),
    Child(ChildFormula),
}

impl CellFormula {
    pub fn root(&self) -> &Rc<Formula> {
        match self {
            CellFormula::Root(f) => f,
            CellFormula::Child(c) => c.root(),
        }
    }

    /// The cell this formula is evaluated for.
    pub fn anchor(&self) -> CellRef {
        match self {
            CellFormula::Root(f) => f.origin(),
            CellFormula::Child(c) => c.anchor(),
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, CellFormula::Child(_))
    }

    pub fn value(&self, source: &dyn CellSource, bindings: &Bindings) -> Value {
        match self {
            CellFormula::Root(f) => f.value_at(f.origin(), source, bindings),
            CellFormula::Child(c) => c.value(source, bindings),
        }
    }

    pub fn display_text(&self) -> &str {
        match self {
            CellFormula::Root(f) => f.display_text(),
            CellFormula::Child(c) => c.display_text(),
        }
    }

    pub fn dependent_coordinates(&self) -> Vec<CellRef> {
        match self {
            CellFormula::Root(f) => f.dependent_coordinates(f.origin()),
            CellFormula::Child(c) => c.dependent_coordinates(),
        }
    }
}
