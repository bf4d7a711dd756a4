//! Per-pass dependency graph.
//!
//! Built from the cells changed since the last pass, ordered, walked, and
//! then shaken empty. Nodes are cell coordinates and edges are stored as
//! coordinate sets, so clearing it is just dropping two maps.
//!
//! Ordering is a Kahn topological sort. Each node is emitted at most once;
//! nodes that sit on a cycle, or downstream of one, are reported separately
//! instead of being recursed into.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::cell_ref::CellRef;

/// Result of ordering one propagation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Propagation {
    /// Cells in a safe recomputation order.
    pub order: Vec<CellRef>,
    /// Cells that could not be ordered because of a circular reference.
    pub cyclic: Vec<CellRef>,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// source -> cells that must recompute after it
    edges: BTreeMap<CellRef, BTreeSet<CellRef>>,
    expanded: BTreeSet<CellRef>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, cell: CellRef) {
        self.edges.entry(cell).or_default();
    }

    /// Add `from -> to`. Duplicate edges collapse.
    pub fn add_edge(&mut self, from: CellRef, to: CellRef) {
        self.edges.entry(from).or_default().insert(to);
        self.edges.entry(to).or_default();
    }

    /// Record that `cell` changed: add an edge to each of its dependents,
    /// and onwards through their dependents. Each cell is expanded once.
    pub fn mark_changed<F, I>(&mut self, cell: CellRef, dependents_of: F)
    where
        F: Fn(CellRef) -> I,
        I: IntoIterator<Item = CellRef>,
    {
        self.add_node(cell);
        let mut stack = vec![cell];
        while let Some(current) = stack.pop() {
            if !self.expanded.insert(current) {
                continue;
            }
            for dependent in dependents_of(current) {
                self.add_edge(current, dependent);
                if !self.expanded.contains(&dependent) {
                    stack.push(dependent);
                }
            }
        }
    }

    pub fn contains(&self, cell: &CellRef) -> bool {
        self.edges.contains_key(cell)
    }

    pub fn has_edge(&self, from: &CellRef, to: &CellRef) -> bool {
        self.edges.get(from).is_some_and(|out| out.contains(to))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Nodes with no incoming edge.
    pub fn roots(&self) -> Vec<CellRef> {
        let targets: BTreeSet<&CellRef> = self.edges.values().flatten().collect();
        self.edges
            .keys()
            .filter(|k| !targets.contains(k))
            .copied()
            .collect()
    }

    pub fn order(&self) -> Propagation {
        let mut indegree: BTreeMap<CellRef, usize> =
            self.edges.keys().map(|k| (*k, 0)).collect();
        for targets in self.edges.values() {
            for t in targets {
                *indegree.entry(*t).or_default() += 1;
            }
        }

        let mut queue: VecDeque<CellRef> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(k, _)| *k)
            .collect();
        let mut order = Vec::with_capacity(indegree.len());

        while let Some(cell) = queue.pop_front() {
            order.push(cell);
            if let Some(targets) = self.edges.get(&cell) {
                for t in targets {
                    let Some(d) = indegree.get_mut(t) else {
                        continue;
                    };
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(*t);
                    }
                }
            }
        }

        let cyclic: Vec<CellRef> = indegree
            .into_iter()
            .filter(|(_, d)| *d > 0)
            .map(|(k, _)| k)
            .collect();
        if !cyclic.is_empty() {
            log::warn!("circular reference among {} cell(s)", cyclic.len());
        }

        Propagation { order, cyclic }
    }

    /// Drop all nodes and edges.
    pub fn shake(&mut self) {
        self.edges.clear();
        self.expanded.clear();
    }
}
