//! Read-only adjacency index over one triple table.
//!
//! Built once per table. Keeps row positions keyed by `node1` and by `node2`,
//! so `(node1, label) -> node2` and `(label, node2) -> node1` lookups touch only
//! the rows adjacent to the node instead of rescanning the whole table.
//! Every lookup yields matches in table order, which is what makes
//! "first match wins" well defined.

use std::collections::HashMap;

use crate::table::{Triple, TripleTable};

/// Adjacency index over an owned copy of the table rows.
#[derive(Debug, Clone, Default)]
pub struct TripleIndex {
    triples: Vec<Triple>,
    /// node1 → positions of rows with that node1, ascending.
    by_node1: HashMap<String, Vec<usize>>,
    /// node2 → positions of rows with that node2, ascending.
    by_node2: HashMap<String, Vec<usize>>,
}

impl TripleIndex {
    /// Index a table, taking ownership of its rows.
    pub fn new(table: TripleTable) -> Self {
        let triples = table.into_triples();
        let mut by_node1: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_node2: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, t) in triples.iter().enumerate() {
            by_node1.entry(t.node1.clone()).or_default().push(pos);
            by_node2.entry(t.node2.clone()).or_default().push(pos);
        }

        tracing::debug!(
            rows = triples.len(),
            sources = by_node1.len(),
            targets = by_node2.len(),
            "built triple index"
        );

        Self {
            triples,
            by_node1,
            by_node2,
        }
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// All rows in table order.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Rows with this `node1`, in table order.
    pub fn rows_from(&self, node1: &str) -> impl Iterator<Item = &Triple> {
        self.by_node1
            .get(node1)
            .into_iter()
            .flatten()
            .map(|&pos| &self.triples[pos])
    }

    /// Rows with this `node2`, in table order.
    pub fn rows_to(&self, node2: &str) -> impl Iterator<Item = &Triple> {
        self.by_node2
            .get(node2)
            .into_iter()
            .flatten()
            .map(|&pos| &self.triples[pos])
    }

    /// `node2` values of rows `(node1, label, _)`, in table order.
    pub fn objects(&self, node1: &str, label: &str) -> impl Iterator<Item = &str> {
        self.rows_from(node1)
            .filter(move |t| t.label == label)
            .map(|t| t.node2.as_str())
    }

    /// `node1` values of rows `(_, label, node2)`, in table order.
    pub fn subjects(&self, label: &str, node2: &str) -> impl Iterator<Item = &str> {
        self.rows_to(node2)
            .filter(move |t| t.label == label)
            .map(|t| t.node1.as_str())
    }

    /// `node1` values of every row pointing at `node2`, whatever the label.
    pub fn holders_of(&self, node2: &str) -> impl Iterator<Item = &str> {
        self.rows_to(node2).map(|t| t.node1.as_str())
    }

    /// First `node2` of `(node1, label, _)` in table order.
    pub fn first_object(&self, node1: &str, label: &str) -> Option<&str> {
        self.objects(node1, label).next()
    }

    /// First `node1` of `(_, label, node2)` in table order.
    pub fn first_subject(&self, label: &str, node2: &str) -> Option<&str> {
        self.subjects(label, node2).next()
    }
}

impl From<TripleTable> for TripleIndex {
    fn from(table: TripleTable) -> Self {
        Self::new(table)
    }
}
