//! In-memory graph store backed by petgraph.
//!
//! Nodes carry their string id, edges carry their label. A DashMap node index
//! gives O(1) identity lookups, and an edge index keyed by
//! `(node1, label, node2)` makes merges idempotent. All data is lost on exit.

use std::sync::RwLock;

use dashmap::DashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};

use crate::error::GraphError;
use crate::table::Triple;

use super::{GraphResult, GraphStore, MergeOutcome};

type EdgeKey = (String, String, String);

/// Merge-on-identity graph held entirely in memory.
pub struct MemGraph {
    /// Nodes are ids, edges are labels.
    graph: RwLock<DiGraph<String, String>>,
    /// Node id → NodeIndex.
    node_index: DashMap<String, NodeIndex>,
    /// (node1, label, node2) → EdgeIndex.
    edge_index: DashMap<EdgeKey, EdgeIndex>,
}

impl MemGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
            edge_index: DashMap::new(),
        }
    }

    /// Find or create the node for `id`. Caller holds the write lock.
    fn ensure_node(&self, graph: &mut DiGraph<String, String>, id: &str) -> (NodeIndex, bool) {
        if let Some(idx) = self.node_index.get(id) {
            return (*idx.value(), false);
        }
        let idx = graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        (idx, true)
    }

    /// Check if a node exists.
    #[cfg(test)]
    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Check if the labeled edge exists.
    #[cfg(test)]
    pub fn has_edge(&self, triple: &Triple) -> bool {
        self.edge_index.contains_key(&edge_key(triple))
    }
}

fn edge_key(t: &Triple) -> EdgeKey {
    (t.node1.clone(), t.label.clone(), t.node2.clone())
}

impl GraphStore for MemGraph {
    fn merge_triple(&self, triple: &Triple) -> GraphResult<MergeOutcome> {
        let mut graph = self.graph.write().map_err(|_| GraphError::LockPoisoned)?;

        let (src, src_new) = self.ensure_node(&mut graph, &triple.node1);
        let (dst, dst_new) = self.ensure_node(&mut graph, &triple.node2);

        let key = edge_key(triple);
        let edge_created = if self.edge_index.contains_key(&key) {
            false
        } else {
            let idx = graph.add_edge(src, dst, triple.label.clone());
            self.edge_index.insert(key, idx);
            true
        };

        Ok(MergeOutcome {
            nodes_created: usize::from(src_new) + usize::from(dst_new),
            edge_created,
        })
    }

    fn node_ids(&self) -> GraphResult<Vec<String>> {
        let graph = self.graph.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(graph.node_weights().cloned().collect())
    }

    fn triples(&self) -> GraphResult<Vec<Triple>> {
        let graph = self.graph.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(graph
            .edge_indices()
            .filter_map(|ei| {
                let (src, dst) = graph.edge_endpoints(ei)?;
                Some(Triple {
                    node1: graph.node_weight(src)?.clone(),
                    node2: graph.node_weight(dst)?.clone(),
                    label: graph.edge_weight(ei)?.clone(),
                })
            })
            .collect())
    }

    fn node_count(&self) -> GraphResult<usize> {
        Ok(self.node_index.len())
    }

    fn edge_count(&self) -> GraphResult<usize> {
        Ok(self.edge_index.len())
    }
}

impl Default for MemGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemGraph")
            .field("nodes", &self.node_index.len())
            .field("edges", &self.edge_index.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_creates_nodes_and_edge() {
        let g = MemGraph::new();
        let outcome = g.merge_triple(&Triple::new("R1", "Robot", "type")).unwrap();
        assert_eq!(outcome.nodes_created, 2);
        assert!(outcome.edge_created);
        assert!(g.has_node("R1"));
        assert!(g.has_node("Robot"));
        assert_eq!(g.edge_count().unwrap(), 1);
    }

    #[test]
    fn remerge_is_a_noop() {
        let g = MemGraph::new();
        let t = Triple::new("I1", "R1", "performedBy");
        g.merge_triple(&t).unwrap();
        let again = g.merge_triple(&t).unwrap();
        assert_eq!(again, MergeOutcome::default());
        assert_eq!(g.node_count().unwrap(), 2);
        assert_eq!(g.edge_count().unwrap(), 1);
    }

    #[test]
    fn same_endpoints_different_label_is_a_new_edge() {
        let g = MemGraph::new();
        g.merge_triple(&Triple::new("I1", "R1", "performedBy")).unwrap();
        let outcome = g.merge_triple(&Triple::new("I1", "R1", "objectOfAction")).unwrap();
        assert_eq!(outcome.nodes_created, 0);
        assert!(outcome.edge_created);
        assert_eq!(g.edge_count().unwrap(), 2);
    }

    #[test]
    fn self_loop_creates_one_node() {
        let g = MemGraph::new();
        let outcome = g.merge_triple(&Triple::new("A", "A", "sameAs")).unwrap();
        assert_eq!(outcome.nodes_created, 1);
        assert!(g.has_edge(&Triple::new("A", "A", "sameAs")));
    }

    #[test]
    fn node_ids_in_merge_order() {
        let g = MemGraph::new();
        g.merge_triple(&Triple::new("B", "A", "L")).unwrap();
        g.merge_triple(&Triple::new("C", "A", "L")).unwrap();
        assert_eq!(g.node_ids().unwrap(), vec!["B", "A", "C"]);
    }

    #[test]
    fn concurrent_merges() {
        use std::sync::Arc;
        let g = Arc::new(MemGraph::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let g = Arc::clone(&g);
                std::thread::spawn(move || {
                    g.merge_triple(&Triple::new(format!("I{i}"), "R1", "performedBy"))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(g.node_count().unwrap(), 17);
        assert_eq!(g.edge_count().unwrap(), 16);
    }
}
