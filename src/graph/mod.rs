//! Graph layer: the query-time triple index and the merge-on-identity stores.
//!
//! - **Query index** ([`index::TripleIndex`]): read-only adjacency index over one
//!   uploaded table, built once and shared by every query.
//! - **In-memory store** ([`mem::MemGraph`]): `petgraph` graph with a DashMap node index
//! - **Durable store** ([`durable::DurableGraph`]): redb tables for nodes and edges
//!
//! Both stores implement [`GraphStore`], which is what the ingest service talks to.

pub mod durable;
pub mod index;
pub mod mem;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::StoreBackend;
use crate::error::GraphError;
use crate::table::{Triple, TripleTable};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// What a single merge changed in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Nodes created by this merge (0, 1 or 2).
    pub nodes_created: usize,
    /// Whether the labeled edge was new.
    pub edge_created: bool,
}

/// A graph store with MERGE semantics.
///
/// Nodes are identified by their string id and edges by `(node1, label, node2)`.
/// Merging a triple that is already present changes nothing.
pub trait GraphStore: Send + Sync {
    /// Merge both endpoint nodes and the labeled edge between them.
    fn merge_triple(&self, triple: &Triple) -> GraphResult<MergeOutcome>;

    /// Distinct node identifiers, in first-merged order.
    fn node_ids(&self) -> GraphResult<Vec<String>>;

    /// Every stored edge as a triple, in first-merged order.
    fn triples(&self) -> GraphResult<Vec<Triple>>;

    /// Number of distinct nodes.
    fn node_count(&self) -> GraphResult<usize>;

    /// Number of distinct edges.
    fn edge_count(&self) -> GraphResult<usize>;

    /// Export the stored edges as a triple table (one row per distinct edge).
    fn to_table(&self) -> GraphResult<TripleTable> {
        Ok(TripleTable::from_triples(self.triples()?))
    }
}

/// Open the configured store backend.
///
/// `Memory` ignores `data_dir`; `Durable` creates it if needed.
pub fn open_store(backend: StoreBackend, data_dir: &Path) -> GraphResult<Arc<dyn GraphStore>> {
    let store: Arc<dyn GraphStore> = match backend {
        StoreBackend::Memory => Arc::new(mem::MemGraph::new()),
        StoreBackend::Durable => Arc::new(durable::DurableGraph::open(data_dir)?),
    };
    tracing::info!(?backend, data_dir = %data_dir.display(), "opened graph store");
    Ok(store)
}
