//! CSV ingest: parse a triple table and merge every row into a graph store.
//!
//! Rows are merged one at a time in table order. There is no cross-row
//! transaction: if the store fails part-way, earlier rows stay merged and the
//! error is returned.

use std::io::Read;
use std::sync::Arc;

use serde::Serialize;

use crate::error::EbbResult;
use crate::graph::GraphStore;
use crate::table::TripleTable;

/// Totals for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Data rows read from the table.
    pub rows: usize,
    /// Nodes that did not exist before this run.
    pub nodes_created: usize,
    /// Edges that did not exist before this run.
    pub edges_created: usize,
    /// Rows whose edge was already present (in the store or earlier in the file).
    pub duplicate_edges: usize,
}

/// Merges triple tables into a shared graph store.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn GraphStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// The store rows are merged into.
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Parse CSV bytes and merge them.
    pub fn ingest_bytes(&self, bytes: &[u8]) -> EbbResult<IngestReport> {
        let table = TripleTable::from_bytes(bytes)?;
        self.ingest_table(&table)
    }

    /// Parse CSV from a reader and merge it.
    pub fn ingest_reader<R: Read>(&self, reader: R) -> EbbResult<IngestReport> {
        let table = TripleTable::from_reader(reader)?;
        self.ingest_table(&table)
    }

    /// Merge an already parsed table.
    pub fn ingest_table(&self, table: &TripleTable) -> EbbResult<IngestReport> {
        let mut report = IngestReport::default();
        for triple in table {
            let outcome = self.store.merge_triple(triple).inspect_err(|e| {
                tracing::warn!(
                    merged = report.rows,
                    node1 = %triple.node1,
                    label = %triple.label,
                    error = %e,
                    "merge failed, earlier rows remain merged"
                );
            })?;
            report.rows += 1;
            report.nodes_created += outcome.nodes_created;
            if outcome.edge_created {
                report.edges_created += 1;
            } else {
                report.duplicate_edges += 1;
            }
        }
        tracing::info!(
            rows = report.rows,
            nodes = report.nodes_created,
            edges = report.edges_created,
            duplicates = report.duplicate_edges,
            "ingested triple table"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EbbError, GraphError, TableError};
    use crate::graph::mem::MemGraph;
    use crate::graph::{GraphResult, MergeOutcome};
    use crate::table::Triple;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOG: &str = "node1,node2,label\n\
                       R1,Robot,type\n\
                       I1,Action,type\n\
                       I1,R1,performedBy\n\
                       I1,R1,performedBy\n";

    fn ingestor() -> (Ingestor, Arc<MemGraph>) {
        let store = Arc::new(MemGraph::new());
        (Ingestor::new(store.clone()), store)
    }

    #[test]
    fn ingest_counts_nodes_edges_and_duplicates() {
        let (ingestor, store) = ingestor();
        let report = ingestor.ingest_bytes(LOG.as_bytes()).unwrap();
        assert_eq!(
            report,
            IngestReport {
                rows: 4,
                nodes_created: 4,
                edges_created: 3,
                duplicate_edges: 1,
            }
        );
        assert_eq!(store.node_count().unwrap(), 4);
        assert_eq!(store.edge_count().unwrap(), 3);
    }

    #[test]
    fn reingest_creates_nothing() {
        let (ingestor, store) = ingestor();
        ingestor.ingest_reader(LOG.as_bytes()).unwrap();
        let again = ingestor.ingest_reader(LOG.as_bytes()).unwrap();
        assert_eq!(again.nodes_created, 0);
        assert_eq!(again.edges_created, 0);
        assert_eq!(again.duplicate_edges, 4);
        assert_eq!(store.edge_count().unwrap(), 3);
    }

    #[test]
    fn header_only_file_is_empty_success() {
        let (ingestor, _) = ingestor();
        let report = ingestor.ingest_bytes(b"node1,node2,label\n").unwrap();
        assert_eq!(report, IngestReport::default());
    }

    #[test]
    fn schema_mismatch_merges_nothing() {
        let (ingestor, store) = ingestor();
        let err = ingestor.ingest_bytes(b"source,target,label\nA,B,L\n").unwrap_err();
        assert!(matches!(
            err,
            EbbError::Table(TableError::SchemaMismatch { .. })
        ));
        assert_eq!(store.node_count().unwrap(), 0);
    }

    /// Fails every merge after the first `limit`.
    struct FlakyStore {
        inner: MemGraph,
        limit: usize,
        calls: AtomicUsize,
    }

    impl GraphStore for FlakyStore {
        fn merge_triple(&self, triple: &Triple) -> GraphResult<MergeOutcome> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.limit {
                return Err(GraphError::LockPoisoned);
            }
            self.inner.merge_triple(triple)
        }
        fn node_ids(&self) -> GraphResult<Vec<String>> {
            self.inner.node_ids()
        }
        fn triples(&self) -> GraphResult<Vec<Triple>> {
            self.inner.triples()
        }
        fn node_count(&self) -> GraphResult<usize> {
            self.inner.node_count()
        }
        fn edge_count(&self) -> GraphResult<usize> {
            self.inner.edge_count()
        }
    }

    #[test]
    fn store_failure_keeps_earlier_rows() {
        let store = Arc::new(FlakyStore {
            inner: MemGraph::new(),
            limit: 2,
            calls: AtomicUsize::new(0),
        });
        let ingestor = Ingestor::new(store.clone());
        let err = ingestor.ingest_bytes(LOG.as_bytes()).unwrap_err();
        assert!(matches!(err, EbbError::Graph(GraphError::LockPoisoned)));
        assert_eq!(store.edge_count().unwrap(), 2);
    }
}
