//! Durable graph store backed by redb.
//!
//! Nodes and edges live in two tables keyed by identity, so a merge is a
//! lookup plus an insert inside one write transaction. Values are a
//! monotonically increasing sequence number, which gives listings a stable
//! first-merged order across restarts.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use crate::error::StoreError;
use crate::table::Triple;

use super::{GraphResult, GraphStore, MergeOutcome};

/// Node id → merge sequence.
const NODES: TableDefinition<&str, u64> = TableDefinition::new("nodes");

/// (node1, label, node2) → merge sequence.
const EDGES: TableDefinition<(&str, &str, &str), u64> = TableDefinition::new("edges");

/// Store-wide counters.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const SEQ_KEY: &str = "next_seq";

/// File name of the database inside the data directory.
pub const DB_FILE: &str = "ebb-graph.redb";

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

/// ACID-durable merge-on-identity graph.
pub struct DurableGraph {
    db: Arc<Database>,
}

impl DurableGraph {
    /// Open or create the graph database in the given directory.
    pub fn open(data_dir: &Path) -> GraphResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;

        // Create the tables up front so read transactions never miss them.
        let txn = db.begin_write().map_err(redb_err("begin_write"))?;
        {
            txn.open_table(NODES).map_err(redb_err("open_table"))?;
            txn.open_table(EDGES).map_err(redb_err("open_table"))?;
            txn.open_table(META).map_err(redb_err("open_table"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;

        tracing::debug!(path = %db_path.display(), "opened durable graph");
        Ok(Self { db: Arc::new(db) })
    }

    fn count<K: redb::Key + 'static>(&self, def: TableDefinition<K, u64>) -> GraphResult<usize> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(def).map_err(redb_err("open_table"))?;
        let len = table.len().map_err(redb_err("len"))?;
        Ok(len as usize)
    }
}

impl GraphStore for DurableGraph {
    fn merge_triple(&self, triple: &Triple) -> GraphResult<MergeOutcome> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let outcome = {
            let mut nodes = txn.open_table(NODES).map_err(redb_err("open_table"))?;
            let mut edges = txn.open_table(EDGES).map_err(redb_err("open_table"))?;
            let mut meta = txn.open_table(META).map_err(redb_err("open_table"))?;

            let mut seq = meta
                .get(SEQ_KEY)
                .map_err(redb_err("get"))?
                .map(|g| g.value())
                .unwrap_or(0);

            let mut nodes_created = 0;
            for id in [triple.node1.as_str(), triple.node2.as_str()] {
                let exists = nodes.get(id).map_err(redb_err("get"))?.is_some();
                if !exists {
                    nodes.insert(id, seq).map_err(redb_err("insert"))?;
                    seq += 1;
                    nodes_created += 1;
                }
            }

            let key = (
                triple.node1.as_str(),
                triple.label.as_str(),
                triple.node2.as_str(),
            );
            let edge_created = edges.get(key).map_err(redb_err("get"))?.is_none();
            if edge_created {
                edges.insert(key, seq).map_err(redb_err("insert"))?;
                seq += 1;
            }

            meta.insert(SEQ_KEY, seq).map_err(redb_err("insert"))?;

            MergeOutcome {
                nodes_created,
                edge_created,
            }
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(outcome)
    }

    fn node_ids(&self) -> GraphResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(NODES).map_err(redb_err("open_table"))?;
        let mut rows = Vec::new();
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (id, seq) = entry.map_err(redb_err("iter"))?;
            rows.push((seq.value(), id.value().to_string()));
        }
        Ok(by_sequence(rows))
    }

    fn triples(&self) -> GraphResult<Vec<Triple>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(EDGES).map_err(redb_err("open_table"))?;
        let mut rows = Vec::new();
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (key, seq) = entry.map_err(redb_err("iter"))?;
            let (node1, label, node2) = key.value();
            rows.push((seq.value(), Triple::new(node1, node2, label)));
        }
        Ok(by_sequence(rows))
    }

    fn node_count(&self) -> GraphResult<usize> {
        self.count(NODES)
    }

    fn edge_count(&self) -> GraphResult<usize> {
        self.count(EDGES)
    }
}

fn by_sequence<T>(mut rows: Vec<(u64, T)>) -> Vec<T> {
    rows.sort_by_key(|(seq, _)| *seq);
    rows.into_iter().map(|(_, v)| v).collect()
}

impl std::fmt::Debug for DurableGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableGraph").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn merge_and_list() {
        let dir = TempDir::new().unwrap();
        let g = DurableGraph::open(dir.path()).unwrap();

        let outcome = g.merge_triple(&Triple::new("R1", "Robot", "type")).unwrap();
        assert_eq!(outcome.nodes_created, 2);
        assert!(outcome.edge_created);
        assert_eq!(g.node_ids().unwrap(), vec!["R1", "Robot"]);
        assert_eq!(g.triples().unwrap(), vec![Triple::new("R1", "Robot", "type")]);
    }

    #[test]
    fn remerge_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let g = DurableGraph::open(dir.path()).unwrap();
        let t = Triple::new("I1", "R1", "performedBy");
        g.merge_triple(&t).unwrap();
        assert_eq!(g.merge_triple(&t).unwrap(), MergeOutcome::default());
        assert_eq!(g.node_count().unwrap(), 2);
        assert_eq!(g.edge_count().unwrap(), 1);
    }

    #[test]
    fn persistence_across_reopens() {
        let dir = TempDir::new().unwrap();
        {
            let g = DurableGraph::open(dir.path()).unwrap();
            g.merge_triple(&Triple::new("E1", "I1", "causedBy")).unwrap();
        }
        let g = DurableGraph::open(dir.path()).unwrap();
        assert_eq!(g.node_ids().unwrap(), vec!["E1", "I1"]);

        // Sequence resumes after reopen, so order stays first-merged.
        g.merge_triple(&Triple::new("E1", "Happy", "hasEmotionalState"))
            .unwrap();
        assert_eq!(g.node_ids().unwrap(), vec!["E1", "I1", "Happy"]);
    }

    #[test]
    fn empty_store_counts_zero() {
        let dir = TempDir::new().unwrap();
        let g = DurableGraph::open(dir.path()).unwrap();
        assert_eq!(g.node_count().unwrap(), 0);
        assert!(g.triples().unwrap().is_empty());
    }
}
