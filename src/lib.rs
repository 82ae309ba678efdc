// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ebb-graph
//!
//! Ingest and query for Ethical Black Box interaction logs: robots, humans,
//! actions and the emotional states those actions caused, recorded as
//! `(node1, node2, label)` triples in a CSV file.
//!
//! ## Architecture
//!
//! - **Triple table** (`table`): schema-checked CSV loading
//! - **Graph layer** (`graph`): query-time adjacency index plus merge-on-identity
//!   stores (petgraph in memory, redb on disk)
//! - **Queries** (`query`): roles, attributes, interactions, causal emotion chain
//! - **Reports** (`report`): census, per-role interaction reports, emotion
//!   counts and timelines
//! - **Ingest** (`ingest`): CSV into a graph store
//! - **Server** (`server`, feature `server`): axum upload and query API
//!
//! ## Library usage
//!
//! ```no_run
//! use ebb_graph::query::{QueryEngine, Role};
//! use ebb_graph::table::TripleTable;
//!
//! let csv = "node1,node2,label\nR1,Robot,type\nI1,Action,type\nI1,R1,performedBy\n";
//! let engine = QueryEngine::new(TripleTable::from_bytes(csv.as_bytes()).unwrap());
//! assert_eq!(engine.entities_of_role(Role::Robot), vec!["R1"]);
//! for row in engine.interaction_summary("R1") {
//!     println!("{} {:?}", row.interaction_id, row.emotional_state);
//! }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod paths;
pub mod query;
pub mod report;
#[cfg(feature = "server")]
pub mod server;
pub mod table;
