//! Triple table: the typed, read-only view of an uploaded CSV.
//!
//! A table is an ordered sequence of [`Triple`] records. Order carries no
//! meaning except as the tie-breaker for "first match wins" lookups, and
//! duplicate rows are kept as-is.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Column names every CSV must carry in its header row.
pub const REQUIRED_COLUMNS: [&str; 3] = ["node1", "node2", "label"];

/// Result type for table operations.
pub type TableResult<T> = std::result::Result<T, TableError>;

/// A directed, labeled edge `node1 --label--> node2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub node1: String,
    pub node2: String,
    pub label: String,
}

impl Triple {
    /// Build a triple in `(node1, node2, label)` column order.
    pub fn new(node1: impl Into<String>, node2: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node1: node1.into(),
            node2: node2.into(),
            label: label.into(),
        }
    }
}

/// Ordered, immutable sequence of triples loaded from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleTable {
    triples: Vec<Triple>,
}

impl TripleTable {
    /// Wrap an already-built list of triples.
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        Self { triples }
    }

    /// Parse a UTF-8, comma-delimited CSV with a header row.
    ///
    /// The header must contain `node1`, `node2` and `label` in any order;
    /// other columns are ignored. Cell values are kept verbatim.
    pub fn from_reader<R: Read>(reader: R) -> TableResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers().map_err(csv_error)?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let (n1, n2, lbl) = match (position("node1"), position("node2"), position("label")) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                let missing = REQUIRED_COLUMNS
                    .iter()
                    .copied()
                    .filter(|c| position(*c).is_none())
                    .map(String::from)
                    .collect();
                return Err(TableError::SchemaMismatch { missing });
            }
        };

        let mut triples = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
            triples.push(Triple {
                node1: cell(n1),
                node2: cell(n2),
                label: cell(lbl),
            });
        }

        tracing::debug!(rows = triples.len(), "parsed triple table");
        Ok(Self { triples })
    }

    /// Parse CSV from an in-memory buffer (e.g. an uploaded file).
    pub fn from_bytes(bytes: &[u8]) -> TableResult<Self> {
        Self::from_reader(bytes)
    }

    /// Read and parse a CSV file from disk.
    pub fn from_path(path: &Path) -> TableResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterate rows in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, Triple> {
        self.triples.iter()
    }

    /// Borrow all rows.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Consume the table, returning its rows.
    pub fn into_triples(self) -> Vec<Triple> {
        self.triples
    }
}

impl<'a> IntoIterator for &'a TripleTable {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

impl FromIterator<Triple> for TripleTable {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self {
            triples: iter.into_iter().collect(),
        }
    }
}

fn csv_error(e: csv::Error) -> TableError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    TableError::Csv {
        line,
        message: e.to_string(),
    }
}
