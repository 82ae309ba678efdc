//! Rich diagnostic error types for ebb-graph.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Lookup misses are never errors: the
//! query engine reports absence as empty collections or `None` fields, so only
//! structurally invalid input and upstream (store) failures show up here.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for ebb-graph.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum EbbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error("CSV header is missing required column(s): {}", .missing.join(", "))]
    #[diagnostic(
        code(ebb::table::schema_mismatch),
        help(
            "The first row of the CSV must name the columns `node1`, `node2` and `label` \
             (in any order). Extra columns are ignored."
        )
    )]
    SchemaMismatch { missing: Vec<String> },

    #[error("malformed CSV near line {line}: {message}")]
    #[diagnostic(
        code(ebb::table::csv),
        help(
            "The file could not be parsed as UTF-8, comma-delimited CSV. \
             Check for unbalanced quotes or rows with a different column count."
        )
    )]
    Csv { line: u64, message: String },

    #[error("failed to read {path}")]
    #[diagnostic(
        code(ebb::table::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(ebb::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(ebb::store::redb),
        help(
            "The embedded graph database encountered an error. \
             If the file is corrupt, move it aside and re-ingest your CSV files."
        )
    )]
    Redb { message: String },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("graph lock poisoned")]
    #[diagnostic(
        code(ebb::graph::lock_poisoned),
        help("A writer panicked while holding the in-memory graph. Restart the process.")
    )]
    LockPoisoned,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("unknown role: \"{role}\"")]
    #[diagnostic(
        code(ebb::query::unknown_role),
        help("Valid roles are: Robot, Human, Action.")
    )]
    UnknownRole { role: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(ebb::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(ebb::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(ebb::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: \"{value}\"")]
    #[diagnostic(
        code(ebb::config::invalid_value),
        help("{expected}")
    )]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("cannot determine home directory")]
    #[diagnostic(
        code(ebb::config::no_home),
        help("Set the HOME environment variable, or pass an explicit data directory.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(ebb::config::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning ebb-graph results.
pub type EbbResult<T> = std::result::Result<T, EbbError>;
