//! Error types for loading, transforming and writing tables

use std::path::PathBuf;

use thiserror::Error;

/// Result type for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors raised by the tabular store, loader, registry and sink
#[derive(Debug, Error)]
pub enum EtlError {
    /// Source file missing, unreadable or malformed
    #[error("Failed to read source {path}: {message}")]
    SourceRead { path: PathBuf, message: String },

    /// An index, sort, merge or write referenced a column that is not there
    #[error("Column not found: '{column}' (while {operation})")]
    ColumnNotFound {
        column: String,
        operation: &'static str,
    },

    /// Table create/drop failed for a reason other than exists/missing
    #[error("Schema error on table '{table}': {message}")]
    Schema { table: String, message: String },

    /// Could not open a connection to the relational sink
    #[error("Failed to connect to {target}: {message}")]
    SinkConnection { target: String, message: String },

    /// A batch append failed, or a value did not fit its declared type
    #[error("Write to table '{table}' failed: {message}")]
    Write { table: String, message: String },

    /// A preview could not be rendered
    #[error("Failed to render preview: {0}")]
    Preview(String),
}

impl EtlError {
    pub(crate) fn column_not_found(column: impl Into<String>, operation: &'static str) -> Self {
        EtlError::ColumnNotFound {
            column: column.into(),
            operation,
        }
    }
}

/// Errors reported by a sink connection
///
/// The registry needs to tell "table does not exist" apart from other
/// failures so that a drop of an absent table can be ignored.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("table '{0}' does not exist")]
    TableMissing(String),

    #[error("duplicate primary key in table '{table}': {key}")]
    DuplicateKey { table: String, key: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}
