//! Ingestion error types
//!
//! Every variant fails the invocation; the platform's redelivery decides what
//! happens next. Unrecognized categories are not errors at all.

use thiserror::Error;

use crate::db::DbError;

/// Result type alias for pipeline operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Object read, write or delete failed
    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),

    /// Delimited text could not be parsed into a table
    #[error("Failed to read tabular data: {0}")]
    Frame(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Column '{0}' not found in source data")]
    MissingColumn(String),

    #[error("Cannot project row {row} of column '{column}' into {table}: {reason}")]
    Projection {
        table: &'static str,
        column: String,
        row: usize,
        reason: String,
    },

    /// Create statement failed; nothing further was attempted for the file
    #[error("Failed to ensure table {table}: {source}")]
    Schema {
        table: &'static str,
        #[source]
        source: DbError,
    },

    /// Batched insert failed and was rolled back; earlier tables stay committed
    #[error("Failed to insert rows into {table}: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: DbError,
    },

    #[error("Event error: {0}")]
    Event(#[from] statbase_common::StatbaseError),
}

impl IngestError {
    /// Table whose DDL or insert aborted the file, if any
    pub fn failed_table(&self) -> Option<&'static str> {
        match self {
            IngestError::Schema { table, .. } | IngestError::Insert { table, .. } => Some(*table),
            _ => None,
        }
    }
}
