//! Relational store access
//!
//! The loader talks to Postgres through [`TableSink`]. [`PgSink`] owns the single
//! process-wide connection produced by [`connection::connect`].

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use thiserror::Error;
use tracing::debug;

use crate::registry::{Row, SqlValue, TableDescriptor};

pub mod connection;

pub use connection::{connect, connect_with, DatabaseConfig, DbSecret, SecretSource, SecretSourceKind};

/// Postgres rejects statements with more bind parameters than this
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL statement or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check SECRET_NAME and connection settings.")]
    Config(String),

    /// Credentials could not be fetched or decoded
    #[error("Database secret error: {0}")]
    Secret(String),
}

impl DbError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn secret(message: impl Into<String>) -> Self {
        Self::Secret(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Destination of projected rows.
///
/// Each call is its own unit of work: a failed `insert_rows` leaves none of its
/// rows behind, and earlier successful calls stay committed.
#[async_trait]
pub trait TableSink: Send {
    /// Run the table's idempotent DDL
    async fn ensure_table(&mut self, table: &TableDescriptor) -> DbResult<()>;

    /// Append all rows in one transaction; returns the number of rows inserted
    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> DbResult<u64>;

    /// Cheap round trip proving the handle is alive
    async fn ping(&mut self) -> DbResult<()>;
}

/// [`TableSink`] over one dedicated Postgres connection
pub struct PgSink {
    conn: PgConnection,
    chunk_rows: usize,
}

impl PgSink {
    /// `chunk_rows` bounds the rows bound into a single multi-row `INSERT`
    pub fn new(conn: PgConnection, chunk_rows: usize) -> Self {
        Self {
            conn,
            chunk_rows: chunk_rows.max(1),
        }
    }
}

/// Rows per `INSERT` so that `rows * columns` stays within the bind limit
fn rows_per_statement(chunk_rows: usize, columns: usize) -> usize {
    (MAX_BIND_PARAMETERS / columns.max(1)).clamp(1, chunk_rows.max(1))
}

#[async_trait]
impl TableSink for PgSink {
    async fn ensure_table(&mut self, table: &TableDescriptor) -> DbResult<()> {
        let mut tx = self.conn.begin().await?;
        sqlx::query(table.create_statement).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> DbResult<u64> {
        let per_statement = rows_per_statement(self.chunk_rows, table.columns.len());
        let total_chunks = rows.len().div_ceil(per_statement);
        let mut inserted = 0;

        let mut tx = self.conn.begin().await?;

        for (chunk_idx, chunk) in rows.chunks(per_statement).enumerate() {
            debug!(
                table = table.name,
                "Inserting chunk {} / {} ({} rows)",
                chunk_idx + 1,
                total_chunks,
                chunk.len()
            );

            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(table.insert_statement);
            query_builder.push_values(chunk, |mut b, row| {
                for value in row {
                    match value {
                        SqlValue::Integer(v) => b.push_bind(*v),
                        SqlValue::Numeric(v) => b.push_bind(*v),
                        SqlValue::Text(v) => b.push_bind(v.as_deref()),
                    };
                }
            });

            let result = query_builder.build().execute(&mut *tx).await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn ping(&mut self) -> DbResult<()> {
        self.conn.ping().await.map_err(DbError::from)
    }
}
