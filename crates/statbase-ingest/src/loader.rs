//! Parquet object -> relational tables
//!
//! Per file: resolve the category, decode the object once, then for each table in
//! registry order ensure it exists, project the rows and insert them in one
//! transaction. The first failure aborts the file; tables already inserted stay
//! committed.
//!
//! Nothing records that a file was loaded. Loading the same object twice appends
//! every history row again, and fails on the primary key of reference tables.

use std::sync::Arc;

use statbase_common::event::{EventBatch, InvocationResponse, SourceEvent};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::category::category_token;
use crate::db::{DbResult, TableSink};
use crate::error::{IngestError, IngestResult};
use crate::frame::RawTable;
use crate::registry;
use crate::storage::ObjectStore;

/// Rows inserted into one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: &'static str,
    pub rows: u64,
}

/// Terminal state of a file that did not abort
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Category has no registered tables; nothing was executed
    Skipped { token: String },
    Done { tables: Vec<TableLoad> },
}

pub struct Loader<S> {
    store: Arc<dyn ObjectStore>,
    /// Held for a whole file so statements of concurrent files never interleave
    sink: Mutex<S>,
}

impl<S: TableSink> Loader<S> {
    pub fn new(store: Arc<dyn ObjectStore>, sink: S) -> Self {
        Self {
            store,
            sink: Mutex::new(sink),
        }
    }

    #[instrument(skip(self, event), fields(bucket = %event.bucket, key = %event.object_key))]
    pub async fn load(&self, event: &SourceEvent) -> IngestResult<LoadOutcome> {
        let token = category_token(&event.object_key);
        let Some(tables) = registry::resolve(token) else {
            info!(token, "No tables registered for category, skipping");
            return Ok(LoadOutcome::Skipped {
                token: token.to_string(),
            });
        };

        let data = self
            .store
            .get(&event.bucket, &event.object_key)
            .await
            .map_err(IngestError::Storage)?;
        let raw = RawTable::from_parquet(data)?;
        debug!(rows = raw.num_rows(), "Decoded transcoded object");

        let mut sink = self.sink.lock().await;
        let mut loads = Vec::with_capacity(tables.len());

        for table in tables {
            sink.ensure_table(table)
                .await
                .map_err(|source| IngestError::Schema {
                    table: table.name,
                    source,
                })?;

            let rows = table.project(&raw)?;

            let inserted = sink
                .insert_rows(table, &rows)
                .await
                .map_err(|source| IngestError::Insert {
                    table: table.name,
                    source,
                })?;

            info!(table = table.name, rows = inserted, "Table loaded");
            loads.push(TableLoad {
                table: table.name,
                rows: inserted,
            });
        }

        Ok(LoadOutcome::Done { tables: loads })
    }

    /// Load every record in order; the first failure fails the batch
    pub async fn handle(&self, batch: &EventBatch) -> IngestResult<InvocationResponse> {
        for event in &batch.records {
            self.load(event).await?;
        }
        Ok(InvocationResponse::ok())
    }

    /// Round trip on the shared connection
    pub async fn health_check(&self) -> DbResult<()> {
        self.sink.lock().await.ping().await
    }
}
