//! Raw delimited file -> Parquet
//!
//! The new object is written before the source is deleted. A crash between the two
//! leaves both behind; redelivery reproduces the same Parquet bytes and finishes the
//! delete.

use std::sync::Arc;

use statbase_common::event::{EventBatch, InvocationResponse, SourceEvent};
use statbase_common::units::{human_size, reduction_percent};
use tracing::{info, instrument};

use crate::category::{category_token, transcoded_key, Delimiter};
use crate::config::PipelineConfig;
use crate::error::{IngestError, IngestResult};
use crate::frame::RawTable;
use crate::storage::ObjectStore;

/// What one transcoding did
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeReport {
    pub source_key: String,
    pub target_key: String,
    pub rows: usize,
    pub source_bytes: u64,
    pub target_bytes: u64,
}

impl TranscodeReport {
    /// Size reduction in percent; negative when the Parquet copy is larger
    pub fn reduction(&self) -> f64 {
        reduction_percent(self.source_bytes, self.target_bytes)
    }
}

pub struct Transcoder {
    store: Arc<dyn ObjectStore>,
    raw_prefix: String,
    transcoded_prefix: String,
}

impl Transcoder {
    pub fn new(store: Arc<dyn ObjectStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            raw_prefix: config.raw_prefix.clone(),
            transcoded_prefix: config.transcoded_prefix.clone(),
        }
    }

    /// Transcode one raw object and delete it
    #[instrument(skip(self, event), fields(bucket = %event.bucket, key = %event.object_key))]
    pub async fn transcode(&self, event: &SourceEvent) -> IngestResult<TranscodeReport> {
        let target_key = transcoded_key(&event.object_key, &self.raw_prefix, &self.transcoded_prefix)?;
        let delimiter = Delimiter::for_token(category_token(&event.object_key));

        let raw = self
            .store
            .get(&event.bucket, &event.object_key)
            .await
            .map_err(IngestError::Storage)?;

        let table = RawTable::from_csv(&raw, delimiter)?;
        let encoded = table.to_parquet()?;

        let report = TranscodeReport {
            source_key: event.object_key.clone(),
            target_key,
            rows: table.num_rows(),
            source_bytes: raw.len() as u64,
            target_bytes: encoded.len() as u64,
        };

        self.store
            .put(&event.bucket, &report.target_key, encoded)
            .await
            .map_err(IngestError::Storage)?;
        self.store
            .delete(&event.bucket, &event.object_key)
            .await
            .map_err(IngestError::Storage)?;

        info!(
            parquet_key = %report.target_key,
            rows = report.rows,
            before = %human_size(report.source_bytes),
            after = %human_size(report.target_bytes),
            "Transcoded with {:.1}% size reduction",
            report.reduction()
        );

        Ok(report)
    }

    /// Transcode every record in order; the first failure fails the batch
    pub async fn handle(&self, batch: &EventBatch) -> IngestResult<InvocationResponse> {
        for event in &batch.records {
            self.transcode(event).await?;
        }
        Ok(InvocationResponse::ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::frame::Cell;
    use crate::storage::MemoryStore;

    const BUCKET: &str = "stats";

    fn transcoder(store: &Arc<MemoryStore>) -> Transcoder {
        Transcoder::new(store.clone(), &PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_transcode_writes_then_deletes_source() {
        let store = Arc::new(MemoryStore::new());
        store.insert(
            BUCKET,
            "preprocessed/municipality_2020.csv",
            "AÑO;Total;COD_MUNICIPIO\n2020;2500000;5001\n2020;120000;5002\n",
        );

        let event = SourceEvent::new(BUCKET, "preprocessed/municipality_2020.csv", 0);
        let report = transcoder(&store).transcode(&event).await.unwrap();

        assert_eq!(report.target_key, "parquetized/municipality_2020.parquet");
        assert_eq!(report.rows, 2);
        assert_eq!(store.keys(BUCKET), vec!["parquetized/municipality_2020.parquet"]);

        let written = store.object(BUCKET, &report.target_key).unwrap();
        assert_eq!(written.len() as u64, report.target_bytes);
        let table = RawTable::from_parquet(written).unwrap();
        assert_eq!(table.column("Total").unwrap().cell(1), Cell::Int(120000));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_source() {
        let store = Arc::new(MemoryStore::new());
        store.insert(BUCKET, "preprocessed/suicides_2020.csv", "YEAR,SUI_COUNTER\n2020,1\n");
        store.fail_puts();

        let event = SourceEvent::new(BUCKET, "preprocessed/suicides_2020.csv", 0);
        let err = transcoder(&store).transcode(&event).await.unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(store.keys(BUCKET), vec!["preprocessed/suicides_2020.csv"]);
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let store = Arc::new(MemoryStore::new());
        let event = SourceEvent::new(BUCKET, "preprocessed/suicides_2020.csv", 0);
        assert!(matches!(
            transcoder(&store).transcode(&event).await,
            Err(IngestError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_key_outside_raw_prefix_is_rejected_before_reading() {
        let store = Arc::new(MemoryStore::new());
        store.insert(BUCKET, "uploads/suicides_2020.csv", "YEAR\n2020\n");

        let event = SourceEvent::new(BUCKET, "uploads/suicides_2020.csv", 0);
        let err = transcoder(&store).transcode(&event).await.unwrap_err();

        assert!(matches!(err, IngestError::InvalidKey { .. }));
        assert_eq!(store.keys(BUCKET).len(), 1);
    }

    #[tokio::test]
    async fn test_handle_stops_at_first_failure() {
        let store = Arc::new(MemoryStore::new());
        store.insert(BUCKET, "preprocessed/attempts_1.csv", "YEAR,WEEK\n2020,1\n");
        store.insert(BUCKET, "preprocessed/attempts_3.csv", "YEAR,WEEK\n2020,3\n");

        let batch = EventBatch::from(vec![
            SourceEvent::new(BUCKET, "preprocessed/attempts_1.csv", 0),
            SourceEvent::new(BUCKET, "preprocessed/attempts_2.csv", 0),
            SourceEvent::new(BUCKET, "preprocessed/attempts_3.csv", 0),
        ]);
        assert!(transcoder(&store).handle(&batch).await.is_err());

        assert_eq!(
            store.keys(BUCKET),
            vec!["parquetized/attempts_1.parquet", "preprocessed/attempts_3.csv"]
        );
    }

    #[test]
    fn test_report_reduction() {
        let report = TranscodeReport {
            source_key: "a".to_string(),
            target_key: "b".to_string(),
            rows: 1,
            source_bytes: 400,
            target_bytes: 100,
        };
        assert_eq!(report.reduction(), 75.0);
    }
}
