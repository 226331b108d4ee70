//! Statbase Ingest - run one pipeline stage over a saved notification batch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use statbase_common::event::EventBatch;
use statbase_common::logging::{init_logging, LogConfig, LogLevel};
use statbase_ingest::config::IngestConfig;
use statbase_ingest::db::{self, DatabaseConfig, PgSink};
use statbase_ingest::storage::S3Storage;
use statbase_ingest::{Loader, Transcoder};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "statbase-ingest")]
#[command(author, version, about = "Statbase ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    stage: Stage,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Stage {
    /// Convert raw CSV uploads to Parquet
    Transcode {
        /// Storage notification JSON
        #[arg(short, long)]
        event: PathBuf,
    },

    /// Load Parquet objects into the relational store
    Load {
        /// Storage notification JSON
        #[arg(short, long)]
        event: PathBuf,
    },
}

fn read_batch(path: &Path) -> Result<EventBatch> {
    EventBatch::from_path(path).with_context(|| format!("Failed to read notification from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("statbase-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    let store = Arc::new(S3Storage::new(&config.storage).await);

    let response = match cli.stage {
        Stage::Transcode { event } => {
            let batch = read_batch(&event)?;
            info!(records = batch.records.len(), "Transcoding batch");
            Transcoder::new(store, &config.pipeline).handle(&batch).await?
        },
        Stage::Load { event } => {
            let batch = read_batch(&event)?;
            let conn = db::connect(&DatabaseConfig::from_env()?).await?;
            let loader = Loader::new(store, PgSink::new(conn, config.pipeline.insert_chunk_rows));
            info!(records = batch.records.len(), "Loading batch");
            loader.handle(&batch).await?
        },
    };

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
