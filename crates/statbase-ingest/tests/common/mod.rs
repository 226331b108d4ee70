//! Shared helpers for statbase-ingest integration tests
//!
//! - CSV fixtures for every registered category, in the order a full refresh
//!   uploads them
//! - [`RecordingSink`]: in-memory [`TableSink`] with failure injection
//! - [`TestPostgres`]: disposable Postgres via testcontainers (Docker required)

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use statbase_common::event::SourceEvent;
use statbase_ingest::config::PipelineConfig;
use statbase_ingest::db::{DbError, DbResult, TableSink};
use statbase_ingest::registry::{Row, TableDescriptor};
use statbase_ingest::storage::MemoryStore;
use statbase_ingest::Transcoder;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

pub const BUCKET: &str = "statbase-test";

pub const DEPARTMENT_CSV: &str = "\
DP;DPNOM;AÑO;Total Mujeres;Total Hombres
5;ANTIOQUIA;2019;3300000;3100000
5;ANTIOQUIA;2020;3350000;3150000
";

pub const MUNICIPALITIES_CSV: &str = "\
COD_MUNICIPIO,MPNOM,LATITUD,LONGITUD,DP
5001,MEDELLIN,6.25,-75.56,5
5002,ABEJORRAL,NaN,-75.43,5
5001,MEDELLIN,6.25,-75.56,5
";

pub const MUNICIPALITY_CSV: &str = "\
AÑO;Total;COD_MUNICIPIO
2020;2500000;5001
2020;20000;5002
";

pub const SUICIDES_CSV: &str = "\
YEAR,SUI_COUNTER,CODE_MUNICIPIO
2020,12,5001
2020,1,5002
2021,9,5001
";

pub const ATTEMPTS_CSV: &str = "\
YEAR,WEEK,COUNTER_TRY,CODE_MUNICIPIO
2020,1,4,5001
2020,2,3,5001
";

pub const INTERFAMILY_CSV: &str = "\
YEAR,CANTIDAD,CODE_MUNICIPIO
2020,150,5001
";

/// `(file name, contents)` for every category, parents first
pub const FIXTURES: [(&str, &str); 6] = [
    ("department_2020.csv", DEPARTMENT_CSV),
    ("municipalities_2020.csv", MUNICIPALITIES_CSV),
    ("municipality_2020.csv", MUNICIPALITY_CSV),
    ("suicides_2020.csv", SUICIDES_CSV),
    ("attempts_2020.csv", ATTEMPTS_CSV),
    ("interfamily_2020.csv", INTERFAMILY_CSV),
];

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,statbase_ingest=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

/// Upload `contents` as a raw file, transcode it, and return the event for the
/// Parquet copy
pub async fn transcode_fixture(store: &Arc<MemoryStore>, file_name: &str, contents: &str) -> Result<SourceEvent> {
    let raw_key = format!("preprocessed/{}", file_name);
    store.insert(BUCKET, &raw_key, contents.to_string());

    let transcoder = Transcoder::new(store.clone(), &PipelineConfig::default());
    let report = transcoder
        .transcode(&SourceEvent::new(BUCKET, &raw_key, contents.len() as u64))
        .await?;

    Ok(SourceEvent::new(BUCKET, report.target_key, report.target_bytes))
}

// ============================================================================
// Recording sink
// ============================================================================

/// One statement the loader asked the sink to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Create(&'static str),
    Insert(&'static str, usize),
}

#[derive(Default)]
struct SinkState {
    statements: Vec<Statement>,
    tables: BTreeMap<&'static str, Vec<Row>>,
    fail_create: Option<&'static str>,
    fail_insert: Option<&'static str>,
    yield_on_statement: bool,
}

/// In-memory sink; clones share state so a test can inspect what a loader did
#[derive(Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create_on(&self, table: &'static str) {
        self.state.lock().unwrap().fail_create = Some(table);
    }

    pub fn fail_insert_on(&self, table: &'static str) {
        self.state.lock().unwrap().fail_insert = Some(table);
    }

    /// Yield to the runtime around every statement, as a real connection would
    pub fn yield_on_statement(&self) {
        self.state.lock().unwrap().yield_on_statement = true;
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state.lock().unwrap().statements.clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }
}

impl RecordingSink {
    async fn pause(&self) {
        let yielding = self.state.lock().unwrap().yield_on_statement;
        if yielding {
            tokio::task::yield_now().await;
        }
    }
}

fn injected(what: &str, table: &str) -> DbError {
    DbError::Sqlx(sqlx::Error::Protocol(format!("injected {} failure on {}", what, table)))
}

#[async_trait]
impl TableSink for RecordingSink {
    async fn ensure_table(&mut self, table: &TableDescriptor) -> DbResult<()> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.statements.push(Statement::Create(table.name));
        if state.fail_create == Some(table.name) {
            return Err(injected("create", table.name));
        }
        state.tables.entry(table.name).or_default();
        Ok(())
    }

    async fn insert_rows(&mut self, table: &TableDescriptor, rows: &[Row]) -> DbResult<u64> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.statements.push(Statement::Insert(table.name, rows.len()));
        if state.fail_insert == Some(table.name) {
            return Err(injected("insert", table.name));
        }
        state.tables.entry(table.name).or_default().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn ping(&mut self) -> DbResult<()> {
        Ok(())
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// Disposable Postgres; the container stops when this is dropped
pub struct TestPostgres {
    container: ContainerAsync<Postgres>,
    host: String,
    port: u16,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?
            .to_string();
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        Ok(Self { container, host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Secret JSON in the shape the connection provider expects
    pub fn secret_json(&self) -> String {
        serde_json::json!({
            "host": self.host,
            "port": self.port,
            "dbname": "postgres",
            "username": "postgres",
            "password": "postgres",
        })
        .to_string()
    }

    /// Open a fresh connection for assertions
    pub async fn connect(&self) -> Result<PgConnection> {
        let url = format!("postgresql://postgres:postgres@{}:{}/postgres", self.host, self.port);
        PgConnection::connect(&url)
            .await
            .context("Failed to connect to test database")
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let mut conn = self.connect().await?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut conn)
            .await?;
        Ok(count)
    }
}
