//! Statbase Server - Main entry point

use std::{future::IntoFuture, net::SocketAddr, sync::Arc};

use anyhow::Result;
use statbase_common::logging::{init_logging, LogConfig};
use statbase_ingest::db::{self, DatabaseConfig, PgSink};
use statbase_ingest::storage::S3Storage;
use statbase_ingest::{Loader, Transcoder};
use statbase_server::shutdown::{drain_deadline, shutdown_signal};
use statbase_server::{config::Config, create_router, AppState};
use tokio::sync::oneshot;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .log_file_prefix("statbase-server")
        .filter_directives("statbase_server=debug,statbase_ingest=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting Statbase Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = Arc::new(S3Storage::new(&config.ingest.storage).await);

    let conn = db::connect(&DatabaseConfig::from_env()?).await?;
    let sink = PgSink::new(conn, config.ingest.pipeline.insert_chunk_rows);

    let state = AppState::new(
        Transcoder::new(store.clone(), &config.ingest.pipeline),
        Loader::new(store, sink),
    );
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    let timeout_secs = config.server.shutdown_timeout_secs;
    tokio::select! {
        result = &mut server => {
            result?;
            info!("Server shut down gracefully");
        },
        _ = drain_deadline(signalled_rx, timeout_secs) => {
            warn!("In-flight batches still running after {} seconds, exiting", timeout_secs);
        },
    }

    Ok(())
}
