//! Webhook routes
//!
//! Each stage endpoint takes one storage notification batch and answers
//! `{"status":200}` only if every record succeeded. Any failure is a non-2xx
//! response so the sender redelivers.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, routing::{get, post}, Json, Router};
use serde_json::{json, Value};
use statbase_common::event::{EventBatch, InvocationResponse};
use statbase_ingest::db::TableSink;
use statbase_ingest::{Loader, Transcoder};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware;

/// Application state shared across handlers
pub struct AppState<S> {
    pub transcoder: Arc<Transcoder>,
    pub loader: Arc<Loader<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            transcoder: self.transcoder.clone(),
            loader: self.loader.clone(),
        }
    }
}

impl<S: TableSink> AppState<S> {
    pub fn new(transcoder: Transcoder, loader: Loader<S>) -> Self {
        Self {
            transcoder: Arc::new(transcoder),
            loader: Arc::new(loader),
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_router<S: TableSink + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check::<S>))
        .route("/events/transcode", post(transcode_events::<S>))
        .route("/events/load", post(load_events::<S>))
        .with_state(state)
        .layer(middleware::tracing_layer())
}

async fn health_check<S: TableSink + 'static>(State(state): State<AppState<S>>) -> Result<Json<Value>, AppError> {
    state.loader.health_check().await?;
    Ok(Json(json!({
        "status": "healthy",
        "database": "connected"
    })))
}

async fn transcode_events<S: TableSink + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<InvocationResponse>, AppError> {
    let batch = EventBatch::from_slice(&body)?;
    let span = info_span!("invocation", id = %Uuid::new_v4(), stage = "transcode");

    async {
        info!(records = batch.records.len(), "Transcoding batch");
        let response = state.transcoder.handle(&batch).await?;
        Ok::<_, AppError>(Json(response))
    }
    .instrument(span)
    .await
}

async fn load_events<S: TableSink + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<InvocationResponse>, AppError> {
    let batch = EventBatch::from_slice(&body)?;
    let span = info_span!("invocation", id = %Uuid::new_v4(), stage = "load");

    async {
        info!(records = batch.records.len(), "Loading batch");
        let response = state.loader.handle(&batch).await?;
        Ok::<_, AppError>(Json(response))
    }
    .instrument(span)
    .await
}
