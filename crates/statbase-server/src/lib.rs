//! Statbase Server Library
//!
//! HTTP surface for the ingestion pipeline. Storage notifications are POSTed as
//! JSON batches:
//!
//! - `POST /events/transcode`: raw uploads -> Parquet
//! - `POST /events/load`: Parquet objects -> Postgres
//! - `GET /health`: round trip on the loader's connection
//!
//! Loads of different files are serialized on the single database connection.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shutdown;

pub use error::AppError;
pub use routes::{create_router, AppState};
