//! Statbase ingestion pipeline
//!
//! Two stages, each triggered by a storage notification batch and connected only
//! through the object store:
//!
//! - [`transcoder`]: raw delimited upload -> Parquet copy, source deleted
//! - [`loader`]: Parquet copy -> Postgres tables listed by the [`registry`]
//!
//! Both stages derive a file's category with [`category::category_token`].
//! The loader writes through one long-lived connection opened by
//! [`db::connect`] and shared behind a lock.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod frame;
pub mod loader;
pub mod registry;
pub mod storage;
pub mod transcoder;

pub use error::{IngestError, IngestResult};
pub use loader::{LoadOutcome, Loader, TableLoad};
pub use transcoder::{TranscodeReport, Transcoder};
