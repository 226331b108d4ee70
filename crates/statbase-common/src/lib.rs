//! Statbase Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the statbase ingestion pipeline.
//!
//! # Overview
//!
//! This crate provides common functionality used across all statbase workspace members:
//!
//! - **Error Handling**: Shared error type and result alias
//! - **Events**: The storage-notification contract both pipeline stages are triggered by
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Units**: Human-readable byte sizes for transcoding reports
//!
//! # Example
//!
//! ```no_run
//! use statbase_common::event::EventBatch;
//! use statbase_common::Result;
//!
//! fn count_records(payload: &[u8]) -> Result<usize> {
//!     let batch = EventBatch::from_slice(payload)?;
//!     Ok(batch.records.len())
//! }
//! ```

pub mod error;
pub mod event;
pub mod logging;
pub mod units;

// Re-export commonly used types
pub use error::{Result, StatbaseError};
