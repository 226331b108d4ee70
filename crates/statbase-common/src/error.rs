//! Error types for statbase

use thiserror::Error;

/// Result type alias for statbase operations
pub type Result<T> = std::result::Result<T, StatbaseError>;

/// Main error type for statbase
#[derive(Error, Debug)]
pub enum StatbaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
