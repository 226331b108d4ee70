//! Configuration management

use serde::{Deserialize, Serialize};

use crate::storage::StorageConfig;

/// Default logical prefix of raw uploads.
pub const DEFAULT_RAW_PREFIX: &str = "preprocessed";

/// Default logical prefix transcoded objects are written under.
pub const DEFAULT_TRANSCODED_PREFIX: &str = "parquetized";

/// Default rows bound into one multi-row insert statement.
pub const DEFAULT_INSERT_CHUNK_ROWS: usize = 1000;

/// Settings shared by both stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub raw_prefix: String,
    pub transcoded_prefix: String,
    pub insert_chunk_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_prefix: DEFAULT_RAW_PREFIX.to_string(),
            transcoded_prefix: DEFAULT_TRANSCODED_PREFIX.to_string(),
            insert_chunk_rows: DEFAULT_INSERT_CHUNK_ROWS,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            raw_prefix: std::env::var("RAW_PREFIX").unwrap_or_else(|_| DEFAULT_RAW_PREFIX.to_string()),
            transcoded_prefix: std::env::var("TRANSCODED_PREFIX")
                .unwrap_or_else(|_| DEFAULT_TRANSCODED_PREFIX.to_string()),
            insert_chunk_rows: std::env::var("INSERT_CHUNK_ROWS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_INSERT_CHUNK_ROWS),
        }
    }

    pub fn validate(&self) -> statbase_common::Result<()> {
        let raw = self.raw_prefix.trim_matches('/');
        let transcoded = self.transcoded_prefix.trim_matches('/');

        if raw.is_empty() || transcoded.is_empty() {
            return Err(config_error("RAW_PREFIX and TRANSCODED_PREFIX cannot be empty"));
        }

        if raw == transcoded {
            return Err(config_error(format!(
                "RAW_PREFIX and TRANSCODED_PREFIX must differ (both '{}')",
                raw
            )));
        }

        if self.insert_chunk_rows == 0 {
            return Err(config_error("INSERT_CHUNK_ROWS must be greater than 0"));
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> statbase_common::StatbaseError {
    statbase_common::StatbaseError::Config(message.into())
}

impl IngestConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> statbase_common::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            pipeline: PipelineConfig::from_env(),
            storage: StorageConfig::from_env(),
        };

        config.pipeline.validate()?;

        Ok(config)
    }
}
