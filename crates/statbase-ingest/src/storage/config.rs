use serde::{Deserialize, Serialize};
use std::env;

/// Region for a custom endpoint when `S3_REGION` is unset
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// S3 client settings. Buckets come from each event, not from configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").ok(),
            access_key: env::var("S3_ACCESS_KEY").ok(),
            secret_key: env::var("S3_SECRET_KEY").ok(),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Configured region; a custom endpoint without one gets [`DEFAULT_S3_REGION`]
    pub fn region(&self) -> Option<&str> {
        match (&self.region, &self.endpoint) {
            (Some(region), _) => Some(region.as_str()),
            (None, Some(_)) => Some(DEFAULT_S3_REGION),
            (None, None) => None,
        }
    }

    /// Static credentials, when both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("static_credentials", &self.static_credentials().is_some())
            .field("path_style", &self.path_style)
            .finish()
    }
}
