//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use statbase_ingest::db::DbError;
use statbase_ingest::IngestError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Request body is not a storage notification
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A stage failed; the notification should be redelivered
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),

    #[error("Database unavailable: {0}")]
    Database(#[from] DbError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<statbase_common::StatbaseError> for AppError {
    fn from(err: statbase_common::StatbaseError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::BadRequest(message) => tracing::warn!("Rejected notification: {}", message),
            AppError::Ingest(e) => tracing::error!(table = e.failed_table(), "Ingestion failed: {}", e),
            AppError::Database(e) => tracing::error!("Database health check failed: {:?}", e),
        }

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(IngestError::MissingColumn("DP".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(DbError::config("down")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invalid_event_is_bad_request() {
        let err = AppError::from(statbase_common::StatbaseError::InvalidEvent("empty key".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
