//! Storage-notification trigger contract
//!
//! Both pipeline stages are invoked with a batch of object-created records in the
//! S3 notification shape:
//!
//! ```json
//! {"Records": [{"s3": {"bucket": {"name": "stats"},
//!                      "object": {"key": "preprocessed/department_2020.csv", "size": 1024}}}]}
//! ```
//!
//! Only bucket, key and size are consumed. Keys arrive URL-encoded and are decoded
//! once here, so downstream code always sees the literal object key.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatbaseError};

/// One triggering notification: the object that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub bucket: String,
    pub object_key: String,
    pub object_size: u64,
}

impl SourceEvent {
    pub fn new(bucket: impl Into<String>, object_key: impl Into<String>, object_size: u64) -> Self {
        Self {
            bucket: bucket.into(),
            object_key: object_key.into(),
            object_size,
        }
    }
}

/// A decoded batch of notification records, processed strictly in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    pub records: Vec<SourceEvent>,
}

impl EventBatch {
    /// Decode a raw notification payload
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        let raw: RawNotification = serde_json::from_slice(payload)?;
        raw.try_into()
    }

    /// Read and decode a notification saved to disk
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let payload = std::fs::read(path)?;
        Self::from_slice(&payload)
    }

    /// Decode an already-parsed JSON notification
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawNotification = serde_json::from_value(value)?;
        raw.try_into()
    }
}

impl From<Vec<SourceEvent>> for EventBatch {
    fn from(records: Vec<SourceEvent>) -> Self {
        Self { records }
    }
}

/// Invocation result; the platform only checks that the call did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub status: u16,
}

impl InvocationResponse {
    pub fn ok() -> Self {
        Self { status: 200 }
    }
}

// ============================================================================
// Wire shape
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(rename = "Records", default)]
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    s3: RawS3Entity,
}

#[derive(Debug, Deserialize)]
struct RawS3Entity {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    key: String,
    #[serde(default)]
    size: u64,
}

impl TryFrom<RawNotification> for EventBatch {
    type Error = StatbaseError;

    fn try_from(raw: RawNotification) -> Result<Self> {
        let records = raw
            .records
            .into_iter()
            .map(|record| {
                let key = decode_object_key(&record.s3.object.key)?;
                if key.is_empty() {
                    return Err(StatbaseError::InvalidEvent("empty object key".to_string()));
                }
                Ok(SourceEvent::new(record.s3.bucket.name, key, record.s3.object.size))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }
}

/// Notification keys use form encoding: `+` is a space, `%XX` an escaped byte.
pub fn decode_object_key(key: &str) -> Result<String> {
    let spaced = key.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| StatbaseError::InvalidEvent(format!("undecodable object key '{}': {}", key, e)))
}
