use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;

use super::ObjectStore;

/// In-process [`ObjectStore`] keyed by `(bucket, key)`
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    fail_puts: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert((bucket.to_string(), key.to_string()), data.into());
        }
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys present in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| {
                objects
                    .keys()
                    .filter(|(b, _)| b == bucket)
                    .map(|(_, key)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make every later `put` fail
    pub fn fail_puts(&self) {
        if let Ok(mut fail) = self.fail_puts.lock() {
            *fail = true;
        }
    }

    fn objects(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), Bytes>>> {
        self.objects.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.objects()?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("NoSuchKey: s3://{}/{}", bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        if self.fail_puts.lock().map(|fail| *fail).unwrap_or(false) {
            return Err(anyhow!("put rejected: s3://{}/{}", bucket, key));
        }
        self.objects()?
            .insert((bucket.to_string(), key.to_string()), Bytes::from(data));
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.objects()?.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
