use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use super::BlobStore;
use crate::error::{MigrateError, Result};

/// Blobs kept in a map, for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    files: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.lock().insert(key.to_string(), data.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| MigrateError::blob(key, "not found"))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.lock().insert(key.to_string(), data);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
