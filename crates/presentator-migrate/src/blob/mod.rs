//! Blob (uploaded file) storage.

mod local;
mod memory;
mod s3;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::StorageConfig;
use crate::error::{MigrateError, Result};

/// Key/value access to stored files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a whole blob.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write a whole blob, replacing any existing one.
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Backend identifier used in logs.
    fn backend_type(&self) -> &'static str;
}

/// Build the legacy file store selected in the configuration.
pub fn from_storage_config(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match (&config.local, &config.s3) {
        (Some(root), None) => Ok(Arc::new(LocalBlobStore::new(root.clone()))),
        (None, Some(s3)) => Ok(Arc::new(S3BlobStore::new(s3.clone())?)),
        _ => Err(MigrateError::Config(
            "exactly one of storage.local or storage.s3 must be set".into(),
        )),
    }
}
