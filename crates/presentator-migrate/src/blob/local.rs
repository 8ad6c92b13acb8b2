use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::BlobStore;
use crate::error::{MigrateError, Result};

/// Files stored under a local directory.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve a key below the root. Keys may not escape it.
    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.trim_matches('/').is_empty() || escapes {
            return Err(MigrateError::blob(key, "invalid key"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.key_to_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(MigrateError::blob(key, "not found")),
            Err(e) => Err(MigrateError::blob(key, e)),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MigrateError::blob(key, e))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| MigrateError::blob(key, e))
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
