use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::reconcile::FileTransfer;
use crate::blob::BlobStore;
use crate::config::DEFAULT_BLOB_CONCURRENCY;
use crate::error::Result;

/// Result of a batch of transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobStats {
    pub copied: usize,
    pub failed: usize,
}

impl BlobStats {
    pub fn add(&mut self, other: BlobStats) {
        self.copied += other.copied;
        self.failed += other.failed;
    }
}

/// Copies files from the legacy store to the target store.
#[derive(Clone)]
pub struct BlobMigrator {
    source: Arc<dyn BlobStore>,
    target: Arc<dyn BlobStore>,
    concurrency: usize,
}

impl BlobMigrator {
    pub fn new(source: Arc<dyn BlobStore>, target: Arc<dyn BlobStore>) -> Self {
        Self {
            source,
            target,
            concurrency: DEFAULT_BLOB_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Copy every file, at most `concurrency` at a time.
    ///
    /// Failures are logged with `group` and both keys and counted; they never
    /// abort the batch. Returns once every transfer has finished.
    pub async fn copy_all(&self, files: Vec<FileTransfer>, group: &str) -> BlobStats {
        let mut stats = BlobStats::default();
        if files.is_empty() {
            return stats;
        }

        debug!("{}: copying {} files", group, files.len());
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(files.len());

        for file in files {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let source = self.source.clone();
            let target = self.target.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = copy_one(source.as_ref(), target.as_ref(), &file).await;
                (file, result)
            });
            handles.push(handle);
        }

        for joined in join_all(handles).await {
            match joined {
                Ok((_, Ok(()))) => stats.copied += 1,
                Ok((file, Err(e))) => {
                    warn!(
                        "[{}] Failed to copy file {:?} to {:?}: {}",
                        group, file.source_key, file.target_key, e
                    );
                    stats.failed += 1;
                }
                Err(e) => {
                    warn!("[{}] File copy task panicked: {}", group, e);
                    stats.failed += 1;
                }
            }
        }

        stats
    }
}

async fn copy_one(source: &dyn BlobStore, target: &dyn BlobStore, file: &FileTransfer) -> Result<()> {
    let data = source.get(&file.source_key).await?;
    target.put(&file.target_key, data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn transfer(source: &str, target: &str) -> FileTransfer {
        FileTransfer {
            source_key: source.into(),
            target_key: target.into(),
        }
    }

    #[tokio::test]
    async fn test_one_missing_file_does_not_stop_the_rest() {
        let source = Arc::new(MemoryBlobStore::new());
        for i in 0..4 {
            source.insert(&format!("uploads/{}.png", i), format!("file {}", i));
        }
        let target = Arc::new(MemoryBlobStore::new());
        let migrator = BlobMigrator::new(source, target.clone()).with_concurrency(2);

        let files = (0..5)
            .map(|i| transfer(&format!("uploads/{}.png", i), &format!("pbc_screens/pr2_{}/{}.png", i, i)))
            .collect();
        let stats = migrator.copy_all(files, "screens").await;

        assert_eq!(stats, BlobStats { copied: 4, failed: 1 });
        assert_eq!(target.keys().len(), 4);
        assert!(!target.contains("pbc_screens/pr2_4/4.png"));
    }

    /// Source store that tracks how many reads run at once.
    #[derive(Default)]
    struct SlowSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl BlobStore for SlowSource {
        async fn get(&self, _key: &str) -> Result<bytes::Bytes> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(bytes::Bytes::from_static(b"data"))
        }

        async fn put(&self, _key: &str, _data: bytes::Bytes) -> Result<()> {
            Ok(())
        }

        fn backend_type(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_copies_never_exceed_concurrency() {
        let source = Arc::new(SlowSource::default());
        let target = Arc::new(MemoryBlobStore::new());
        let migrator = BlobMigrator::new(source.clone(), target.clone()).with_concurrency(2);

        let files = (0..8)
            .map(|i| transfer(&format!("uploads/{}.png", i), &format!("pbc_screens/pr2_{}/{}.png", i, i)))
            .collect();
        let stats = migrator.copy_all(files, "screens").await;

        assert_eq!(stats, BlobStats { copied: 8, failed: 0 });
        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency was {}", peak);
        assert!(peak >= 1);
        assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let migrator = BlobMigrator::new(Arc::new(MemoryBlobStore::new()), Arc::new(MemoryBlobStore::new()));
        assert_eq!(migrator.copy_all(Vec::new(), "users").await, BlobStats::default());
    }

    #[tokio::test]
    async fn test_copies_content() {
        let source = Arc::new(MemoryBlobStore::new());
        source.insert("avatars/a.jpg", "jpeg bytes");
        let target = Arc::new(MemoryBlobStore::new());
        let migrator = BlobMigrator::new(source, target.clone());

        migrator
            .copy_all(vec![transfer("avatars/a.jpg", "pbc_users/pr2_1/a.jpg")], "users")
            .await;
        assert_eq!(
            target.get("pbc_users/pr2_1/a.jpg").await.unwrap(),
            bytes::Bytes::from("jpeg bytes")
        );
    }
}
