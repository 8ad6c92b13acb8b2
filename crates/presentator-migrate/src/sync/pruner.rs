use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::manifest::RunManifest;
use crate::core::traits::{Collection, TargetStore};
use crate::error::Result;

/// Result of a prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneStats {
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes records whose source rows no longer exist.
pub struct OrphanPruner<'a> {
    target: &'a dyn TargetStore,
}

impl<'a> OrphanPruner<'a> {
    pub fn new(target: &'a dyn TargetStore) -> Self {
        Self { target }
    }

    /// Delete every stored record of the collection missing from the manifest.
    ///
    /// An empty manifest deletes nothing. Failing to list the stored ids is an
    /// error; failing to delete a single record is logged and counted.
    pub async fn prune(&self, collection: &Collection, manifest: &RunManifest) -> Result<PruneStats> {
        let mut stats = PruneStats::default();
        if manifest.is_empty() {
            debug!("{}: empty manifest, skipping prune", collection.name);
            return Ok(stats);
        }

        let stored = self.target.list_ids(collection).await?;
        let orphans = manifest.orphans(stored);
        if orphans.is_empty() {
            return Ok(stats);
        }

        for id in &orphans {
            match self.target.delete(collection, id).await {
                Ok(()) => stats.deleted += 1,
                Err(e) => {
                    warn!("{}: failed to delete orphan {:?}: {}", collection.name, id, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "{}: deleted {} orphaned records ({} failed)",
            collection.name, stats.deleted, stats.failed
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::TargetRecord;
    use crate::target::MemoryTarget;

    async fn target(ids: &[&str]) -> (MemoryTarget, Collection) {
        let target = MemoryTarget::with_collections(&["screens"]);
        for id in ids {
            target.seed("screens", TargetRecord::new(*id));
        }
        let collection = target.find_collection("screens").await.unwrap();
        (target, collection)
    }

    fn manifest(ids: &[&str]) -> RunManifest {
        let mut manifest = RunManifest::new();
        for id in ids {
            manifest.push(*id);
        }
        manifest
    }

    #[tokio::test]
    async fn test_deletes_only_orphans() {
        let (target, collection) = target(&["pr2_1", "pr2_2", "pr2_3"]).await;
        let stats = OrphanPruner::new(&target)
            .prune(&collection, &manifest(&["pr2_1", "pr2_3"]))
            .await
            .unwrap();

        assert_eq!(stats, PruneStats { deleted: 1, failed: 0 });
        assert_eq!(target.ids("screens"), vec!["pr2_1".to_string(), "pr2_3".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_manifest_deletes_nothing() {
        let (target, collection) = target(&["pr2_1", "pr2_2"]).await;
        let stats = OrphanPruner::new(&target)
            .prune(&collection, &RunManifest::new())
            .await
            .unwrap();

        assert_eq!(stats, PruneStats::default());
        assert_eq!(target.ids("screens").len(), 2);
    }

    #[tokio::test]
    async fn test_delete_failures_are_counted() {
        let (target, collection) = target(&["pr2_1", "pr2_2", "pr2_3"]).await;
        target.fail_writes_for("pr2_2");
        let stats = OrphanPruner::new(&target)
            .prune(&collection, &manifest(&["pr2_1"]))
            .await
            .unwrap();

        assert_eq!(stats, PruneStats { deleted: 1, failed: 1 });
        assert_eq!(target.ids("screens"), vec!["pr2_1".to_string(), "pr2_2".to_string()]);
    }
}
