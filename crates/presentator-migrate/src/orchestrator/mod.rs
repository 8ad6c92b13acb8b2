//! Migration orchestrator - runs every entity kind in dependency order.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::blob::{self, BlobStore, LocalBlobStore};
use crate::config::{Config, DEFAULT_BLOB_CONCURRENCY, DEFAULT_PAGE_SIZE};
use crate::core::kind::EntityKind;
use crate::core::traits::{PageQuery, SourceStore, TargetStore};
use crate::error::{MigrateError, Result};
use crate::source::SourcePoolImpl;
use crate::sync::{
    BlobMigrator, BlobStats, OrphanPruner, Paginator, PruneStats, Reconciler, RunManifest,
    UpsertDecision,
};
use crate::target::SqliteTarget;

/// Migration orchestrator.
pub struct Orchestrator {
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    source_blobs: Arc<dyn BlobStore>,
    target_blobs: Arc<dyn BlobStore>,
    page_size: usize,
    blob_concurrency: usize,
}

/// Outcome of one entity kind pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub kind: EntityKind,

    /// Target collection name.
    pub collection: String,

    /// Whether the collection was empty before the pass (nothing is pruned).
    pub bootstrap: bool,

    pub rows_read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub pruned: PruneStats,
    pub files: BlobStats,
    pub duration_seconds: f64,
}

impl EntityReport {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            collection: kind.collection().to_string(),
            bootstrap: false,
            rows_read: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            pruned: PruneStats::default(),
            files: BlobStats::default(),
            duration_seconds: 0.0,
        }
    }

    fn record(&mut self, decision: UpsertDecision) {
        match decision {
            UpsertDecision::New => self.inserted += 1,
            UpsertDecision::Changed => self.updated += 1,
            UpsertDecision::Unchanged => self.unchanged += 1,
        }
    }

    /// Record writes performed by the pass.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.pruned.deleted
    }
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Per kind reports, in migration order.
    pub entities: Vec<EntityReport>,

    pub records_inserted: usize,
    pub records_updated: usize,
    pub records_unchanged: usize,
    pub records_deleted: usize,
    pub files_copied: usize,
    pub files_failed: usize,
}

impl Orchestrator {
    /// Connect every store named by the configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let source = SourcePoolImpl::from_config(&config.source).await?;
        let target = SqliteTarget::open(&config.target.database_path()).await?;
        let source_blobs = blob::from_storage_config(&config.storage)?;
        let target_blobs = Arc::new(LocalBlobStore::new(config.target.storage_dir()));

        info!(
            "Connected: source={} target={} files={} -> {}",
            source.db_type(),
            target.db_type(),
            source_blobs.backend_type(),
            target_blobs.backend_type()
        );

        Ok(Self::with_stores(
            Arc::new(source),
            Arc::new(target),
            source_blobs,
            target_blobs,
        )
        .with_page_size(config.migration.get_page_size())
        .with_blob_concurrency(config.migration.get_blob_concurrency()))
    }

    /// Build an orchestrator over already opened stores.
    pub fn with_stores(
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        source_blobs: Arc<dyn BlobStore>,
        target_blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            source,
            target,
            source_blobs,
            target_blobs,
            page_size: DEFAULT_PAGE_SIZE,
            blob_concurrency: DEFAULT_BLOB_CONCURRENCY,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_blob_concurrency(mut self, concurrency: usize) -> Self {
        self.blob_concurrency = concurrency.max(1);
        self
    }

    /// Run every kind once, stopping at the first fatal error.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        let mut entities = Vec::with_capacity(EntityKind::all().len());
        for kind in EntityKind::all() {
            match self.migrate_kind(*kind).await {
                Ok(report) => entities.push(report),
                Err(e) => {
                    error!("{}: failed - {}", kind, e);
                    return Err(MigrateError::entity(kind.label(), e));
                }
            }
        }

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let mut result = MigrationResult {
            run_id,
            status: "completed".to_string(),
            duration_seconds: duration,
            started_at,
            completed_at,
            entities: Vec::new(),
            records_inserted: 0,
            records_updated: 0,
            records_unchanged: 0,
            records_deleted: 0,
            files_copied: 0,
            files_failed: 0,
        };
        for report in &entities {
            result.records_inserted += report.inserted;
            result.records_updated += report.updated;
            result.records_unchanged += report.unchanged;
            result.records_deleted += report.pruned.deleted;
            result.files_copied += report.files.copied;
            result.files_failed += report.files.failed;
        }
        result.entities = entities;

        info!(
            "Migration {}: {} inserted, {} updated, {} unchanged, {} deleted, {} files copied ({} failed) in {:.1}s",
            result.status,
            result.records_inserted,
            result.records_updated,
            result.records_unchanged,
            result.records_deleted,
            result.files_copied,
            result.files_failed,
            result.duration_seconds
        );

        Ok(result)
    }

    /// Run the pass of a single kind.
    ///
    /// Files referenced by a page are copied once the page is written. When a
    /// row fails, the files of the rows already written in that page are
    /// still copied before the error is returned.
    pub async fn migrate_kind(&self, kind: EntityKind) -> Result<EntityReport> {
        let started = Instant::now();
        let mut report = EntityReport::new(kind);

        let collection = self.target.find_collection(kind.collection()).await?;
        report.bootstrap = match self.target.is_empty(&collection).await {
            Ok(empty) => empty,
            Err(e) => {
                warn!(
                    "{}: failed to check for existing records, skipping prune: {}",
                    collection.name, e
                );
                true
            }
        };

        let mut query = PageQuery::new(kind.source_table());
        if let Some(duplicates) = kind.excluded_duplicates() {
            let ids = self.source.select_grouped_having_count(&duplicates).await?;
            if !ids.is_empty() {
                debug!("{}: skipping {} duplicated rows", kind, ids.len());
            }
            query = query.excluding(ids);
        }

        info!(
            "{}: migrating {} into {}{}",
            kind,
            kind.source_table(),
            collection.name,
            if report.bootstrap { " (bootstrap)" } else { "" }
        );

        let blobs = BlobMigrator::new(self.source_blobs.clone(), self.target_blobs.clone())
            .with_concurrency(self.blob_concurrency);
        let reconciler = Reconciler::new(
            kind,
            self.source.as_ref(),
            self.target.as_ref(),
            &collection,
        );
        let mut paginator = Paginator::new(self.source.as_ref(), query, self.page_size);
        let mut manifest = RunManifest::new();

        while let Some(rows) = paginator.next_page().await? {
            let mut files = Vec::new();
            for row in &rows {
                match reconciler.reconcile(row, &mut manifest).await {
                    Ok(reconciled) => {
                        report.record(reconciled.decision);
                        files.extend(reconciled.files);
                    }
                    Err(e) => {
                        report.files.add(blobs.copy_all(files, &collection.name).await);
                        return Err(e);
                    }
                }
            }
            report.rows_read += rows.len();
            report.files.add(blobs.copy_all(files, &collection.name).await);
        }

        if kind.prunes() && !report.bootstrap {
            report.pruned = OrphanPruner::new(self.target.as_ref())
                .prune(&collection, &manifest)
                .await?;
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "{}: {} rows, {} inserted, {} updated, {} unchanged, {} deleted, {} files ({:.1}s)",
            kind,
            report.rows_read,
            report.inserted,
            report.updated,
            report.unchanged,
            report.pruned.deleted,
            report.files.copied,
            report.duration_seconds
        );
        Ok(report)
    }

    /// Close the database connections.
    pub async fn close(&self) {
        self.source.close().await;
        self.target.close().await;
    }
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
