//! Insert-or-update of a single source row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manifest::RunManifest;
use super::unique::{unique_scoped_title, unique_username};
use crate::core::kind::EntityKind;
use crate::core::record::{SourceRow, TargetRecord};
use crate::core::record_id::translate;
use crate::core::traits::{Collection, SourceStore, TargetStore};
use crate::error::{MigrateError, Result};
use crate::mapping::MappingContext;

/// What the reconciler does with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertDecision {
    /// No record with the translated id yet.
    New,
    /// Stored and source update times match to the second.
    Unchanged,
    /// Anything else, including unknown update times.
    Changed,
}

/// Compare an existing record against the source update time.
pub fn decide(existing: Option<&TargetRecord>, source_updated: Option<DateTime<Utc>>) -> UpsertDecision {
    let Some(record) = existing else {
        return UpsertDecision::New;
    };
    match (record.updated, source_updated) {
        (Some(stored), Some(source)) if stored.timestamp() == source.timestamp() => {
            UpsertDecision::Unchanged
        }
        _ => UpsertDecision::Changed,
    }
}

/// A file to copy once the page is done: legacy key to target key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    pub source_key: String,
    pub target_key: String,
}

/// Outcome of reconciling one row.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub id: String,
    pub decision: UpsertDecision,
    pub files: Vec<FileTransfer>,
}

/// Reconciles rows of one entity kind into its collection.
pub struct Reconciler<'a> {
    kind: EntityKind,
    source: &'a dyn SourceStore,
    target: &'a dyn TargetStore,
    collection: &'a Collection,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        kind: EntityKind,
        source: &'a dyn SourceStore,
        target: &'a dyn TargetStore,
        collection: &'a Collection,
    ) -> Self {
        Self {
            kind,
            source,
            target,
            collection,
        }
    }

    /// Reconcile one row, recording its id in the manifest.
    ///
    /// Performs at most one write. Write failures carry the kind and id.
    pub async fn reconcile(&self, row: &SourceRow, manifest: &mut RunManifest) -> Result<Reconciled> {
        let id = translate(self.kind, row.id, &[]);
        manifest.push(id.clone());

        let existing = self.target.find_by_id(self.collection, &id).await?;
        let decision = decide(existing.as_ref(), row.updated_at);
        if decision == UpsertDecision::Unchanged {
            return Ok(Reconciled {
                id,
                decision,
                files: Vec::new(),
            });
        }

        let ctx = MappingContext {
            source: self.source,
            target: self.target,
            collection: self.collection,
            record_id: &id,
        };
        let mapped = self.kind.map(row, &ctx).await?;

        let mut record = existing.unwrap_or_else(|| TargetRecord::new(id.clone()));
        record.created = row.created_at;
        record.updated = row.updated_at;
        record.fields.extend(mapped.fields);

        if let Some(title) = &mapped.scoped_title {
            let value = unique_scoped_title(self.target, self.collection, &id, title).await?;
            record.set(title.field, value);
        }
        if let Some(base) = &mapped.username {
            let value = unique_username(self.target, self.collection, &id, base).await?;
            record.set("username", value);
        }

        let written = match decision {
            UpsertDecision::New => self.target.insert(self.collection, &record).await,
            _ => self.target.update(self.collection, &record).await,
        };
        written.map_err(|e| MigrateError::write(self.kind.label(), id.clone(), e))?;

        let files = mapped
            .files
            .into_iter()
            .map(|file| FileTransfer {
                target_key: format!("{}/{}/{}", self.collection.id, id, file.file_name),
                source_key: file.source_key,
            })
            .collect();

        Ok(Reconciled {
            id,
            decision,
            files,
        })
    }
}
